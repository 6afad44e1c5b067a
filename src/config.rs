use std::{
    collections::BTreeMap,
    env,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_URL: &str = "http://localhost:3000";

/// An error encountered while loading or resolving a configuration profile.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to load config file")]
    Io(#[from] io::Error),
    #[error("Invalid configuration")]
    Invalid(#[from] serde_yaml::Error),
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),
    #[error("Credential contains invalid characters")]
    InvalidCredential,
    #[error("No API key or basic auth credentials found")]
    NoCredential,
    #[error("Basic auth must be given as 'user:password'")]
    InvalidBasicAuth,
    #[error("Invalid org ID: {0}")]
    InvalidOrgId(String),
    #[error("Invalid URL")]
    InvalidUrl(#[from] http::uri::InvalidUri),
    #[error("URL must be absolute (scheme and host): {0}")]
    RelativeUrl(String),
}

/// The static credential attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A service account token or API key, sent as a bearer token.
    ApiKey(String),
    /// A username and password, sent as HTTP basic auth.
    Basic {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },
}

impl Credential {
    /// Parse a `user:password` pair.
    pub fn basic_from_pair(pair: &str) -> Result<Self, Error> {
        let Some((username, password)) = pair.split_once(':') else {
            return Err(Error::InvalidBasicAuth);
        };

        Ok(Credential::Basic {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// The value of the `Authorization` header for this credential.
    pub fn header_value(&self) -> String {
        match self {
            Credential::ApiKey(key) => format!("Bearer {key}"),
            Credential::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                format!("Basic {encoded}")
            }
        }
    }

    fn validate(self) -> Result<Self, Error> {
        let ok = match &self {
            Credential::ApiKey(key) => key.is_ascii() && !key.is_empty(),
            Credential::Basic { username, password } => username.is_ascii() && password.is_ascii(),
        };

        if ok { Ok(self) } else { Err(Error::InvalidCredential) }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(_) => f.debug_tuple("ApiKey").field(&"********").finish(),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"********")
                .finish(),
        }
    }
}

/// A fully resolved configuration profile for talking to a Grafana instance.
///
/// A profile is immutable once built; a [`Client`](crate::Client) holds one
/// for its whole lifetime.
#[derive(Clone, Serialize)]
pub struct Profile {
    /// The name of the profile.
    pub name: String,
    /// The base URL of the Grafana instance, including any sub-path.
    #[serde(serialize_with = "serialize_uri")]
    pub url: http::Uri,
    /// The credential used for authentication.
    #[serde(skip)]
    pub credential: Credential,
    /// The organization to act in, sent as `X-Grafana-Org-Id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
    /// The user-agent used on requests.
    #[serde(skip)]
    pub user_agent: String,
    /// The config file this profile was loaded from, or the canonical one if
    /// no config file exists.
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("credential", &self.credential)
            .field("org_id", &self.org_id)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// A profile stored in the config file.
#[derive(Debug, Default, Clone, Deserialize)]
struct ConfigProfile {
    pub(crate) url: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) basic_auth: Option<String>,
    pub(crate) org_id: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct Config {
    profiles: BTreeMap<String, ConfigProfile>,
}

impl Profile {
    /// Build a profile directly, without reading any file or environment
    /// variable.
    pub fn new(url: &str, credential: Credential) -> Result<Self, Error> {
        Ok(Self {
            name: "default".to_owned(),
            url: parse_url(url)?,
            credential: credential.validate()?,
            org_id: None,
            user_agent: make_ua(None),
            config_path: PathBuf::new(),
        })
    }

    /// Act within the given organization.
    pub fn with_org_id(self, org_id: i64) -> Self {
        Self {
            org_id: Some(org_id),
            ..self
        }
    }

    /// Replace the product name at the start of the user-agent.
    pub fn with_ua_product(self, ua_product: &str) -> Self {
        Self {
            user_agent: make_ua(Some(ua_product)),
            ..self
        }
    }

    /// Load the given profile from the configuration file (usually
    /// ~/.config/grafana-api.yaml). If no configuration file is present, then
    /// the configuration will be loaded solely from the environment.
    ///
    /// If `GRAFANA_PROFILE` is set, that will be used to select the profile.
    /// Otherwise the profile `default` will be used.
    ///
    /// The following environment variables can override the corresponding
    /// values in the config file:
    ///
    /// | Environment Variable | Config Value |
    /// |----------------------|--------------|
    /// | `GRAFANA_URL`        | `url`        |
    /// | `GRAFANA_API_KEY`    | `api_key`    |
    /// | `GRAFANA_AUTH`       | `basic_auth` |
    /// | `GRAFANA_ORG_ID`     | `org_id`     |
    pub fn from_default_env() -> Result<Self, Error> {
        if let Ok(s) = env::var("GRAFANA_PROFILE") {
            Self::from_env(&s)
        } else {
            Self::from_env("default")
        }
    }

    /// Load the given profile from the configuration file, applying the same
    /// environment overrides as [Profile::from_default_env].
    pub fn from_env(name: &str) -> Result<Self, Error> {
        let config_path = find_config()?;
        let profile = match read_profile(&config_path, name) {
            Ok(p) => p,
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no config file found");
                Default::default()
            }
            Err(e) => return Err(e),
        };

        let overrides = ConfigProfile {
            url: env::var("GRAFANA_URL").ok(),
            api_key: env::var("GRAFANA_API_KEY").ok(),
            basic_auth: env::var("GRAFANA_AUTH").ok(),
            org_id: match env::var("GRAFANA_ORG_ID") {
                Ok(v) => Some(v.parse().map_err(|_| Error::InvalidOrgId(v))?),
                Err(_) => None,
            },
        };

        Self::from_raw(overrides.or(profile), name.to_owned(), config_path)
    }

    /// Load the given profile (or 'default') from the given file, which must
    /// be a valid configuration file. Does not read any environment
    /// variables.
    ///
    /// Usually, you will want to use [Profile::from_env] instead.
    pub fn read(path: impl AsRef<Path>, name: Option<&str>) -> Result<Self, Error> {
        let path = path.as_ref();
        let name = name.unwrap_or("default").to_owned();
        let profile = read_profile(path, &name)?;
        Self::from_raw(profile, name, path.to_owned())
    }

    /// Read all profiles from the default configuration file. Does not apply
    /// any environment overrides.
    pub fn load_all() -> Result<impl Iterator<Item = Self>, Error> {
        Self::read_all(find_config()?)
    }

    /// Read all profiles from the given file. Does not read any environment
    /// variables.
    pub fn read_all(path: impl AsRef<Path>) -> Result<impl Iterator<Item = Self>, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;

        let profiles: Result<Vec<_>, Error> = config
            .profiles
            .into_iter()
            .map(|(name, raw)| Profile::from_raw(raw, name, path.to_owned()))
            .collect();

        Ok(profiles?.into_iter())
    }

    fn from_raw(raw: ConfigProfile, name: String, path: PathBuf) -> Result<Self, Error> {
        let ConfigProfile {
            url,
            api_key,
            basic_auth,
            org_id,
        } = raw;

        let url = parse_url(url.as_deref().unwrap_or(DEFAULT_URL))?;

        // An API key wins over basic auth when both are present.
        let credential = match (api_key, basic_auth) {
            (Some(key), _) => Credential::ApiKey(key),
            (None, Some(pair)) => Credential::basic_from_pair(&pair)?,
            (None, None) => return Err(Error::NoCredential),
        };

        Ok(Self {
            name,
            url,
            credential: credential.validate()?,
            org_id,
            user_agent: make_ua(None),
            config_path: path,
        })
    }
}

impl ConfigProfile {
    /// Fill any unset values from `fallback`.
    fn or(self, fallback: ConfigProfile) -> ConfigProfile {
        // A credential from the environment replaces the file's credential
        // entirely, so that GRAFANA_AUTH is not shadowed by a stored api_key.
        let (api_key, basic_auth) = if self.api_key.is_some() || self.basic_auth.is_some() {
            (self.api_key, self.basic_auth)
        } else {
            (fallback.api_key, fallback.basic_auth)
        };

        ConfigProfile {
            url: self.url.or(fallback.url),
            api_key,
            basic_auth,
            org_id: self.org_id.or(fallback.org_id),
        }
    }
}

fn parse_url(s: &str) -> Result<http::Uri, Error> {
    let uri: http::Uri = s.parse()?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::RelativeUrl(s.to_owned()));
    }

    Ok(uri)
}

fn serialize_uri<S: serde::Serializer>(uri: &http::Uri, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(uri)
}

fn find_config() -> Result<PathBuf, Error> {
    let Some(home) = env::home_dir() else {
        return Err(Error::Io(io::Error::other(
            "No $HOME found for the current user",
        )));
    };

    let canonical = home.join(".config/grafana-api.yaml");
    if canonical.exists() {
        return Ok(canonical);
    }

    for fallback in [".config/grafana-api.yml", ".grafana-api/config.yaml"] {
        let path = home.join(fallback);
        if path.exists() {
            return Ok(path);
        }
    }

    Ok(canonical)
}

fn read_profile(p: &Path, name: &str) -> Result<ConfigProfile, Error> {
    let file = File::open(p)?;
    let mut config: Config = serde_yaml::from_reader(file).map_err(Error::Invalid)?;
    let Some(config_profile) = config.profiles.remove(name) else {
        return Err(Error::ProfileNotFound(name.to_string()));
    };

    debug!(path = %p.display(), "loaded config file");

    Ok(config_profile)
}

fn make_ua(product: Option<&str>) -> String {
    format!(
        "{}/{}",
        product.unwrap_or(env!("CARGO_PKG_NAME")),
        env!("CARGO_PKG_VERSION")
    )
}
