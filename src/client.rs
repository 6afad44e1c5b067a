use std::time;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    ApiError, ApiErrorKind, ApiRequest, ApiResponse, DEFAULT_PAGE_SIZE, Profile, RequestError,
    api::{build_request, read_json},
    datasource::{
        CreateDataSource, CreatedDataSource, DataSource, DeleteDataSource, DeleteDataSourceByName,
        DeleteDataSourceByUid, GetDataSource, GetDataSourceByName, GetDataSourceByUid,
        GetDataSourceIdByName, GetDataSources, UpdateDataSource, UpdateDataSourceByUid,
    },
    folder::{
        CreateFolder, DeleteFolder, Folder, GetFolder, GetFolderByUid, GetFolders, UpdateFolder,
    },
    paginate,
    query::{Query, QueryDataSource, QueryResponse, TimeRange},
    team_group::{AddTeamGroup, GetTeamGroups, RemoveTeamGroup, TeamGroup},
};

/// An error returned by [Client].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered, but not with what was expected.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),
    /// The request could not be built.
    #[error(transparent)]
    Request(#[from] RequestError),
}

impl Error {
    /// The error class, if the server responded with an error status.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Error::Api(e) => e.kind().copied(),
            _ => None,
        }
    }

    /// Whether the server responded 404.
    pub fn is_not_found(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::NotFound)
    }
}

/// A blocking client for the Grafana HTTP API.
///
/// ```no_run
/// use grafana_api::{Client, Profile};
///
/// # fn main() -> anyhow::Result<()> {
/// let client = Client::new(Profile::from_default_env()?);
/// for folder in client.folders()? {
///     println!("{} {}", folder.uid, folder.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    profile: Profile,
    agent: ureq::Agent,
}

impl Client {
    /// A client with no timeout.
    pub fn new(profile: Profile) -> Self {
        Self::with_agent(profile, agent(None))
    }

    /// A client that fails any request taking longer than `timeout`.
    pub fn with_timeout(profile: Profile, timeout: time::Duration) -> Self {
        Self::with_agent(profile, agent(Some(timeout)))
    }

    /// A client using a preconfigured agent. The agent must be built with
    /// `http_status_as_error(false)`, or error responses will surface as
    /// transport errors.
    pub fn with_agent(profile: Profile, agent: ureq::Agent) -> Self {
        Self { profile, agent }
    }

    /// The profile requests are made with.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Send a request and read the response.
    pub fn roundtrip<T: ApiRequest>(&self, req: T) -> Result<T::Response, Error> {
        let req = req.into_request(&self.profile)?;
        tracing::debug!(method = %req.method(), path = req.uri().path(), "sending request");

        let resp = self.agent.run(req)?;
        let resp = <T::Response as ApiResponse>::from_response(resp.map(ureq::Body::into_reader))?;
        Ok(resp)
    }

    /// Make a request to an arbitrary path, for endpoints that have no typed
    /// request. The response is decoded into `T`.
    pub fn request<Q, B, T>(
        &self,
        method: http::Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        Q: Serialize,
        B: Serialize,
        T: DeserializeOwned,
    {
        let query = match query {
            Some(q) => Some(serde_qs::to_string(q).map_err(RequestError::from)?),
            None => None,
        };
        let body = match body {
            Some(b) => Some(serde_json::to_string(b).map_err(RequestError::from)?),
            None => None,
        };

        let req = build_request(&self.profile, method, path, query.as_deref(), body)?;
        tracing::debug!(method = %req.method(), path = req.uri().path(), "sending request");

        let resp = self.agent.run(req)?;
        let (parts, body) = resp.map(ureq::Body::into_reader).into_parts();
        Ok(read_json(&parts, body)?)
    }

    /// List all folders, following pages until the server runs out.
    pub fn folders(&self) -> Result<Vec<Folder>, Error> {
        paginate(GetFolders, DEFAULT_PAGE_SIZE, |req| self.roundtrip(req))?.collect()
    }

    pub fn folder(&self, id: i64) -> Result<Folder, Error> {
        self.roundtrip(GetFolder { id })
    }

    pub fn folder_by_uid(&self, uid: &str) -> Result<Folder, Error> {
        self.roundtrip(GetFolderByUid { uid })
    }

    /// Create a folder with a server-assigned UID.
    pub fn new_folder(&self, title: &str, parent_uid: Option<&str>) -> Result<Folder, Error> {
        self.roundtrip(CreateFolder {
            title,
            uid: None,
            parent_uid,
        })
    }

    /// Retitle a folder, overwriting any concurrent change.
    pub fn update_folder(&self, uid: &str, title: &str) -> Result<(), Error> {
        self.roundtrip(UpdateFolder {
            uid,
            title,
            new_uid: None,
            version: None,
        })?;

        Ok(())
    }

    pub fn delete_folder(&self, uid: &str) -> Result<(), Error> {
        self.roundtrip(DeleteFolder { uid })
    }

    pub fn data_sources(&self) -> Result<Vec<DataSource>, Error> {
        self.roundtrip(GetDataSources)
    }

    pub fn data_source(&self, id: i64) -> Result<DataSource, Error> {
        self.roundtrip(GetDataSource { id })
    }

    pub fn data_source_by_uid(&self, uid: &str) -> Result<DataSource, Error> {
        self.roundtrip(GetDataSourceByUid { uid })
    }

    pub fn data_source_by_name(&self, name: &str) -> Result<DataSource, Error> {
        self.roundtrip(GetDataSourceByName { name })
    }

    pub fn data_source_id_by_name(&self, name: &str) -> Result<i64, Error> {
        Ok(self.roundtrip(GetDataSourceIdByName { name })?.id)
    }

    pub fn new_data_source(&self, data_source: &DataSource) -> Result<CreatedDataSource, Error> {
        self.roundtrip(CreateDataSource { data_source })
    }

    pub fn update_data_source(&self, data_source: &DataSource) -> Result<(), Error> {
        self.roundtrip(UpdateDataSource { data_source })
    }

    pub fn update_data_source_by_uid(&self, data_source: &DataSource) -> Result<(), Error> {
        self.roundtrip(UpdateDataSourceByUid { data_source })
    }

    pub fn delete_data_source(&self, id: i64) -> Result<(), Error> {
        self.roundtrip(DeleteDataSource { id })
    }

    pub fn delete_data_source_by_uid(&self, uid: &str) -> Result<(), Error> {
        self.roundtrip(DeleteDataSourceByUid { uid })
    }

    pub fn delete_data_source_by_name(&self, name: &str) -> Result<(), Error> {
        self.roundtrip(DeleteDataSourceByName { name })
    }

    pub fn team_groups(&self, team_id: i64) -> Result<Vec<TeamGroup>, Error> {
        self.roundtrip(GetTeamGroups { team_id })
    }

    pub fn new_team_group(&self, team_id: i64, group_id: &str) -> Result<(), Error> {
        self.roundtrip(AddTeamGroup { team_id, group_id })
    }

    pub fn delete_team_group(&self, team_id: i64, group_id: &str) -> Result<(), Error> {
        self.roundtrip(RemoveTeamGroup { team_id, group_id })
    }

    /// Run queries over a shared time range. A query that fails on its own
    /// is reported in its result's `error`, not as an `Err`.
    pub fn query_data_source(
        &self,
        queries: &[Query],
        range: &TimeRange,
    ) -> Result<QueryResponse, Error> {
        self.roundtrip(QueryDataSource { queries, range })
    }
}

fn agent(timeout: Option<time::Duration>) -> ureq::Agent {
    // Allows error responses to be parsed.
    let cfg = ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(timeout);
    ureq::Agent::new_with_config(cfg.build())
}
