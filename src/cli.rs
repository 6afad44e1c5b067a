mod color;
mod config;
mod datasource;
mod folder;
mod query;
mod team_group;

use std::{str::FromStr, time};

use anyhow::bail;
use clap::{Parser, Subcommand};
use grafana_api::{ApiErrorKind, ApiRequest, Client, Profile};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "grafana-api",
    about = "A command-line client for the Grafana HTTP API",
    version,
    propagate_version = true
)]
pub(crate) struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// How to format output.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Output {
    Json,
    #[default]
    Tty,
}

/// key=value string pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyValue(String, String);

impl KeyValue {
    fn into_strings(self) -> (String, String) {
        (self.0, self.1)
    }
}

impl FromStr for KeyValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((left, right)) = s.split_once('=') else {
            bail!("Invalid key=value pair: {}", s);
        };

        Ok(KeyValue(left.to_owned(), right.to_owned()))
    }
}

#[derive(Debug, clap::Args)]
#[command(next_help_heading = "Global Options")]
pub(crate) struct GlobalArgs {
    /// Name of the profile to use
    #[arg(long, short = 'P', global = true)]
    pub profile: Option<String>,
    /// Output format
    #[arg(long, short = 'O', global = true)]
    pub output: Option<Output>,
    /// Timeout (in seconds) for each request (-1 = no timeout)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub timeout: Option<i64>,
    /// Print verbose logs
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print version.
    Version,
    /// Manage folders
    Folder(folder::FolderArgs),
    /// Manage data sources
    Datasource(datasource::DataSourceArgs),
    /// Manage a team's external groups
    TeamGroup(team_group::TeamGroupArgs),
    /// Run a query against a data source
    Query(query::QueryArgs),
    /// Show configuration
    Config(config::ConfigArgs),
}

pub(crate) struct Cli {
    pub(crate) global: GlobalArgs,
    pub(crate) client: Client,
}

pub(crate) fn run(args: Args) -> anyhow::Result<()> {
    // Some commands don't require any config.
    match args.command {
        Command::Version => {
            println!("grafana-api {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Config(config_args) => return config::handle(config_args, args.global),
        _ => (),
    }

    let profile = if let Some(name) = args.global.profile.as_deref() {
        Profile::from_env(name)
    } else {
        Profile::from_default_env()
    };

    let profile = profile?.with_ua_product("grafana-api-cli");

    let timeout = match args.global.timeout {
        Some(-1) | None => None,
        Some(v) if v > 0 => Some(time::Duration::from_secs(v as _)),
        Some(v) => bail!("Invalid timeout value: {v}"),
    };

    debug!(profile = %profile.name, url = %profile.url, command = ?args.command, "cli invocation");

    let client = match timeout {
        Some(t) => Client::with_timeout(profile, t),
        None => Client::new(profile),
    };

    let cli = Cli {
        global: args.global,
        client,
    };

    match args.command {
        Command::Version => unreachable!(),
        Command::Config(_) => unreachable!(),
        Command::Folder(args) => folder::handle(&cli, args),
        Command::Datasource(args) => datasource::handle(&cli, args),
        Command::TeamGroup(args) => team_group::handle(&cli, args),
        Command::Query(args) => query::handle(&cli, args),
    }
}

impl Cli {
    pub(crate) fn roundtrip<T: ApiRequest>(&self, req: T) -> anyhow::Result<T::Response> {
        Ok(self.client.roundtrip(req)?)
    }

    pub(crate) fn output(&self) -> Output {
        self.global.output.unwrap_or_default()
    }
}

pub(crate) fn api_err_kind(err: &anyhow::Error) -> Option<ApiErrorKind> {
    err.downcast_ref::<grafana_api::Error>()?.api_kind()
}
