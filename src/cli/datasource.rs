use std::{
    collections::BTreeMap,
    io::{Write as _, stdout},
};

use grafana_api::{
    ApiErrorKind, Unknown,
    datasource::{
        CreateDataSource, DataSource, DeleteDataSource, DeleteDataSourceByName,
        DeleteDataSourceByUid, GetDataSource, GetDataSourceByName, GetDataSourceByUid,
        GetDataSources, json_data_with_headers,
    },
};
use tabwriter::TabWriter;

use crate::cli::{Cli, KeyValue, Output, api_err_kind, color::CliExamples};

#[derive(Debug, clap::Args)]
pub(crate) struct DataSourceArgs {
    #[command(subcommand)]
    pub command: DataSourceCommand,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum DataSourceCommand {
    /// List data sources
    Ls,
    /// Show a single data source
    Get(DataSourceGetArgs),
    /// Create a data source
    Create(DataSourceCreateArgs),
    /// Delete a data source
    Rm(DataSourceRmArgs),
}

/// Identifies a data source by exactly one of its keys.
#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
pub(crate) struct Selector {
    /// Data source UID
    #[arg(long)]
    pub uid: Option<String>,
    /// Data source name
    #[arg(long)]
    pub name: Option<String>,
    /// Data source numeric ID
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(Debug, clap::Args)]
pub(crate) struct DataSourceGetArgs {
    #[command(flatten)]
    pub selector: Selector,
}

#[derive(Debug, clap::Args)]
#[command(after_long_help = CliExamples("
  # Create a Prometheus data source
  grafana-api datasource create --name prom --type prometheus --url http://prometheus:9090

  # Set plugin settings and a custom header
  grafana-api datasource create --name loki --type loki --url http://loki:3100 \\
    --json-data maxLines=1000 --header X-Scope-OrgID=tenant1
"))]
pub(crate) struct DataSourceCreateArgs {
    /// Data source name
    #[arg(long)]
    pub name: String,
    /// Plugin type, e.g. prometheus
    #[arg(long = "type")]
    pub ds_type: String,
    /// Backend URL
    #[arg(long, default_value = "")]
    pub url: String,
    /// Access mode
    #[arg(long, default_value = "proxy")]
    pub access: String,
    /// UID to assign (generated by the server if unset)
    #[arg(long)]
    pub uid: Option<String>,
    /// Make this the organization's default data source
    #[arg(long)]
    pub default: bool,
    /// Plugin setting as key=value; values that parse as JSON are sent as JSON
    #[arg(long = "json-data", value_name = "KEY=VALUE")]
    pub json_data: Vec<KeyValue>,
    /// Secret plugin setting as key=value
    #[arg(long = "secure-json-data", value_name = "KEY=VALUE")]
    pub secure_json_data: Vec<KeyValue>,
    /// Custom HTTP header sent to the backend, as name=value
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<KeyValue>,
}

#[derive(Debug, clap::Args)]
pub(crate) struct DataSourceRmArgs {
    #[command(flatten)]
    pub selector: Selector,
    /// Do not fail if the data source does not exist
    #[arg(long)]
    pub if_exists: bool,
}

pub(crate) fn handle(cli: &Cli, args: DataSourceArgs) -> anyhow::Result<()> {
    match args.command {
        DataSourceCommand::Ls => list_data_sources(cli),
        DataSourceCommand::Get(args) => get_data_source(cli, args),
        DataSourceCommand::Create(args) => create_data_source(cli, args),
        DataSourceCommand::Rm(args) => delete_data_source(cli, args),
    }
}

fn list_data_sources(cli: &Cli) -> anyhow::Result<()> {
    let data_sources = cli.roundtrip(GetDataSources)?;

    match cli.output() {
        Output::Json => {
            serde_json::to_writer(stdout(), &data_sources)?;
            println!();
        }
        Output::Tty => {
            let mut tw = TabWriter::new(stdout());
            writeln!(&mut tw, "ID\tUID\tNAME\tTYPE\tURL\tDEFAULT")?;
            for ds in &data_sources {
                writeln!(
                    &mut tw,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    ds.id,
                    ds.uid,
                    ds.name,
                    ds.r#type,
                    ds.url,
                    if ds.is_default { "*" } else { "" }
                )?;
            }

            tw.flush()?;
        }
    }

    Ok(())
}

fn get_data_source(cli: &Cli, args: DataSourceGetArgs) -> anyhow::Result<()> {
    let Selector { uid, name, id } = args.selector;

    let ds = if let Some(uid) = uid.as_deref() {
        cli.roundtrip(GetDataSourceByUid { uid })?
    } else if let Some(name) = name.as_deref() {
        cli.roundtrip(GetDataSourceByName { name })?
    } else if let Some(id) = id {
        cli.roundtrip(GetDataSource { id })?
    } else {
        anyhow::bail!("one of --uid, --name or --id is required");
    };

    match cli.output() {
        Output::Json => {
            serde_json::to_writer(stdout(), &ds)?;
            println!();
        }
        Output::Tty => {
            let mut tw = TabWriter::new(stdout());
            writeln!(&mut tw, "ID\t{}", ds.id)?;
            writeln!(&mut tw, "UID\t{}", ds.uid)?;
            writeln!(&mut tw, "Name\t{}", ds.name)?;
            writeln!(&mut tw, "Type\t{}", ds.r#type)?;
            writeln!(&mut tw, "URL\t{}", ds.url)?;
            writeln!(&mut tw, "Access\t{}", ds.access)?;
            writeln!(&mut tw, "Default\t{}", ds.is_default)?;
            for (k, v) in &ds.json_data {
                writeln!(&mut tw, "jsonData.{k}\t{v}")?;
            }

            tw.flush()?;
        }
    }

    Ok(())
}

fn create_data_source(cli: &Cli, args: DataSourceCreateArgs) -> anyhow::Result<()> {
    let DataSourceCreateArgs {
        name,
        ds_type,
        url,
        access,
        uid,
        default,
        json_data,
        secure_json_data,
        headers,
    } = args;

    let headers: BTreeMap<String, String> =
        headers.into_iter().map(KeyValue::into_strings).collect();
    let (json_data, secure_json_data) = json_data_with_headers(
        settings(json_data),
        secure_settings(secure_json_data),
        &headers,
    );

    let ds = DataSource {
        uid: uid.unwrap_or_default(),
        name,
        r#type: ds_type,
        url,
        access,
        is_default: default,
        json_data,
        secure_json_data,
        ..Default::default()
    };

    let created = cli.roundtrip(CreateDataSource { data_source: &ds })?;

    match cli.output() {
        Output::Json => {
            serde_json::to_writer(stdout(), &created)?;
            println!();
        }
        Output::Tty => {
            eprintln!(
                "Created data source {:?} (id {}, uid {})",
                ds.name,
                created.id,
                created.uid()
            );
        }
    }

    Ok(())
}

fn delete_data_source(cli: &Cli, args: DataSourceRmArgs) -> anyhow::Result<()> {
    let DataSourceRmArgs { selector, if_exists } = args;
    let Selector { uid, name, id } = selector;

    let (res, label) = if let Some(uid) = uid.as_deref() {
        (cli.roundtrip(DeleteDataSourceByUid { uid }), uid.to_owned())
    } else if let Some(name) = name.as_deref() {
        (cli.roundtrip(DeleteDataSourceByName { name }), name.to_owned())
    } else if let Some(id) = id {
        (cli.roundtrip(DeleteDataSource { id }), id.to_string())
    } else {
        anyhow::bail!("one of --uid, --name or --id is required");
    };

    if let Err(e) = res {
        if if_exists && api_err_kind(&e) == Some(ApiErrorKind::NotFound) {
            eprintln!("Data source {label:?} does not exist");
            return Ok(());
        } else {
            return Err(e);
        }
    }

    eprintln!("Deleted data source {label:?}");

    Ok(())
}

/// Plugin settings from the command line. Values that parse as JSON (numbers,
/// booleans, objects) keep that type; anything else is a string.
fn settings(pairs: Vec<KeyValue>) -> Unknown {
    pairs
        .into_iter()
        .map(KeyValue::into_strings)
        .map(|(k, v)| {
            let value = serde_json::from_str(&v).unwrap_or(serde_json::Value::String(v));
            (k, value)
        })
        .collect()
}

fn secure_settings(pairs: Vec<KeyValue>) -> Unknown {
    pairs
        .into_iter()
        .map(KeyValue::into_strings)
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect()
}
