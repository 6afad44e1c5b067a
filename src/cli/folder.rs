use std::io::{Write as _, stdout};

use grafana_api::{
    ApiErrorKind, DEFAULT_PAGE_SIZE,
    folder::{
        CreateFolder, DeleteFolder, Folder, GetFolder, GetFolderByUid, GetFolders, UpdateFolder,
    },
};
use tabwriter::TabWriter;

use crate::cli::{Cli, Output, api_err_kind, color::CliExamples};

#[derive(Debug, clap::Args)]
pub(crate) struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommand,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum FolderCommand {
    /// List folders
    Ls(FolderLsArgs),
    /// Show a single folder
    Get(FolderGetArgs),
    /// Create a folder
    Create(FolderCreateArgs),
    /// Rename a folder
    Update(FolderUpdateArgs),
    /// Delete a folder and everything in it
    Rm(FolderRmArgs),
}

#[derive(Debug, clap::Args)]
pub(crate) struct FolderLsArgs {
    /// Limit the number of folders to show
    #[arg(long)]
    pub limit: Option<usize>,
    /// Number of folders to request per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

#[derive(Debug, clap::Args)]
pub(crate) struct FolderGetArgs {
    /// Folder UID
    #[arg(required_unless_present = "id")]
    pub uid: Option<String>,
    /// Look the folder up by numeric ID instead
    #[arg(long, conflicts_with = "uid")]
    pub id: Option<i64>,
}

#[derive(Debug, clap::Args)]
#[command(after_long_help = CliExamples("
  # Create a top-level folder
  grafana-api folder create \"Team dashboards\"

  # Create a nested folder with a fixed UID
  grafana-api folder create Alerts --uid team-alerts --parent-uid nErXDvCkzz
"))]
pub(crate) struct FolderCreateArgs {
    /// Folder title
    pub title: String,
    /// UID to assign (generated by the server if unset)
    #[arg(long)]
    pub uid: Option<String>,
    /// UID of the parent folder
    #[arg(long)]
    pub parent_uid: Option<String>,
    /// Do not fail if the folder already exists
    #[arg(long)]
    pub if_not_exists: bool,
}

#[derive(Debug, clap::Args)]
pub(crate) struct FolderUpdateArgs {
    /// Folder UID
    pub uid: String,
    /// New title
    #[arg(long)]
    pub title: String,
    /// New UID
    #[arg(long)]
    pub new_uid: Option<String>,
    /// Fail if the folder has changed since this version
    #[arg(long)]
    pub version: Option<i64>,
}

#[derive(Debug, clap::Args)]
pub(crate) struct FolderRmArgs {
    /// Folder UID
    pub uid: String,
    /// Do not fail if the folder does not exist
    #[arg(long)]
    pub if_exists: bool,
}

pub(crate) fn handle(cli: &Cli, args: FolderArgs) -> anyhow::Result<()> {
    match args.command {
        FolderCommand::Ls(args) => list_folders(cli, args),
        FolderCommand::Get(args) => get_folder(cli, args),
        FolderCommand::Create(args) => create_folder(cli, args),
        FolderCommand::Update(args) => update_folder(cli, args),
        FolderCommand::Rm(args) => delete_folder(cli, args),
    }
}

fn list_folders(cli: &Cli, args: FolderLsArgs) -> anyhow::Result<()> {
    let FolderLsArgs { limit, page_size } = args;

    let folders = grafana_api::paginate(GetFolders, page_size, |r| cli.roundtrip(r))?
        .take(limit.unwrap_or(usize::MAX));

    match cli.output() {
        Output::Json => {
            let all_folders = folders.collect::<anyhow::Result<Vec<_>>>()?;
            serde_json::to_writer(stdout(), &all_folders)?;
            println!();
        }
        Output::Tty => {
            let mut tw = TabWriter::new(stdout());
            writeln!(&mut tw, "UID\tTITLE\tPARENT")?;
            for folder in folders {
                let folder = folder?;
                writeln!(
                    &mut tw,
                    "{}\t{}\t{}",
                    folder.uid,
                    folder.title,
                    folder.parent_uid.as_deref().unwrap_or("")
                )?;
            }

            tw.flush()?;
        }
    }

    Ok(())
}

fn get_folder(cli: &Cli, args: FolderGetArgs) -> anyhow::Result<()> {
    let folder = match (args.id, args.uid.as_deref()) {
        (Some(id), _) => cli.roundtrip(GetFolder { id })?,
        (None, Some(uid)) => cli.roundtrip(GetFolderByUid { uid })?,
        (None, None) => anyhow::bail!("a folder UID or --id is required"),
    };

    print_folder(cli, &folder)
}

fn create_folder(cli: &Cli, args: FolderCreateArgs) -> anyhow::Result<()> {
    let FolderCreateArgs {
        title,
        uid,
        parent_uid,
        if_not_exists,
    } = args;

    let req = CreateFolder {
        title: &title,
        uid: uid.as_deref(),
        parent_uid: parent_uid.as_deref(),
    };

    let folder = match cli.roundtrip(req) {
        Ok(folder) => folder,
        Err(e) if if_not_exists && api_err_kind(&e) == Some(ApiErrorKind::Conflict) => {
            eprintln!("Folder {title:?} already exists");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    match cli.output() {
        Output::Json => print_folder(cli, &folder)?,
        Output::Tty => eprintln!("Created folder {:?} ({})", folder.title, folder.uid),
    }

    Ok(())
}

fn update_folder(cli: &Cli, args: FolderUpdateArgs) -> anyhow::Result<()> {
    let FolderUpdateArgs {
        uid,
        title,
        new_uid,
        version,
    } = args;

    let req = UpdateFolder {
        uid: &uid,
        title: &title,
        new_uid: new_uid.as_deref(),
        version,
    };

    let folder = cli.roundtrip(req)?;
    match cli.output() {
        Output::Json => print_folder(cli, &folder)?,
        Output::Tty => eprintln!("Updated folder {:?} ({})", folder.title, folder.uid),
    }

    Ok(())
}

fn delete_folder(cli: &Cli, args: FolderRmArgs) -> anyhow::Result<()> {
    let FolderRmArgs { uid, if_exists } = args;

    if let Err(e) = cli.roundtrip(DeleteFolder { uid: &uid }) {
        if if_exists && api_err_kind(&e) == Some(ApiErrorKind::NotFound) {
            eprintln!("Folder {uid:?} does not exist");
            return Ok(());
        } else {
            return Err(e);
        }
    }

    eprintln!("Deleted folder {uid:?}");

    Ok(())
}

fn print_folder(cli: &Cli, folder: &Folder) -> anyhow::Result<()> {
    match cli.output() {
        Output::Json => {
            serde_json::to_writer(stdout(), folder)?;
            println!();
        }
        Output::Tty => {
            let mut tw = TabWriter::new(stdout());
            writeln!(&mut tw, "ID\t{}", folder.id)?;
            writeln!(&mut tw, "UID\t{}", folder.uid)?;
            writeln!(&mut tw, "Title\t{}", folder.title)?;
            if let Some(parent) = &folder.parent_uid {
                writeln!(&mut tw, "Parent\t{parent}")?;
            }
            if let Some(version) = folder.version {
                writeln!(&mut tw, "Version\t{version}")?;
            }
            if !folder.url.is_empty() {
                writeln!(&mut tw, "URL\t{}", folder.url)?;
            }

            tw.flush()?;
        }
    }

    Ok(())
}
