use std::io::{Write as _, stdout};

use grafana_api::{
    ApiErrorKind,
    team_group::{AddTeamGroup, GetTeamGroups, RemoveTeamGroup},
};
use tabwriter::TabWriter;

use crate::cli::{Cli, Output, api_err_kind};

#[derive(Debug, clap::Args)]
pub(crate) struct TeamGroupArgs {
    #[command(subcommand)]
    pub command: TeamGroupCommand,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum TeamGroupCommand {
    /// List the external groups synced into a team
    Ls(TeamGroupLsArgs),
    /// Sync an external group into a team
    Add(TeamGroupAddArgs),
    /// Stop syncing an external group into a team
    Rm(TeamGroupRmArgs),
}

#[derive(Debug, clap::Args)]
pub(crate) struct TeamGroupLsArgs {
    /// Team ID
    pub team_id: i64,
}

#[derive(Debug, clap::Args)]
pub(crate) struct TeamGroupAddArgs {
    /// Team ID
    pub team_id: i64,
    /// External group ID, e.g. an LDAP DN
    pub group_id: String,
}

#[derive(Debug, clap::Args)]
pub(crate) struct TeamGroupRmArgs {
    /// Team ID
    pub team_id: i64,
    /// External group ID, e.g. an LDAP DN
    pub group_id: String,
    /// Do not fail if the group is not mapped to the team
    #[arg(long)]
    pub if_exists: bool,
}

pub(crate) fn handle(cli: &Cli, args: TeamGroupArgs) -> anyhow::Result<()> {
    match args.command {
        TeamGroupCommand::Ls(args) => list_groups(cli, args),
        TeamGroupCommand::Add(args) => add_group(cli, args),
        TeamGroupCommand::Rm(args) => remove_group(cli, args),
    }
}

fn list_groups(cli: &Cli, args: TeamGroupLsArgs) -> anyhow::Result<()> {
    let groups = cli.roundtrip(GetTeamGroups {
        team_id: args.team_id,
    })?;

    match cli.output() {
        Output::Json => {
            serde_json::to_writer(stdout(), &groups)?;
            println!();
        }
        Output::Tty => {
            let mut tw = TabWriter::new(stdout());
            writeln!(&mut tw, "TEAM\tGROUP")?;
            for group in &groups {
                let team_id = group.team_id.unwrap_or(args.team_id);
                writeln!(&mut tw, "{team_id}\t{}", group.group_id)?;
            }

            tw.flush()?;
        }
    }

    Ok(())
}

fn add_group(cli: &Cli, args: TeamGroupAddArgs) -> anyhow::Result<()> {
    let TeamGroupAddArgs { team_id, group_id } = args;

    cli.roundtrip(AddTeamGroup {
        team_id,
        group_id: &group_id,
    })?;

    eprintln!("Added group {group_id:?} to team {team_id}");

    Ok(())
}

fn remove_group(cli: &Cli, args: TeamGroupRmArgs) -> anyhow::Result<()> {
    let TeamGroupRmArgs {
        team_id,
        group_id,
        if_exists,
    } = args;

    let req = RemoveTeamGroup {
        team_id,
        group_id: &group_id,
    };

    if let Err(e) = cli.roundtrip(req) {
        if if_exists && api_err_kind(&e) == Some(ApiErrorKind::NotFound) {
            eprintln!("Group {group_id:?} is not mapped to team {team_id}");
            return Ok(());
        } else {
            return Err(e);
        }
    }

    eprintln!("Removed group {group_id:?} from team {team_id}");

    Ok(())
}
