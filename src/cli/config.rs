use std::io::Write;

use grafana_api::{Credential, Profile};
use tabwriter::TabWriter;

use crate::cli::{
    GlobalArgs, Output,
    color::{CliExamples, GREEN, HEADER},
};

#[derive(Debug, clap::Args)]
pub(crate) struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum ConfigCommand {
    /// Show the resolved configuration
    Get(ConfigGetArgs),
}

#[derive(Debug, clap::Args)]
#[command(after_long_help = CliExamples("
  # Show the active profile, with environment overrides applied
  grafana-api config get

  # Show every profile in the config file
  grafana-api config get --all
"))]
pub(crate) struct ConfigGetArgs {
    /// Show all the available profiles
    #[arg(short, long)]
    pub all: bool,
}

pub(crate) fn handle(args: ConfigArgs, global: GlobalArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Get(args) => config_get(args, global),
    }
}

fn config_get(args: ConfigGetArgs, global: GlobalArgs) -> anyhow::Result<()> {
    let mut out = anstream::stdout().lock();

    let profiles: Vec<Profile> = if args.all {
        Profile::load_all()?.collect()
    } else {
        let profile = match global.profile {
            Some(name) => Profile::from_env(&name)?,
            None => Profile::from_default_env()?,
        };

        vec![profile]
    };

    match global.output.unwrap_or_default() {
        Output::Tty => {
            let mut tw = TabWriter::new(&mut out).ansi(true);
            for (i, profile) in profiles.iter().enumerate() {
                if i > 0 {
                    writeln!(&mut tw)?;
                }
                print_profile(&mut tw, profile)?;
            }

            tw.flush()?;
        }
        Output::Json if args.all => {
            serde_json::to_writer(&mut out, &profiles)?;
            writeln!(&mut out)?;
        }
        Output::Json => {
            serde_json::to_writer(&mut out, &profiles.first())?;
            writeln!(&mut out)?;
        }
    }

    Ok(())
}

fn print_profile(out: &mut impl Write, profile: &Profile) -> anyhow::Result<()> {
    let credential = match &profile.credential {
        Credential::ApiKey(_) => "API key *********".to_owned(),
        Credential::Basic { username, .. } => format!("Basic auth ({username})"),
    };

    writeln!(out, "{HEADER}Profile {:?}{HEADER:#}", profile.name)?;
    writeln!(out, "{GREEN}URL{GREEN:#}\t{}", profile.url)?;
    writeln!(out, "{GREEN}Credential{GREEN:#}\t{credential}")?;
    if let Some(org_id) = profile.org_id {
        writeln!(out, "{GREEN}Org ID{GREEN:#}\t{org_id}")?;
    }
    writeln!(
        out,
        "{GREEN}Config File{GREEN:#}\t{}",
        profile.config_path.display()
    )?;

    Ok(())
}
