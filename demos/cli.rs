use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tgconv::{ApiProfile, SessionFormat, SessionManager, SessionRecord, UserLookup};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert Telegram session formats", long_about = None)]
struct Args {
    /// Input format: pyro-string, pyro-file, tele-string, tele-file, tdata-folder
    input_format: String,

    /// Session string, or path to the session file/folder
    input: String,

    /// Output format: pyro-string, pyro-file, tele-string, tele-file, tdata-folder
    output_format: String,

    /// Output file/folder path (string formats print to stdout when omitted)
    output: Option<PathBuf>,

    /// Custom API id (needs --api-hash)
    #[arg(long)]
    api_id: Option<i32>,

    /// Custom API hash (needs --api-id)
    #[arg(long)]
    api_hash: Option<String>,

    /// Seed the user id by hand; this demo ships no live lookup, and a tdata
    /// export cannot proceed without one
    #[arg(long)]
    user_id: Option<i64>,
}

/// Stand-in for the network collaborator: answers with the id given on the
/// command line, or explains how to provide one.
struct PresetLookup(Option<i64>);

impl UserLookup for PresetLookup {
    fn lookup_current_user(&self, _record: &SessionRecord) -> tgconv::Result<Option<i64>> {
        match self.0 {
            Some(id) => Ok(Some(id)),
            None => Err(tgconv::Error::lookup(
                "no live client in this demo; pass --user-id to seed the identity",
            )),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let input_format: SessionFormat = args.input_format.parse()?;
    let output_format: SessionFormat = args.output_format.parse()?;

    let api = match (args.api_id, args.api_hash) {
        (Some(id), Some(hash)) => ApiProfile::custom(id, hash),
        (None, None) => ApiProfile::TELEGRAM_DESKTOP,
        _ => anyhow::bail!("--api-id and --api-hash must be given together"),
    };

    let mut manager = SessionManager::from_source(input_format, &args.input, api)?;

    println!("Loaded {} session:", input_format);
    println!("   DC ID:   {}", manager.record().dc_id());
    match manager.record().user_id() {
        Some(id) => println!("   User ID: {id}"),
        None => println!("   User ID: (unknown)"),
    }

    let lookup = PresetLookup(args.user_id);

    match manager.export(output_format, args.output.as_deref(), &lookup)? {
        Some(session_string) => match &args.output {
            Some(path) => {
                fs::write(path, session_string)?;
                println!("{} session saved to: {}", output_format, path.display());
            }
            None => println!("{session_string}"),
        },
        None => {
            if let Some(path) = &args.output {
                println!("{} session saved to: {}", output_format, path.display());
            }
        }
    }

    Ok(())
}
