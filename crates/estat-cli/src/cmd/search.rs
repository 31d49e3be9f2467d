//! search / find / users subcommands

use anyhow::Result;
use clap::Args;

use estat_index::{matches_frame, record_user_index, search, search_catalog, user_index};

use super::{OutputArgs, Session, emit};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Substring to look for in the n-gram index
    pub query: String,

    /// Append the matches to the user index
    #[arg(long)]
    pub record: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Substring of a catalog index line, or "index" to list every entry
    pub query: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run_search(args: SearchArgs, session: &Session) -> Result<()> {
    let format = args.output.format()?;
    let matches = if args.record {
        record_user_index(session.layout(), &args.query)?
    } else {
        search(session.layout(), &args.query)?
    };
    log::info!("{} match(es) for {:?}", matches.len(), args.query);
    emit(&matches_frame(&matches), format, &args.output)
}

pub fn run_find(args: FindArgs, session: &Session) -> Result<()> {
    let format = args.output.format()?;
    let frame = search_catalog(session.layout(), &args.query)?;
    emit(&frame, format, &args.output)
}

pub fn run_users(args: UsersArgs, session: &Session) -> Result<()> {
    let format = args.output.format()?;
    emit(&user_index(session.layout())?, format, &args.output)
}
