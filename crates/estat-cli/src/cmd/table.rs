//! get / head / tail subcommands - print one dataset's table

use anyhow::{Context, Result};
use clap::Args;

use estat_core::{DatasetId, ProgressContext};
use estat_table::{View, ensure_table};

use super::{OutputArgs, Session, emit};

#[derive(Args, Debug)]
pub struct TableArgs {
    /// Statistics data id (e.g. 0003109558)
    pub id: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(view: View, args: TableArgs, session: &Session, progress: &ProgressContext) -> Result<()> {
    let id = DatasetId::parse(&args.id)?;
    let format = args.output.format()?;
    let ctx = session.context()?;

    let pb = progress.stage_line("fetch");
    pb.set_message(format!("{id}"));
    let table = ensure_table(&session.store, &ctx, &id, &pb)
        .with_context(|| format!("Failed to load table {id}"))?;
    pb.finish_and_clear();

    emit(&table.view(view), format, &args.output)
}
