//! Merge subcommand - union several datasets, optionally grouped and reduced

use anyhow::{Context, Result};
use clap::Args;

use estat_core::ProgressContext;

use super::{OutputArgs, Session, emit};

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Comma-separated statistics data ids
    pub ids: String,

    /// Comma-separated grouping columns, or "all" for a plain union
    pub group_by: String,

    /// sum, min, max, median, count, var, std or mean; omit to project the
    /// grouping and value columns without reducing
    #[arg(short, long, default_value = "")]
    pub aggregate: String,

    /// DuckDB memory limit (e.g. "1GB")
    #[arg(long)]
    pub memory_limit: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: MergeArgs, session: &Session, progress: &ProgressContext) -> Result<()> {
    let format = args.output.format()?;
    let ctx = session.context()?;
    let mut config = session.config.merge_config();
    if let Some(limit) = args.memory_limit {
        config.memory_limit = limit;
    }

    let pb = progress.stage_line("merge");
    let merged = estat_merge::merge(
        &session.store,
        &ctx,
        &args.ids,
        &args.group_by,
        &args.aggregate,
        &config,
        &pb,
    )
    .with_context(|| format!("Failed to merge {}", args.ids))?;
    pb.finish_and_clear();

    emit(&merged, format, &args.output)
}
