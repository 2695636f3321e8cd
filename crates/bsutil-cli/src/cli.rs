use std::path::PathBuf;

use bsutil_store::ShardFunc;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bsutil",
    about = "Inspect and merge flatfs blockstores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every key stored in one or more blockstores
    #[command(alias = "lmbd-peek")]
    Peek(PeekArgs),
    /// Merge blockstores into a new blockstore
    Merge(MergeArgs),
}

#[derive(Args)]
pub struct PeekArgs {
    /// Blockstore to read (repeatable)
    #[arg(short = 'i', long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print block count and total payload size per store
    #[arg(long)]
    pub count: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Source blockstore (repeatable, merged in order)
    #[arg(short = 'i', long = "input")]
    pub inputs: Vec<PathBuf>,

    /// Destination blockstore [default: ./merged-blockstore]
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Blocks per write batch [default: 100]
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Shard function of the destination, e.g. next-to-last/3
    #[arg(long)]
    pub shard: Option<ShardFunc>,

    /// Drop the last partial batch of each source instead of writing it
    #[arg(long)]
    pub discard_trailing_batch: bool,

    /// Skip the per-block fsync; blocks are still synced once at the end
    #[arg(long)]
    pub no_sync_writes: bool,

    /// Abort the merge after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// TOML file with merge settings; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
