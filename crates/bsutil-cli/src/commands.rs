use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use bsutil_merge::{MergeConfig, MergeSummary, Merger, TrailingBatch};
use bsutil_store::{Blockstore, FlatfsBlockstore};
use bsutil_types::Context;
use colored::Colorize;
use tracing::debug;

use crate::cli::*;
use crate::progress::{format_bytes, TextProgress};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Peek(args) => cmd_peek(args, cli.quiet),
        Command::Merge(args) => cmd_merge(args, cli.quiet),
    }
}

/// Key count and payload bytes of one peeked store.
#[derive(Debug, Default, PartialEq, Eq)]
struct PeekStats {
    blocks: u64,
    bytes: u64,
}

fn cmd_peek(args: PeekArgs, quiet: bool) -> anyhow::Result<()> {
    let ctx = Context::background();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for path in &args.inputs {
        let stats = peek_store(&ctx, path, args.count, &mut out)?;
        if args.count && !quiet {
            out.flush()?;
            eprintln!(
                "{} {} blocks, {}",
                format!("{}:", path.display()).bold(),
                stats.blocks.to_string().cyan(),
                format_bytes(stats.bytes)
            );
        }
    }
    out.flush()?;
    Ok(())
}

/// Write every key of the store at `path` to `out`, one per line.
fn peek_store(
    ctx: &Context,
    path: &Path,
    count_bytes: bool,
    out: &mut dyn Write,
) -> anyhow::Result<PeekStats> {
    let store = FlatfsBlockstore::open(path, true)?;
    let mut stats = PeekStats::default();
    for key in store.enumerate(ctx)? {
        let cid = key?;
        writeln!(out, "{cid}")?;
        stats.blocks += 1;
        if count_bytes {
            stats.bytes += store.get_size(ctx, &cid)?;
        }
    }
    store.close()?;
    debug!(path = %path.display(), blocks = stats.blocks, "peeked blockstore");
    Ok(stats)
}

fn cmd_merge(args: MergeArgs, quiet: bool) -> anyhow::Result<()> {
    let config = merge_config(&args)?;
    let ctx = match args.timeout {
        Some(secs) => Context::background().with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };

    let mut progress = TextProgress::new(quiet);
    let summary = Merger::new(config).run(&ctx, &mut progress)?;
    if !quiet {
        print_summary(&summary);
    }
    Ok(())
}

/// Settings from `--config` (or defaults), overridden by explicit flags.
fn merge_config(args: &MergeArgs) -> anyhow::Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::from_toml_file(path)?,
        None => MergeConfig::default(),
    };
    if !args.inputs.is_empty() {
        config.sources = args.inputs.clone();
    }
    if let Some(output) = &args.output {
        config.destination = output.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(shard) = args.shard {
        config.shard = shard;
    }
    if args.discard_trailing_batch {
        config.trailing_batch = TrailingBatch::Discard;
    }
    if args.no_sync_writes {
        config.sync_writes = false;
    }
    Ok(config)
}

fn print_summary(summary: &MergeSummary) {
    println!(
        "{} Finished merging into {}",
        "✓".green().bold(),
        summary.destination.display().to_string().bold()
    );
    println!(
        "  Sources: {}  Blocks: {}  Read: {} (estimated {})",
        summary.sources.len(),
        summary.blocks_written().to_string().cyan(),
        format_bytes(summary.bytes_read()),
        format_bytes(summary.estimated_bytes())
    );
    let dropped = summary.blocks_dropped();
    if dropped > 0 {
        println!(
            "  {} {} blocks in trailing batches were not written",
            "warning:".yellow().bold(),
            dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsutil_store::ShardFunc;
    use bsutil_types::{Block, Cid};
    use clap::Parser;
    use std::path::PathBuf;

    fn merge_args(argv: &[&str]) -> MergeArgs {
        let mut full = vec!["bsutil", "merge"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Merge(args) => args,
            _ => panic!("wrong command"),
        }
    }

    fn make_store(path: &Path, keys: &[&str]) {
        let ctx = Context::background();
        FlatfsBlockstore::initialize(path, ShardFunc::default()).unwrap();
        let store = FlatfsBlockstore::open(path, false).unwrap();
        let blocks: Vec<Block> = keys
            .iter()
            .map(|k| Block::new(Cid::new(*k).unwrap(), k.as_bytes().to_vec()))
            .collect();
        store.put_many(&ctx, &blocks).unwrap();
        store.sync(&ctx, "/").unwrap();
        store.close().unwrap();
    }

    // -----------------------------------------------------------------------
    // Config assembly
    // -----------------------------------------------------------------------

    #[test]
    fn flags_build_config() {
        let config = merge_config(&merge_args(&[
            "-i", "/a", "-i", "/b", "-o", "/out", "--batch-size", "7",
            "--discard-trailing-batch",
        ]))
        .unwrap();
        assert_eq!(config.sources, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(config.destination, PathBuf::from("/out"));
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.trailing_batch, TrailingBatch::Discard);
        assert!(config.sync_writes);
    }

    #[test]
    fn defaults_without_flags() {
        let config = merge_config(&merge_args(&["-i", "/a"])).unwrap();
        assert_eq!(config.destination, PathBuf::from("./merged-blockstore"));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.shard, ShardFunc::NextToLast(3));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("merge.toml");
        std::fs::write(
            &file,
            "sources = [\"/from-file\"]\ndestination = \"/file-out\"\nbatch_size = 50\nsync_writes = false\n",
        )
        .unwrap();
        let file_arg = file.to_str().unwrap();

        let config = merge_config(&merge_args(&["--config", file_arg])).unwrap();
        assert_eq!(config.sources, vec![PathBuf::from("/from-file")]);
        assert_eq!(config.batch_size, 50);
        assert!(!config.sync_writes);

        let config = merge_config(&merge_args(&[
            "--config", file_arg, "-i", "/flag", "--batch-size", "10", "--shard", "suffix/2",
        ]))
        .unwrap();
        assert_eq!(config.sources, vec![PathBuf::from("/flag")]);
        assert_eq!(config.destination, PathBuf::from("/file-out"));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.shard, ShardFunc::Suffix(2));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(merge_config(&merge_args(&["--config", missing.to_str().unwrap()])).is_err());
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    #[test]
    fn peek_lists_keys_in_layout_order() {
        let dir = tempfile::tempdir().unwrap();
        make_store(dir.path(), &["AAA1", "BBB2", "CCC3"]);

        let mut out = Vec::new();
        let stats = peek_store(&Context::background(), dir.path(), true, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut keys: Vec<&str> = text.lines().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["AAA1", "BBB2", "CCC3"]);
        assert_eq!(stats, PeekStats { blocks: 3, bytes: 12 });
    }

    #[test]
    fn peek_missing_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = peek_store(&Context::background(), &dir.path().join("missing"), false, &mut out)
            .unwrap_err();
        assert_eq!(crate::exit::code_for(&err), crate::exit::NOT_FOUND);
    }

    #[test]
    fn merge_command_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        make_store(&a, &["KEYA1", "KEYA2"]);
        make_store(&b, &["KEYB1", "KEYA2"]);
        let out = dir.path().join("out");

        let args = merge_args(&[
            "-i", a.to_str().unwrap(), "-i", b.to_str().unwrap(), "-o", out.to_str().unwrap(),
        ]);
        cmd_merge(args, true).unwrap();

        let mut sink = Vec::new();
        let stats = peek_store(&Context::background(), &out, false, &mut sink).unwrap();
        assert_eq!(stats.blocks, 3);
    }

    #[test]
    fn merge_command_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let out = dir.path().join("out");
        make_store(&a, &["KEYA1"]);
        make_store(&out, &[]);

        let args = merge_args(&["-i", a.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        let err = cmd_merge(args, true).unwrap_err();
        assert_eq!(crate::exit::code_for(&err), crate::exit::ALREADY_EXISTS);
    }
}
