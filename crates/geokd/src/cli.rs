//! Command-line interface for the `geokd` binary.
//!
//! Every subcommand works on a store identified by its base path; the
//! `.keys` and `.values` files live next to it. Store settings can also be
//! given through `GEOKD_*` environment variables.

use crate::kdsort::DEFAULT_NODE_SIZE;
use crate::{MmapKdStore, PackedKind, Point, PointIndex, StoreConfig};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Disk-backed 2D point index
#[derive(Debug, Parser)]
#[command(
    name = "geokd",
    about = "Build and query memory-mapped k-d sorted point stores",
    version
)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Store selection shared by all subcommands.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Base path of the store (without extension)
    pub base: PathBuf,

    /// Leaf-bucket threshold for sorting and queries
    #[arg(long, env = "GEOKD_NODE_SIZE", default_value_t = DEFAULT_NODE_SIZE)]
    pub node_size: usize,

    /// Values are numbers packed into the key records (no .values file)
    #[arg(long, env = "GEOKD_VALUES_ARE_INDEX")]
    pub values_are_index: bool,

    /// Read packed values as floats instead of integers
    #[arg(long)]
    pub float: bool,
}

impl StoreArgs {
    /// Store configuration for these arguments.
    pub fn config(&self) -> StoreConfig {
        let kind = if self.float {
            PackedKind::Float
        } else {
            PackedKind::Integer
        };
        StoreConfig::new(&self.base)
            .with_node_size(self.node_size)
            .with_values_are_index(self.values_are_index)
            .with_packed_kind(kind)
    }

    fn open(&self) -> Result<MmapKdStore<Value>> {
        MmapKdStore::open(self.config())
            .with_context(|| format!("failed to open store {}", self.base.display()))
    }
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Append points read as JSON lines `{"x":..,"y":..,"value":..}`
    Ingest {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,

        /// Input file (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Sort the store into an implicit k-d tree, in place
    Sort {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print the record at an index
    Get {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,

        /// Record index
        index: usize,
    },

    /// Print the records inside a bounding box
    ///
    /// Without `--sort` the store is taken as already sorted with the same
    /// `--node-size`; an unsorted store, or one sorted with another node
    /// size, yields incomplete results.
    Range {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,

        /// Minimum x
        #[arg(long, allow_hyphen_values = true)]
        min_x: f64,

        /// Minimum y
        #[arg(long, allow_hyphen_values = true)]
        min_y: f64,

        /// Maximum x
        #[arg(long, allow_hyphen_values = true)]
        max_x: f64,

        /// Maximum y
        #[arg(long, allow_hyphen_values = true)]
        max_y: f64,

        /// Stop after this many results
        #[arg(long)]
        limit: Option<usize>,

        /// Sort the store with `--node-size` before querying. Needed unless
        /// `sort` already ran with the same node size
        #[arg(long)]
        sort: bool,
    },

    /// Print every record in array order
    Dump {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print store length and file sizes
    Info {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete the store files
    Remove {
        /// Store to operate on
        #[command(flatten)]
        store: StoreArgs,
    },
}

/// Summary printed by `info`.
#[derive(Debug, Serialize)]
struct StoreInfo {
    base: PathBuf,
    len: usize,
    node_size: usize,
    values_are_index: bool,
    keys_bytes: u64,
    values_bytes: Option<u64>,
}

/// Run a parsed command, writing its output to `out`.
pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    match cli.command {
        Command::Ingest { store, input } => {
            let mut kd = store.open()?;
            let before = kd.len();
            match input {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    ingest(&mut kd, BufReader::new(file))?;
                }
                None => ingest(&mut kd, std::io::stdin().lock())?,
            }
            info!("Ingested {} points", kd.len() - before);
            writeln!(out, "{}", kd.len())?;
            kd.close(false)?;
        }
        Command::Sort { store } => {
            let mut kd = store.open()?;
            kd.sort()?;
            kd.flush()?;
            kd.close(false)?;
        }
        Command::Get { store, index } => {
            let mut kd = store.open()?;
            let point = kd.get(index)?;
            write_json_line(out, &point)?;
        }
        Command::Range {
            store,
            min_x,
            min_y,
            max_x,
            max_y,
            limit,
            sort,
        } => {
            let kd = store.open()?;
            let mut index: PointIndex<Value, _> = if sort {
                PointIndex::new(kd)
            } else {
                PointIndex::presorted(kd)
            };
            let found = index.search_range(min_x, min_y, max_x, max_y, limit)?;
            debug!("Range query returned {} points", found.len());
            for point in &found {
                write_json_line(out, point)?;
            }
            index.into_inner().close(false)?;
        }
        Command::Dump { store } => {
            let mut kd = store.open()?;
            for point in &mut kd {
                write_json_line(out, &point?)?;
            }
        }
        Command::Info { store } => {
            let kd = store.open()?;
            let keys_bytes = std::fs::metadata(kd.keys_path())?.len();
            let values_bytes = match kd.values_path() {
                Some(path) => Some(std::fs::metadata(path)?.len()),
                None => None,
            };
            let summary = StoreInfo {
                base: kd.path().to_path_buf(),
                len: kd.len(),
                node_size: kd.node_size(),
                values_are_index: kd.values_are_index(),
                keys_bytes,
                values_bytes,
            };
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
        }
        Command::Remove { store } => {
            let kd = store.open()?;
            kd.close(true)?;
            info!("Removed store {}", store.base.display());
        }
    }
    Ok(())
}

fn ingest<R: BufRead>(store: &mut MmapKdStore<Value>, reader: R) -> Result<()> {
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let point: Point<Value> = serde_json::from_str(&line)
            .with_context(|| format!("line {}: expected {{\"x\",\"y\",\"value\"}}", number + 1))?;
        store
            .push(&point)
            .with_context(|| format!("line {}: push failed", number + 1))?;
    }
    Ok(())
}

fn write_json_line<W: Write, S: Serialize>(out: &mut W, value: &S) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
