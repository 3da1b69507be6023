//! Persistent 2D point index.
//!
//! Points are appended to a pair of files and later reordered, in place,
//! into an implicit k-d tree so that range and radius queries can prune
//! whole subarrays. The files are accessed through memory maps, which lets
//! a store grow far past available RAM.
//!
//! # Architecture
//!
//! - `record`: 24-byte key record layout and packed values
//! - `writer`: unbuffered appends to the `.keys` and `.values` files
//! - `view`: lazily (re)established memory maps
//! - `select`: Floyd–Rivest selection over any [`arena::RecordArray`]
//! - `kdsort`: recursive median split on alternating axes
//! - `store`: [`MmapKdStore`] and its in-memory twin [`MemoryKdStore`]
//! - `query`: [`PointIndex`] range and radius searches
//! - `cli`: the `geokd` command-line tool
//!
//! # Example
//!
//! ```no_run
//! use geokd::{MmapKdStore, Point, PointIndex, StoreConfig};
//!
//! fn main() -> geokd::Result<()> {
//!     let config = StoreConfig::new("/tmp/cities").with_node_size(32);
//!     let mut store: MmapKdStore<String> = MmapKdStore::open(config)?;
//!
//!     store.push(&Point::new(2.35, 48.86, "Paris".to_string()))?;
//!     store.push(&Point::new(13.40, 52.52, "Berlin".to_string()))?;
//!     store.sort()?;
//!
//!     let mut index = PointIndex::presorted(store);
//!     for city in index.search_range(0.0, 45.0, 10.0, 50.0, None)? {
//!         println!("{}", city.value);
//!     }
//!
//!     index.into_inner().close(false)
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod arena;
pub mod cli;
pub mod config;
pub mod error;
pub mod kdsort;
mod packed;
pub mod query;
pub mod record;
pub mod select;
pub mod store;
pub mod view;
pub mod writer;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use kdsort::{DEFAULT_NODE_SIZE, kd_sort};
pub use query::PointIndex;
pub use record::{KEY_LENGTH, PackedKind, PackedValue, Point};
pub use store::{KdStore, MemoryKdStore, MmapKdStore};
