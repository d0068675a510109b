//! # blockpool
//!
//! Fixed-block memory pool allocator with typed ownership handles.
//! Built with safety, performance, and maintainability as primary design
//! constraints.
//!
//! ### Expectations (Production):
//! - Zero system-allocator calls on the allocate/deallocate hot path
//! - O(1) checkout and return, no fragmentation across equal-sized blocks
//! - Single-threaded by construction: the pool is neither `Send` nor `Sync`
//!
//! ### Key Submodules:
//! - `pool`: `BlockPool` with a LIFO free list over pre-acquired blocks
//! - `handle`: `PooledBox`, a move-only handle binding value lifetime to
//!   block lifetime
//! - `adapter`: `BlockSource` capability + `PoolVec` pool-backed sequence
//! - `config`: validated, serializable pool parameters
//! - `stats`: checkout/return/exhaustion counters

pub mod adapter;
pub mod config;
pub mod error;
pub mod handle;
pub mod pool;
pub mod stats;

pub use adapter::{BlockSource, PoolVec};
pub use config::{ConfigError, PoolConfig};
pub use error::{CreateError, PoolError};
pub use handle::PooledBox;
pub use pool::{BlockPool, RawBlock, BLOCK_ALIGN};
pub use stats::PoolStats;

pub mod prelude {
    pub use crate::adapter::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::handle::*;
    pub use crate::pool::*;
    pub use crate::stats::*;
}
