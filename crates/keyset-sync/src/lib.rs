//! # keyset-sync
//!
//! Followers that keep a replica [`KeyedSet`](keyset_core::KeyedSet)
//! converged onto a leader by pulling bounded batches out of a live
//! coalescing patch.
//!
//! ## Example
//!
//! ```rust
//! use keyset_core::KeyedSet;
//! use keyset_sync::{Follower, SyncConfigBuilder};
//!
//! let mut leader: KeyedSet<u32> = KeyedSet::new();
//! leader.add(1).unwrap();
//!
//! let config = SyncConfigBuilder::new().max_batch_size(2).build();
//! let mut follower = Follower::new(&leader, config);
//!
//! for n in 2..=6 {
//!     leader.add(n).unwrap();
//! }
//! leader.delete(&4).unwrap();
//! assert_eq!(follower.backlog(), 4);
//!
//! assert_eq!(follower.pull().unwrap(), 2);
//! follower.catch_up().unwrap();
//! assert!(follower.is_converged(&leader));
//! ```

pub mod config;
pub mod error;
pub mod follower;

pub use config::{SyncConfig, SyncConfigBuilder};
pub use error::{Result, SyncError};
pub use follower::{Follower, SyncStats};
