//! ObjectIO Unique Identifiers
//!
//! This crate hands out process-wide unique, bounded-width integer
//! identifiers used to tag live storage objects (pools, volumes,
//! snapshots). Identifiers are `u64` values confined to the low
//! [`UNIQUE_BITS`] bits; zero is never handed out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Engine subsystems   │  insert / create / remove
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐     unlocked      ┌─────────────────┐
//! │   UniqueRegistry     │ ◄──────────────── │ CandidateSource │
//! │  Mutex<BTreeMap<..>> │     draws         └─────────────────┘
//! │  guard-word checks   │
//! └──────────────────────┘
//! ```
//!
//! Every stored entry carries three guard words. A guard that no longer
//! holds [`GUARD_PATTERN`] means the registry's memory was overwritten; the
//! registry logs the damage and panics rather than continue.
//!
//! # Example
//!
//! ```
//! use objectio_unique::UniqueRegistry;
//!
//! let registry = UniqueRegistry::default();
//! let pool_guid = registry.insert(0);
//! assert!(registry.contains(pool_guid));
//!
//! let transient = registry.create();
//! assert!(!registry.contains(transient));
//!
//! registry.remove(pool_guid);
//! registry.finalize();
//! ```

mod entry;
pub mod registry;
pub mod source;
pub mod stats;

pub use entry::GUARD_PATTERN;
pub use objectio_common::{UNIQUE_BITS, UNIQUE_MASK};
pub use registry::{UniqueGuard, UniqueRegistry};
pub use source::{CandidateSource, SeededSource, ThreadRngSource};
pub use stats::{StatsSnapshot, UniqueStats};
