//! Reelcut Project Model
//!
//! Defines the records a render job reads and writes:
//! - **Project:** identity, lifecycle status, source and output media paths
//! - **Caption:** a timed line of text with an optional persisted style
//! - **Highlight:** a time window of the source selected for the short
//!
//! Times are seconds from the start of the source video. Records are owned
//! by a store; the render engine only ever sees snapshots of them.

pub mod caption;
pub mod highlight;
pub mod json_store;
pub mod memory_store;
pub mod project;
pub mod store;

pub use caption::*;
pub use highlight::*;
pub use json_store::JsonStore;
pub use memory_store::MemoryStore;
pub use project::*;
pub use store::*;
