//! mres-select library interface
//!
//! Chooses the next track by descriptor similarity, skipping duplicates of
//! the current track and favouring tracks not played recently.

pub mod distance;
pub mod engine;
pub mod stores;

pub use engine::{SelectError, Selection, SelectionEngine, Winner};
pub use stores::{DetachedPlayHistory, MetadataStore, PlayHistoryStore};
