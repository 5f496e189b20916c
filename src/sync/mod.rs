// src/sync/mod.rs
pub mod connectivity;
pub mod engine;
pub mod queue;
pub mod types;

pub use connectivity::ConnectivityMonitor;
pub use engine::SyncEngine;
pub use queue::PendingQueue;
pub use types::{PendingAttendanceRecord, PendingEmbeddingUpdate, QueueSnapshot, SyncReport};
