// src/remote/mod.rs
pub mod client;
pub mod error;
pub mod matcher;
pub mod types;

pub use client::{HostedStoreClient, RemoteStore};
pub use error::RemoteError;
pub use matcher::RemoteMatcher;
