//! Data models for the asset cache.
//!
//! This module contains the types shared between the network layer,
//! the bucket store, and the worker:
//!
//! - `PrecacheManifest`: the per-build list of assets to precache
//! - `FetchedResponse`: a response as delivered by the network layer
//! - `StoredResponse`, `EntryMeta`: a response at rest in a bucket
//! - `ResponseKind`: origin classification driving the store policy

pub mod manifest;
pub mod response;

pub use manifest::PrecacheManifest;
pub use response::{EntryMeta, FetchedResponse, ResponseKind, StoredResponse};
