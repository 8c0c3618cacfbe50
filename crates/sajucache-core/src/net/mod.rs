//! Network fetch layer.
//!
//! This module provides the `Fetcher` trait and its reqwest-backed
//! `HttpClient` implementation, plus the one-shot fallback retry used by the
//! fetch handler. The trait seam exists so tests can substitute a scripted
//! backend and observe exactly how many network calls a flow makes.

pub mod client;
pub mod error;

pub use client::{fetch_with_fallback, Fetcher, HttpClient};
pub use error::FetchError;
