//! Offline asset cache engine for the Saju web platform.
//!
//! The app's static assets (HTML shell, hashed JS/CSS bundles, icons, web
//! manifest) are held in version-tagged cache buckets on disk. A per-build
//! precache manifest drives eager installation, activation retires every
//! bucket but the current version's, and fetches are served cache-first with
//! live responses stored for future hits.
//!
//! Module map:
//!
//! - [`models`]: manifest and response types
//! - [`net`]: the `Fetcher` seam and its reqwest backend
//! - [`cache`]: versioned bucket storage
//! - [`worker`]: the install / activate / fetch lifecycle
//! - [`config`]: on-disk application configuration

pub mod cache;
pub mod config;
pub mod models;
pub mod net;
pub mod worker;
