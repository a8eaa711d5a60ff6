//! Fetcher module for downloading plain resources.
//!
//! This module provides the `Fetcher` trait and the reqwest based
//! `HttpFetcher`. Bodies are streamed chunk by chunk into a `.part` file next
//! to the destination and renamed into place once complete, so a destination
//! that exists is always a finished download.
//!
//! # Example
//!
//! ```ignore
//! use batchfetch_core::fetcher::{Fetcher, HttpFetcher};
//! use batchfetch_core::config::FetchConfig;
//!
//! let fetcher = HttpFetcher::new(FetchConfig::default())?;
//! let path = fetcher
//!     .fetch("https://example.com/notes.pdf", Path::new("work/0001_notes.pdf"))
//!     .await?;
//! ```

mod error;
mod http;
mod traits;

pub use error::FetchError;
pub use http::HttpFetcher;
pub use traits::{FetchProgress, Fetcher};
