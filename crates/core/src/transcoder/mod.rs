//! Transcoder module for remuxing streaming playlists into single files.
//!
//! This module provides the `Transcoder` trait, the FFmpeg based
//! implementation and the `ConversionLimiter` that bounds how many remux
//! processes run at once, independently of how many workers are busy.
//!
//! # Example
//!
//! ```ignore
//! use batchfetch_core::transcoder::{ConversionLimiter, FfmpegTranscoder, Transcoder};
//! use batchfetch_core::config::TranscodeConfig;
//!
//! let config = TranscodeConfig::default();
//! let limiter = ConversionLimiter::new(config.max_parallel);
//! let transcoder = FfmpegTranscoder::new(config, limiter.clone());
//!
//! let path = transcoder
//!     .convert(
//!         "https://example.com/live/index.m3u8",
//!         Path::new("work/0003_index.mp4"),
//!         Some(Duration::from_secs(600)),
//!     )
//!     .await?;
//! ```

mod error;
mod ffmpeg;
mod limiter;
mod traits;

pub use error::TranscodeError;
pub use ffmpeg::{FfmpegTranscoder, DIAGNOSTIC_LIMIT};
pub use limiter::{ConversionLimiter, ConversionSlot};
pub use traits::Transcoder;
