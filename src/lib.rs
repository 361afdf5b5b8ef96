//! # Lyrics Converter: A Conversion Engine for Timed Lyric Formats
//!
//! This crate converts between timed lyric formats through a single canonical
//! model. Supported formats are line-synced LRC, word-synced enhanced LRC,
//! Apple Music style TTML, SRT subtitles, and a structured JSON form that
//! serializes the model itself. Every input is first parsed into a
//! [`LyricDocument`], then the target format is generated from that model, so
//! adding a format never multiplies conversion paths.
//!
//! Timing is stored as absolute milliseconds from song start. Conversions
//! that lower the sync granularity (for example word-synced lyrics into plain
//! LRC) still succeed; the outcome carries a [`PrecisionLoss`] report instead
//! of failing.
//!
//! The entry point is [`convert`]:
//!
//! ```rust
//! use lyrics_converter::{ConversionOptions, LyricFormat, convert};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. SRT subtitles in, line-synced LRC out.
//!     let srt = "1\n00:00:01,000 --> 00:00:03,500\nHello\nworld\n";
//!     let outcome = convert(
//!         srt,
//!         LyricFormat::Srt,
//!         LyricFormat::Lrc,
//!         &ConversionOptions::default(),
//!     )?;
//!     assert_eq!(outcome.output, "[00:01.00]Hello\nworld\n");
//!
//!     // 2. Degrading word-synced lyrics is allowed, and the outcome
//!     //    reports how many word timestamps were discarded.
//!     let enhanced = "[00:05.00]<00:05.00>Take <00:05.30>on <00:05.60>me<00:06.00>\n";
//!     let outcome = convert(
//!         enhanced,
//!         LyricFormat::EnhancedLrc,
//!         LyricFormat::Lrc,
//!         &ConversionOptions::default(),
//!     )?;
//!     assert_eq!(outcome.output, "[00:05.00]Take on me\n");
//!     assert_eq!(outcome.precision_loss.unwrap().discarded_word_timings, 3);
//!
//!     Ok(())
//! }
//! ```

pub mod converter;
pub mod error;

pub use converter::config::*;
pub use converter::types::*;
pub use converter::{convert, generate, parse, resolve_format};
pub use error::*;
