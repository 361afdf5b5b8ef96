//! # 各歌词格式的解析器
//!
//! 所有解析器都产出统一的 [`ParsedLyrics`](crate::converter::types::ParsedLyrics)，
//! 可恢复的条目级失败记录在 `skipped` 与 `warnings` 中而不是中止解析。

mod json_parser;
mod lrc_parser;
mod srt_parser;
mod ttml_parser;

pub use json_parser::parse_json;
pub use lrc_parser::parse_lrc;
pub use srt_parser::parse_srt;
pub use ttml_parser::parse_ttml;
