//! # 歌词格式生成器
//!
//! 所有生成器接收规范模型 [`LyricDocument`](crate::converter::types::LyricDocument)
//! 的引用，输出目标格式的完整文本。粒度降级（例如逐字文档生成 LRC）
//! 由生成器静默完成，精度损失的统计在转换入口处进行。

mod json_generator;
mod lrc_generator;
mod srt_generator;
mod ttml_generator;

pub use json_generator::generate_json;
pub use lrc_generator::{generate_enhanced_lrc, generate_lrc};
pub use srt_generator::generate_srt;
pub use ttml_generator::generate_ttml;

/// 行没有显式结束时间、又借不到下一行开始时间时使用的默认时长。
pub(crate) const DEFAULT_LAST_LINE_DURATION_MS: u64 = 10_000;
