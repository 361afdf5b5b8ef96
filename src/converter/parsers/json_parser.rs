//! # JSON 格式解析器
//!
//! JSON 是规范模型的直接序列化，因此解析是严格的：不合法的 JSON、
//! 缺失的必需字段和违反时间约束的值都会返回错误，而不是降级为跳过条目。

use crate::converter::types::{LyricDocument, LyricFormat, ParsedLyrics};
use crate::error::ConvertError;

/// 解析规范 JSON 内容到 [`ParsedLyrics`]。
///
/// # Errors
///
/// - [`ConvertError::JsonParse`]: 内容不是合法 JSON 或不符合文档结构；
/// - [`ConvertError::Structural`]: 行或单词的结束时间早于开始时间。
pub fn parse_json(content: &str) -> Result<ParsedLyrics, ConvertError> {
    let document: LyricDocument =
        serde_json::from_str(content)
            .map_err(|e| ConvertError::json_parse(e, "歌词文档".to_string()))?;
    validate_document(&document)?;

    Ok(ParsedLyrics {
        document,
        source_format: LyricFormat::Json,
        skipped: Vec::new(),
        warnings: Vec::new(),
    })
}

/// 校验时间约束：任何已知起止时间对都必须满足 `end >= start`。
fn validate_document(document: &LyricDocument) -> Result<(), ConvertError> {
    for (line_idx, line) in document.lines.iter().enumerate() {
        if let (Some(start), Some(end)) = (line.start_ms, line.end_ms) {
            if end < start {
                return Err(ConvertError::Structural(format!(
                    "lines[{line_idx}]: 结束时间 {end} 早于开始时间 {start}"
                )));
            }
        }
        for (word_idx, word) in line.words.iter().enumerate() {
            if let (Some(start), Some(end)) = (word.start_ms, word.end_ms) {
                if end < start {
                    return Err(ConvertError::Structural(format!(
                        "lines[{line_idx}].words[{word_idx}]: 结束时间 {end} 早于开始时间 {start}"
                    )));
                }
            }
        }
        for (word_idx, word) in line.background_words.iter().enumerate() {
            if let (Some(start), Some(end)) = (word.start_ms, word.end_ms) {
                if end < start {
                    return Err(ConvertError::Structural(format!(
                        "lines[{line_idx}].background_words[{word_idx}]: 结束时间 {end} 早于开始时间 {start}"
                    )));
                }
            }
        }
    }
    Ok(())
}
