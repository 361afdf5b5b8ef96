//! # SRT 格式解析器
//!
//! 按空行把内容切分为字幕块。块内的序号只被读取、从不校验：缺失、重复或
//! 乱序的序号一律容忍。无法解析的块被记录为跳过条目，不会中止整个文件的解析。

use crate::converter::timestamp::parse_srt_time;
use crate::converter::types::{
    LyricDocument, LyricFormat, LyricLine, LyricWord, ParsedLyrics, SkippedEntry,
};
use crate::error::ConvertError;

/// 解析 SRT 字幕内容到 [`ParsedLyrics`]。
///
/// 每个字幕块产出一个带起止时间的行；块内的多行文本用 `\n` 连接为
/// 单个未计时单词。SRT 不携带元数据。
///
/// # Errors
///
/// 块级失败被降级为跳过条目；返回 `Result` 以与其它格式的解析器保持一致的签名。
pub fn parse_srt(content: &str) -> Result<ParsedLyrics, ConvertError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let normalized = content.replace("\r\n", "\n");

    let mut document = LyricDocument::default();
    let mut skipped: Vec<SkippedEntry> = Vec::new();

    for (i, block) in normalized
        .split("\n\n")
        .map(|block| block.trim_matches('\n'))
        .filter(|block| !block.trim().is_empty())
        .enumerate()
    {
        match parse_block(block) {
            Ok(line) => document.lines.push(line),
            Err(reason) => skipped.push(SkippedEntry {
                index: i + 1,
                content: block.to_string(),
                reason,
            }),
        }
    }

    Ok(ParsedLyrics {
        document,
        source_format: LyricFormat::Srt,
        skipped,
        warnings: Vec::new(),
    })
}

/// 解析单个字幕块，失败时返回跳过原因。
///
/// 时间范围行必须出现在块的前两行里（序号行可以缺失）。
fn parse_block(block: &str) -> Result<LyricLine, String> {
    let lines: Vec<&str> = block.lines().collect();
    let range_pos = lines
        .iter()
        .take(2)
        .position(|line| line.contains("-->"))
        .ok_or_else(|| "缺少时间范围行".to_string())?;

    let (start_str, end_str) = lines[range_pos]
        .split_once("-->")
        .ok_or_else(|| "时间范围行格式无效".to_string())?;
    let start_ms = parse_srt_time(start_str.trim()).map_err(|e| e.to_string())?;
    let end_ms = parse_srt_time(end_str.trim()).map_err(|e| e.to_string())?;
    if end_ms < start_ms {
        return Err(format!(
            "结束时间 {} 早于开始时间 {}",
            end_str.trim(),
            start_str.trim()
        ));
    }

    let text = lines[range_pos + 1..].join("\n");
    let words = if text.is_empty() {
        Vec::new()
    } else {
        vec![LyricWord {
            text,
            start_ms: None,
            end_ms: None,
        }]
    };

    Ok(LyricLine {
        start_ms: Some(start_ms),
        end_ms: Some(end_ms),
        words,
        ..Default::default()
    })
}
