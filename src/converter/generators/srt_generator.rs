//! # SRT 格式生成器
//!
//! 字幕块一律从 1 重新编号，源文件中的任何编号都不参与输出。
//! 没有显式结束时间的行借用下一行的开始时间，最后一行使用固定的默认时长。

use crate::converter::timestamp::format_srt_time;
use crate::converter::types::LyricDocument;
use crate::error::ConvertError;

use super::DEFAULT_LAST_LINE_DURATION_MS;

/// 生成 SRT 字幕文本。
///
/// 字幕文本是行内所有单词的拼接，换行符原样保留；单词级时间被丢弃。
/// 背景和声作为独立的字幕块紧随所属行。SRT 不携带元数据，
/// 模型中的元数据不会出现在输出里。
///
/// # Errors
///
/// 文档中存在没有起始时间的行时返回 [`ConvertError::Structural`]：
/// 每个字幕块都必须有完整的时间范围。
pub fn generate_srt(document: &LyricDocument) -> Result<String, ConvertError> {
    let mut blocks: Vec<String> = Vec::with_capacity(document.lines.len());
    let mut cue_number = 0usize;

    for (i, line) in document.lines.iter().enumerate() {
        let start_ms = line.start_ms.ok_or_else(|| {
            ConvertError::Structural(format!(
                "第 {} 行没有起始时间，无法生成 SRT 时间范围",
                i + 1
            ))
        })?;
        let end_ms = line.end_ms.unwrap_or_else(|| {
            document
                .lines
                .get(i + 1)
                .and_then(|next| next.start_ms)
                .filter(|&next_start| next_start >= start_ms)
                .unwrap_or_else(|| start_ms.saturating_add(DEFAULT_LAST_LINE_DURATION_MS))
        });

        cue_number += 1;
        blocks.push(render_block(cue_number, start_ms, end_ms, &line.text()));

        // 背景块没有自带时间时借用主行的时间范围
        if !line.background_words.is_empty() {
            let bg_start = line
                .background_words
                .iter()
                .find_map(|w| w.start_ms)
                .unwrap_or(start_ms);
            let bg_end = line
                .background_words
                .iter()
                .rev()
                .find_map(|w| w.end_ms)
                .unwrap_or(end_ms);
            cue_number += 1;
            blocks.push(render_block(
                cue_number,
                bg_start,
                bg_end,
                &line.background_text(),
            ));
        }
    }

    Ok(blocks.join("\n"))
}

fn render_block(number: usize, start_ms: u64, end_ms: u64, text: &str) -> String {
    let mut block = format!(
        "{}\n{} --> {}\n",
        number,
        format_srt_time(start_ms),
        format_srt_time(end_ms)
    );
    if !text.is_empty() {
        block.push_str(text);
        block.push('\n');
    }
    block
}
