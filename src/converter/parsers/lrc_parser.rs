//! # LRC 格式解析器
//!
//! 同时服务普通 LRC 和增强型 LRC：行内的 `<MM:SS.xx>` 逐字标记总是被识别，
//! 调用方无需预先区分两种变体。
//!
//! 没有时间戳前缀的行按约定附加到上一个计时行的文本尾部（以 `\n` 分隔）；
//! 若之前没有任何计时行，该行被丢弃并记录警告。行的顺序保持与源文件一致，
//! 时间戳乱序不会被重排。
//!
//! 计时行尾部的 ` [bg:...]` 片段是依附于该行的背景和声，
//! 内容同样可以携带逐字标记。

use std::sync::LazyLock;

use regex::Regex;

use crate::converter::metadata::parse_and_store_metadata;
use crate::converter::timestamp::parse_lrc_time;
use crate::converter::types::{
    LyricDocument, LyricFormat, LyricLine, LyricWord, ParsedLyrics, SkippedEntry,
};
use crate::error::ConvertError;

/// 匹配一个完整的 LRC 歌词行，捕获时间戳部分和文本部分
static LRC_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\[\d{2,}:\d{2}[.:]\d{2,3}])+)(.*)$").expect("未能编译 LRC_LINE_REGEX")
});

/// 从时间戳组中提取单个时间戳
static LRC_TIMESTAMP_EXTRACT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2,}:\d{2}[.:]\d{2,3})]").expect("未能编译 LRC_TIMESTAMP_EXTRACT_REGEX")
});

/// 紧跟在时间戳后的演唱者前缀，如 `v1:`，冒号后至多消费一个空格
static AGENT_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(v\d+): ?").expect("未能编译 AGENT_PREFIX_REGEX"));

/// 行内逐字时间标记
static WORD_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(\d{2,}:\d{2}[.:]\d{2,3})>").expect("未能编译 WORD_MARKER_REGEX")
});

/// 背景和声片段，内容截至第一个 `]`，片段前至多一个空格一并消费
static BG_SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\[bg:([^\]]*)]").expect("未能编译 BG_SEGMENT_REGEX"));

/// 解析 LRC 格式内容到 [`ParsedLyrics`]。
///
/// # Errors
///
/// 当前实现把无效时间戳降级为警告或跳过记录，不会中止解析；
/// 返回 `Result` 以与其它格式的解析器保持一致的签名。
pub fn parse_lrc(content: &str) -> Result<ParsedLyrics, ConvertError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut document = LyricDocument::default();
    let mut skipped: Vec<SkippedEntry> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (line_num, line_str) in content.lines().enumerate() {
        let index = line_num + 1;
        if line_str.trim().is_empty()
            || parse_and_store_metadata(line_str.trim(), &mut document.metadata)
        {
            continue;
        }

        if let Some(line_caps) = LRC_LINE_REGEX.captures(line_str) {
            let all_timestamps_str = line_caps.get(1).map_or("", |m| m.as_str());
            let rest = line_caps.get(2).map_or("", |m| m.as_str());

            let mut stamps: Vec<u64> = Vec::new();
            for ts_cap in LRC_TIMESTAMP_EXTRACT_REGEX.captures_iter(all_timestamps_str) {
                match parse_lrc_time(&ts_cap[1]) {
                    Ok(ms) => stamps.push(ms),
                    Err(err) => warnings.push(format!("第 {index} 行: {err}")),
                }
            }
            if stamps.is_empty() {
                skipped.push(SkippedEntry {
                    index,
                    content: line_str.to_string(),
                    reason: "没有可用的行时间戳".to_string(),
                });
                continue;
            }

            let (agent, text) = match AGENT_PREFIX_REGEX.captures(rest) {
                Some(agent_caps) => (
                    Some(agent_caps[1].to_string()),
                    &rest[agent_caps[0].len()..],
                ),
                None => (None, rest.strip_prefix(' ').unwrap_or(rest)),
            };

            let (text, bg_text) = extract_background(text);
            let (background_words, _) = split_inline_words(&bg_text, None, index, &mut warnings);

            for &start_ms in &stamps {
                let (words, line_end) =
                    split_inline_words(&text, Some(start_ms), index, &mut warnings);
                document.lines.push(LyricLine {
                    start_ms: Some(start_ms),
                    end_ms: line_end,
                    agent: agent.clone(),
                    words,
                    background_words: background_words.clone(),
                });
            }
        } else if let Some(prev) = document.lines.last_mut() {
            // 自由文本附加到上一个计时行
            if let Some(last_word) = prev.words.last_mut() {
                last_word.text.push('\n');
                last_word.text.push_str(line_str);
            } else {
                prev.words.push(LyricWord {
                    text: format!("\n{line_str}"),
                    start_ms: None,
                    end_ms: None,
                });
            }
        } else {
            warnings.push(format!(
                "第 {index} 行: 没有可附加的前置计时行，自由文本被丢弃: '{line_str}'"
            ));
        }
    }

    Ok(ParsedLyrics {
        document,
        source_format: LyricFormat::Lrc,
        skipped,
        warnings,
    })
}

/// 提取文本中的 ` [bg:...]` 背景和声片段。
///
/// 返回移除片段后的主文本和按出现顺序拼接的背景内容。
fn extract_background(text: &str) -> (String, String) {
    let mut main = String::with_capacity(text.len());
    let mut background = String::new();
    let mut cursor = 0;
    for caps in BG_SEGMENT_REGEX.captures_iter(text) {
        let whole = caps.get(0).expect("捕获组 0 必然存在");
        main.push_str(&text[cursor..whole.start()]);
        background.push_str(&caps[1]);
        cursor = whole.end();
    }
    main.push_str(&text[cursor..]);
    (main, background)
}

/// 按行内 `<MM:SS.xx>` 标记把文本拆分为单词序列。
///
/// 每个标记开启一个单词；下一个标记是上一个单词的结束；行尾的裸标记
/// 关闭最后一个单词并成为整行的结束时间。第一个标记之前的文本作为
/// 前导单词，起始时间取 `leading_start_ms`：主歌词传入行时间戳，
/// 背景和声内容没有隐含起点，传入 `None`。标记之间的空文本只贡献计时，
/// 不产生空单词。
fn split_inline_words(
    text: &str,
    leading_start_ms: Option<u64>,
    line_index: usize,
    warnings: &mut Vec<String>,
) -> (Vec<LyricWord>, Option<u64>) {
    let mut markers: Vec<(usize, usize, u64)> = Vec::new();
    for caps in WORD_MARKER_REGEX.captures_iter(text) {
        let whole = caps.get(0).expect("捕获组 0 必然存在");
        match parse_lrc_time(&caps[1]) {
            Ok(ms) => markers.push((whole.start(), whole.end(), ms)),
            Err(err) => warnings.push(format!("第 {line_index} 行: 逐字标记被忽略: {err}")),
        }
    }

    if markers.is_empty() {
        if text.is_empty() {
            return (Vec::new(), None);
        }
        return (
            vec![LyricWord {
                text: text.to_string(),
                start_ms: None,
                end_ms: None,
            }],
            None,
        );
    }

    let mut words: Vec<LyricWord> = Vec::new();

    let leading = &text[..markers[0].0];
    if !leading.is_empty() {
        words.push(LyricWord {
            text: leading.to_string(),
            start_ms: leading_start_ms,
            end_ms: None,
        });
    }

    let mut line_end: Option<u64> = None;
    for (i, &(_, marker_end, marker_ms)) in markers.iter().enumerate() {
        if let Some(open_word) = words.last_mut() {
            if open_word.end_ms.is_none() {
                open_word.end_ms = Some(marker_ms);
            }
        }

        let segment_end = markers.get(i + 1).map_or(text.len(), |next| next.0);
        let segment = &text[marker_end..segment_end];
        if segment.is_empty() {
            // 行尾的裸标记记录整行的结束时间
            if i == markers.len() - 1 {
                line_end = Some(marker_ms);
            }
        } else {
            words.push(LyricWord {
                text: segment.to_string(),
                start_ms: Some(marker_ms),
                end_ms: None,
            });
        }
    }

    (words, line_end)
}
