//! # LRC 格式生成器
//!
//! 普通 LRC 和增强型 LRC 共享同一套渲染逻辑，区别只在于是否写出行内
//! `<MM:SS.xx>` 逐字标记。输出头部的元数据指令按固定顺序排列，
//! 与模型中的插入顺序无关。背景和声以 ` [bg:...]` 片段写在所属行尾。

use std::fmt::Write as FmtWrite;

use crate::converter::metadata::generate_lrc_header;
use crate::converter::timestamp::format_lrc_time;
use crate::converter::types::{LyricDocument, LyricLine, LyricWord};
use crate::error::ConvertError;

/// 生成普通 LRC。单词级时间被丢弃，只保留行时间戳。
///
/// # Errors
///
/// 格式化写入失败时返回 [`ConvertError::Format`]。
pub fn generate_lrc(document: &LyricDocument) -> Result<String, ConvertError> {
    render(document, false)
}

/// 生成增强型 LRC，为携带独立单词时间的行写出行内逐字标记。
///
/// # Errors
///
/// 格式化写入失败时返回 [`ConvertError::Format`]。
pub fn generate_enhanced_lrc(document: &LyricDocument) -> Result<String, ConvertError> {
    render(document, true)
}

fn render(document: &LyricDocument, with_word_markers: bool) -> Result<String, ConvertError> {
    let mut output = generate_lrc_header(&document.metadata);

    for line in &document.lines {
        match line.start_ms {
            Some(start_ms) => {
                write!(output, "[{}]", format_lrc_time(start_ms))?;
                if let Some(agent) = &line.agent {
                    write!(output, "{agent}:")?;
                }
                if with_word_markers && has_distinct_word_timing(line, start_ms) {
                    write_marker_run(&mut output, &line.words, line.end_ms, Some(start_ms))?;
                } else {
                    output.push_str(&line.text());
                }
            }
            // 没有起始时间的行写成自由文本，重新解析时附加到上一行
            None => output.push_str(&line.text()),
        }
        write_background(&mut output, line, with_word_markers)?;
        output.push('\n');
    }

    Ok(output)
}

/// 只有当某个单词携带与行起始不同的时间信息时，逐字标记才有意义。
fn has_distinct_word_timing(line: &LyricLine, line_start_ms: u64) -> bool {
    line.words.iter().any(|word| {
        word.end_ms.is_some() || word.start_ms.is_some_and(|start| start != line_start_ms)
    })
}

/// 写出一段带逐字标记的单词序列。
///
/// 与刚写出的时间重复的开始标记被省略，因此连续单词只产生结束标记，
/// 而单词之间的间隙会写出两个标记。`current_ms` 是序列之前已写出的
/// 时间：主歌词传入行时间戳，背景和声没有前置标记则传入 `None`。
/// 一旦某个单词的文本携带换行符，剩余的标记全部省略：它们会落到
/// 下一个物理行上，重新解析时无法再被识别为标记。
fn write_marker_run(
    output: &mut String,
    words: &[LyricWord],
    final_end_ms: Option<u64>,
    mut current_ms: Option<u64>,
) -> Result<(), ConvertError> {
    let mut markers_live = true;

    for word in words {
        if markers_live {
            if let Some(start) = word.start_ms {
                if current_ms != Some(start) {
                    write!(output, "<{}>", format_lrc_time(start))?;
                    current_ms = Some(start);
                }
            }
        }
        output.push_str(&word.text);
        if word.text.contains('\n') {
            markers_live = false;
        }
        if markers_live {
            if let Some(end) = word.end_ms {
                write!(output, "<{}>", format_lrc_time(end))?;
                current_ms = Some(end);
            }
        }
    }

    if markers_live {
        if let Some(final_end) = final_end_ms {
            if current_ms != Some(final_end) {
                write!(output, "<{}>", format_lrc_time(final_end))?;
            }
        }
    }

    Ok(())
}

/// 背景和声写成 ` [bg:...]` 片段附加在行尾。目标是增强型 LRC 且
/// 背景带计时才写出内部的逐字标记，否则只写背景文本。
fn write_background(
    output: &mut String,
    line: &LyricLine,
    with_word_markers: bool,
) -> Result<(), ConvertError> {
    if line.background_words.is_empty() {
        return Ok(());
    }

    output.push_str(" [bg:");
    if with_word_markers && line.has_timed_background() {
        write_marker_run(output, &line.background_words, None, None)?;
    } else {
        output.push_str(&line.background_text());
    }
    output.push(']');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::types::{LyricLine, LyricWord};
    use std::collections::BTreeMap;

    fn word(text: &str, start_ms: Option<u64>, end_ms: Option<u64>) -> LyricWord {
        LyricWord {
            text: text.to_string(),
            start_ms,
            end_ms,
        }
    }

    fn line(start_ms: Option<u64>, end_ms: Option<u64>, words: Vec<LyricWord>) -> LyricLine {
        LyricLine {
            start_ms,
            end_ms,
            words,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_lrc_with_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("ar".to_string(), "歌手".to_string());
        metadata.insert("ti".to_string(), "标题".to_string());
        let document = LyricDocument {
            metadata,
            lines: vec![line(Some(12_000), None, vec![word("第一行", None, None)])],
        };

        assert_eq!(
            generate_lrc(&document).unwrap(),
            "[ti:标题]\n[ar:歌手]\n[00:12.00]第一行\n"
        );
    }

    #[test]
    fn test_multiline_word_text_written_literally() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(
                Some(1000),
                Some(3500),
                vec![word("Hello\nworld", None, None)],
            )],
        };

        assert_eq!(generate_lrc(&document).unwrap(), "[00:01.00]Hello\nworld\n");
    }

    #[test]
    fn test_blank_timed_line() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(Some(10_000), None, Vec::new())],
        };

        assert_eq!(generate_lrc(&document).unwrap(), "[00:10.00]\n");
    }

    #[test]
    fn test_agent_prefix_written() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![LyricLine {
                start_ms: Some(5000),
                end_ms: None,
                agent: Some("v2".to_string()),
                words: vec![word("他的部分", None, None)],
                ..Default::default()
            }],
        };

        assert_eq!(generate_lrc(&document).unwrap(), "[00:05.00]v2:他的部分\n");
    }

    #[test]
    fn test_enhanced_continuous_words() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(
                Some(10_000),
                Some(11_000),
                vec![
                    word("Hello ", Some(10_000), Some(10_500)),
                    word("world", Some(10_500), Some(11_000)),
                ],
            )],
        };

        // 与行起始重合的首个开始标记和与上一结束重合的开始标记都被省略
        assert_eq!(
            generate_enhanced_lrc(&document).unwrap(),
            "[00:10.00]Hello <00:10.50>world<00:11.00>\n"
        );
    }

    #[test]
    fn test_enhanced_gap_between_words() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(
                Some(1000),
                Some(2500),
                vec![
                    word("a", Some(1000), Some(1500)),
                    word("b", Some(2000), Some(2500)),
                ],
            )],
        };

        assert_eq!(
            generate_enhanced_lrc(&document).unwrap(),
            "[00:01.00]a<00:01.50><00:02.00>b<00:02.50>\n",
            "间隙应产生成对的结束/开始标记"
        );
    }

    #[test]
    fn test_enhanced_line_granularity_stays_plain() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(Some(1000), None, vec![word("无逐字时间", None, None)])],
        };

        assert_eq!(generate_enhanced_lrc(&document).unwrap(), "[00:01.00]无逐字时间\n");
    }

    #[test]
    fn test_plain_target_discards_word_markers() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(
                Some(1000),
                Some(2000),
                vec![
                    word("逐", Some(1000), Some(1500)),
                    word("字", Some(1500), Some(2000)),
                ],
            )],
        };

        assert_eq!(generate_lrc(&document).unwrap(), "[00:01.00]逐字\n");
    }

    #[test]
    fn test_background_appended_as_bg_segment() {
        let mut bg_line = line(Some(1000), None, vec![word("主歌词", None, None)]);
        bg_line.background_words = vec![word("背景和声", None, None)];
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![bg_line],
        };

        assert_eq!(
            generate_lrc(&document).unwrap(),
            "[00:01.00]主歌词 [bg:背景和声]\n"
        );
    }

    #[test]
    fn test_enhanced_background_with_markers() {
        let mut bg_line = line(
            Some(1000),
            Some(2000),
            vec![word("Lead", Some(1000), Some(2000))],
        );
        bg_line.background_words = vec![word("ooh", Some(2000), Some(3000))];
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![bg_line],
        };

        assert_eq!(
            generate_enhanced_lrc(&document).unwrap(),
            "[00:01.00]Lead<00:02.00> [bg:<00:02.00>ooh<00:03.00>]\n",
            "背景片段的首个开始标记不应被省略"
        );
    }

    #[test]
    fn test_plain_target_background_text_only() {
        let mut bg_line = line(
            Some(1000),
            Some(2000),
            vec![word("Lead", Some(1000), Some(2000))],
        );
        bg_line.background_words = vec![word("ooh", Some(2000), Some(3000))];
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![bg_line],
        };

        assert_eq!(generate_lrc(&document).unwrap(), "[00:01.00]Lead [bg:ooh]\n");
    }

    #[test]
    fn test_untimed_line_written_as_free_text() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![
                line(Some(1000), None, vec![word("计时行", None, None)]),
                line(None, None, vec![word("自由行", None, None)]),
            ],
        };

        assert_eq!(generate_lrc(&document).unwrap(), "[00:01.00]计时行\n自由行\n");
    }

    #[test]
    fn test_markers_suppressed_after_newline_word() {
        let document = LyricDocument {
            metadata: BTreeMap::new(),
            lines: vec![line(
                Some(1000),
                Some(2500),
                vec![
                    word("Hel\nlo", Some(1000), Some(2000)),
                    word("world", Some(2000), Some(2500)),
                ],
            )],
        };

        // 换行之后的标记会落在下一个物理行上，无法再被解析，因此全部省略
        assert_eq!(
            generate_enhanced_lrc(&document).unwrap(),
            "[00:01.00]Hel\nloworld\n"
        );
    }
}
