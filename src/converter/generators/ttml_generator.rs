//! # TTML 格式生成器
//!
//! 生成 Apple Music 风格的 TTML 歌词文档。`itunes:timing` 取自生成选项，
//! 未指定时按文档的同步粒度推导；逐字文档写出 `<span>` 序列，
//! 逐行文档把整行文本内联在 `<p>` 里，完全无时间的文档输出 `timing="none"`。
//! 背景和声以 `ttm:role="x-bg"` 的容器 span 跟在主内容之后。

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};

use crate::converter::config::{TtmlGenerationOptions, TtmlTimingMode};
use crate::converter::timestamp::format_ttml_time;
use crate::converter::types::{LyricDocument, LyricLine, TimingGranularity};
use crate::error::ConvertError;

use super::DEFAULT_LAST_LINE_DURATION_MS;

/// 生成 TTML 文档文本。
///
/// # Errors
///
/// - [`ConvertError::Structural`]: 计时模式不是 `none` 时存在没有起始时间的行；
/// - [`ConvertError::FromUtf8`]: 写入缓冲区不是合法 UTF-8（理论上不会发生）。
pub fn generate_ttml(
    document: &LyricDocument,
    options: &TtmlGenerationOptions,
) -> Result<String, ConvertError> {
    let mut buffer = Vec::new();

    let result = if options.format {
        let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 2);
        generate_ttml_inner(&mut writer, document, options)
    } else {
        let mut writer = Writer::new(Cursor::new(&mut buffer));
        generate_ttml_inner(&mut writer, document, options)
    };
    result?;

    String::from_utf8(buffer).map_err(ConvertError::FromUtf8)
}

/// 有效的 `itunes:timing` 属性值：显式选项优先，否则按同步粒度推导。
fn effective_timing_value(
    document: &LyricDocument,
    options: &TtmlGenerationOptions,
) -> &'static str {
    match options.timing_mode {
        Some(TtmlTimingMode::Word) => "word",
        Some(TtmlTimingMode::Line) => "line",
        None => match document.granularity() {
            TimingGranularity::Word => "word",
            TimingGranularity::Line => "line",
            TimingGranularity::Untimed => "none",
        },
    }
}

fn generate_ttml_inner<W: std::io::Write>(
    writer: &mut Writer<W>,
    document: &LyricDocument,
    options: &TtmlGenerationOptions,
) -> Result<(), ConvertError> {
    let timing_value = effective_timing_value(document, options);
    let untimed = timing_value == "none";
    let word_mode = timing_value == "word";

    let mut tt_builder = writer
        .create_element("tt")
        .with_attribute(("xmlns", "http://www.w3.org/ns/ttml"))
        .with_attribute(("xmlns:itunes", "http://music.apple.com/lyric-ttml-internal"))
        .with_attribute(("xmlns:ttm", "http://www.w3.org/ns/ttml#metadata"))
        .with_attribute(("itunes:timing", timing_value));

    if let Some(lang) = document.metadata.get("language").filter(|s| !s.is_empty()) {
        tt_builder = tt_builder.with_attribute(("xml:lang", lang.as_str()));
    }

    tt_builder.write_inner_content(|writer| {
        write_head(writer, document)?;
        write_body(writer, document, untimed, word_mode)?;
        Ok(())
    })?;

    Ok(())
}

/// 写入 `<head>`，包含文档中实际使用的演唱者声明。
/// 没有任何演唱者时整个 `<head>` 省略。
fn write_head<W: std::io::Write>(
    writer: &mut Writer<W>,
    document: &LyricDocument,
) -> Result<(), ConvertError> {
    let agents = collect_agents(document);
    if agents.is_empty() {
        return Ok(());
    }

    writer
        .create_element("head")
        .write_inner_content(|writer| {
            writer
                .create_element("metadata")
                .write_inner_content(|writer| {
                    for agent in &agents {
                        let agent_type = if agent == "v1" || agent == "v2" {
                            "person"
                        } else {
                            "group"
                        };
                        writer
                            .create_element("ttm:agent")
                            .with_attribute(("type", agent_type))
                            .with_attribute(("xml:id", agent.as_str()))
                            .write_empty()?;
                    }
                    Ok(())
                })?;
            Ok(())
        })?;
    Ok(())
}

/// 收集文档中使用的演唱者标识，去重并按数字后缀排序。
fn collect_agents(document: &LyricDocument) -> Vec<String> {
    let mut agents: Vec<String> = document
        .lines
        .iter()
        .filter_map(|line| line.agent.clone())
        .collect();
    agents.sort_by(|a, b| {
        agent_numeric_suffix(a)
            .cmp(&agent_numeric_suffix(b))
            .then_with(|| a.cmp(b))
    });
    agents.dedup();
    agents
}

/// `v3` 形式的标识按数字排序，其余排在末尾。
fn agent_numeric_suffix(agent: &str) -> u64 {
    agent
        .strip_prefix('v')
        .and_then(|rest| rest.parse().ok())
        .unwrap_or(u64::MAX)
}

fn write_body<W: std::io::Write>(
    writer: &mut Writer<W>,
    document: &LyricDocument,
    untimed: bool,
    word_mode: bool,
) -> Result<(), ConvertError> {
    let body_builder = writer.create_element("body");
    if document.lines.is_empty() {
        body_builder.write_empty()?;
        return Ok(());
    }

    body_builder.write_inner_content(|writer| {
        writer.create_element("div").write_inner_content(|writer| {
            for (i, line) in document.lines.iter().enumerate() {
                if untimed {
                    write_untimed_line(writer, line).map_err(std::io::Error::other)?;
                    continue;
                }

                let start_ms = line.start_ms.ok_or_else(|| {
                    std::io::Error::other(ConvertError::Structural(format!(
                        "第 {} 行没有起始时间，无法生成 TTML 时间范围",
                        i + 1
                    )))
                })?;
                let end_ms = line.end_ms.unwrap_or_else(|| {
                    document
                        .lines
                        .get(i + 1)
                        .and_then(|next| next.start_ms)
                        .filter(|&next_start| next_start >= start_ms)
                        .unwrap_or_else(|| start_ms.saturating_add(DEFAULT_LAST_LINE_DURATION_MS))
                });
                write_timed_line(writer, line, start_ms, end_ms, word_mode)
                    .map_err(std::io::Error::other)?;
            }
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

/// `timing="none"` 模式下的段落：没有任何时间属性。
fn write_untimed_line<W: std::io::Write>(
    writer: &mut Writer<W>,
    line: &LyricLine,
) -> Result<(), ConvertError> {
    let mut p_builder = writer.create_element("p");
    if let Some(agent) = &line.agent {
        p_builder = p_builder.with_attribute(("ttm:agent", agent.as_str()));
    }

    let text = line.text();
    if !line.background_words.is_empty() {
        p_builder.write_inner_content(|writer| {
            if !text.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }
            write_background_span(writer, line, 0, false)
        })?;
    } else if text.is_empty() {
        p_builder.write_empty()?;
    } else {
        p_builder.write_text_content(BytesText::new(&text))?;
    }
    Ok(())
}

fn write_timed_line<W: std::io::Write>(
    writer: &mut Writer<W>,
    line: &LyricLine,
    start_ms: u64,
    end_ms: u64,
    word_mode: bool,
) -> Result<(), ConvertError> {
    let begin_attr = format_ttml_time(start_ms);
    let end_attr = format_ttml_time(end_ms);

    let mut p_builder = writer
        .create_element("p")
        .with_attribute(("begin", begin_attr.as_str()))
        .with_attribute(("end", end_attr.as_str()));
    if let Some(agent) = &line.agent {
        p_builder = p_builder.with_attribute(("ttm:agent", agent.as_str()));
    }

    let has_background = !line.background_words.is_empty();

    if word_mode && (line.has_word_timing() || line.has_timed_background()) {
        p_builder.write_inner_content(|writer| {
            if line.has_word_timing() {
                for (i, word) in line.words.iter().enumerate() {
                    if word.text.is_empty() {
                        continue;
                    }
                    if let Some(word_start) = word.start_ms {
                        // 没有显式结束时间的单词延伸到下一个单词或行尾
                        let span_end = word
                            .end_ms
                            .or_else(|| line.words.get(i + 1).and_then(|next| next.start_ms))
                            .unwrap_or(end_ms);
                        let span_begin_attr = format_ttml_time(word_start);
                        let span_end_attr = format_ttml_time(span_end);
                        writer
                            .create_element("span")
                            .with_attribute(("begin", span_begin_attr.as_str()))
                            .with_attribute(("end", span_end_attr.as_str()))
                            .write_text_content(BytesText::new(&word.text))?;
                    } else {
                        writer.write_event(Event::Text(BytesText::new(&word.text)))?;
                    }
                }
            } else {
                let text = line.text();
                if !text.is_empty() {
                    writer.write_event(Event::Text(BytesText::new(&text)))?;
                }
            }
            if has_background {
                write_background_span(writer, line, end_ms, true)?;
            }
            Ok(())
        })?;
    } else if has_background {
        p_builder.write_inner_content(|writer| {
            let text = line.text();
            if !text.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }
            write_background_span(writer, line, end_ms, false)
        })?;
    } else {
        let text = line.text();
        if text.is_empty() {
            p_builder.write_empty()?;
        } else {
            p_builder.write_text_content(BytesText::new(&text))?;
        }
    }
    Ok(())
}

/// 行的背景和声写成 `ttm:role="x-bg"` 的容器 span。容器的时间范围取
/// 背景词轨的首个开始和最后一个结束。逐字模式且背景带计时再嵌套单词
/// span，否则整个背景文本内联在容器里。
fn write_background_span<W: std::io::Write>(
    writer: &mut Writer<W>,
    line: &LyricLine,
    line_end_ms: u64,
    word_mode: bool,
) -> std::io::Result<()> {
    let container_start = line.background_words.iter().find_map(|w| w.start_ms);
    let container_end = line.background_words.iter().rev().find_map(|w| w.end_ms);

    let mut span_builder = writer
        .create_element("span")
        .with_attribute(("ttm:role", "x-bg"));
    let begin_attr = container_start.map(format_ttml_time);
    let end_attr = container_end.map(format_ttml_time);
    if let Some(begin) = &begin_attr {
        span_builder = span_builder.with_attribute(("begin", begin.as_str()));
    }
    if let Some(end) = &end_attr {
        span_builder = span_builder.with_attribute(("end", end.as_str()));
    }

    if word_mode && line.has_timed_background() {
        span_builder.write_inner_content(|writer| {
            for (i, word) in line.background_words.iter().enumerate() {
                if word.text.is_empty() {
                    continue;
                }
                if let Some(word_start) = word.start_ms {
                    let span_end = word
                        .end_ms
                        .or_else(|| {
                            line.background_words
                                .get(i + 1)
                                .and_then(|next| next.start_ms)
                        })
                        .unwrap_or(container_end.unwrap_or(line_end_ms));
                    let span_begin_attr = format_ttml_time(word_start);
                    let span_end_attr = format_ttml_time(span_end);
                    writer
                        .create_element("span")
                        .with_attribute(("begin", span_begin_attr.as_str()))
                        .with_attribute(("end", span_end_attr.as_str()))
                        .write_text_content(BytesText::new(&word.text))?;
                } else {
                    writer.write_event(Event::Text(BytesText::new(&word.text)))?;
                }
            }
            Ok(())
        })?;
    } else {
        let text = line.background_text();
        if text.is_empty() {
            span_builder.write_empty()?;
        } else {
            span_builder.write_text_content(BytesText::new(&text))?;
        }
    }
    Ok(())
}
