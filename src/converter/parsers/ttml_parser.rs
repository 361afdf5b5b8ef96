//! # TTML 格式解析器
//!
//! 面向 Apple Music 风格的 TTML 歌词文档：`<tt>` 根元素上的 `itunes:timing`
//! 决定计时模式，`<p>` 是歌词行，逐字模式下 `<span>` 是单词。
//! `ttm:role="x-bg"` 标记背景和声：容器 span 的内容进入所在行的背景词轨，
//! 整段背景则附加到前一个主行。
//!
//! 行级失败（缺失或无效的 `begin`、倒退的时间范围）只跳过该段落并记录原因；
//! 不合法的 XML 则中止整个解析。

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::error;

use crate::converter::config::{TtmlParsingOptions, TtmlTimingMode};
use crate::converter::timestamp::parse_ttml_time;
use crate::converter::types::{
    LyricDocument, LyricFormat, LyricLine, LyricWord, ParsedLyrics, SkippedEntry,
};
use crate::error::ConvertError;

const TAG_TT: &[u8] = b"tt";
const TAG_P: &[u8] = b"p";
const TAG_SPAN: &[u8] = b"span";
const TAG_BR: &[u8] = b"br";

const ATTR_ITUNES_TIMING: &[u8] = b"itunes:timing";
const ATTR_XML_LANG: &[u8] = b"xml:lang";
const ATTR_BEGIN: &[u8] = b"begin";
const ATTR_END: &[u8] = b"end";
const ATTR_AGENT: &[u8] = b"ttm:agent";
const ATTR_AGENT_ALIAS: &[u8] = b"agent";
const ATTR_ROLE: &[u8] = b"ttm:role";
const ATTR_ROLE_ALIAS: &[u8] = b"role";

const ROLE_BACKGROUND: &str = "x-bg";

/// 文档级计时模式，来自 `itunes:timing` 属性或内容推断。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TimingMode {
    #[default]
    Word,
    Line,
    /// `itunes:timing="none"`：段落完全不携带时间信息。
    Untimed,
}

/// 正在累积的 `<p>` 元素数据。
#[derive(Debug, Default)]
struct CurrentParagraph {
    /// 文档内 1 起始的段落序数，用于跳过条目定位
    index: usize,
    start_ms: Option<u64>,
    end_ms: Option<u64>,
    agent: Option<String>,
    words: Vec<LyricWord>,
    background_words: Vec<LyricWord>,
    /// 直接位于 `<p>` 下、尚未归属到任何单词的文本
    pending_text: String,
    /// `ttm:role="x-bg"` 的段落：内容附加到前一个主行的背景词轨
    is_background: bool,
    /// 一旦设置，该段落在结束时被记录为跳过条目而不是歌词行
    skip_reason: Option<String>,
}

/// 正在累积的 `<span>` 元素数据（仅逐字模式使用）。
#[derive(Debug)]
struct CurrentSpan {
    start_ms: Option<u64>,
    end_ms: Option<u64>,
    text: String,
    /// `ttm:role="x-bg"` 的容器 span：子 span 产出背景单词
    background_container: bool,
}

#[derive(Debug, Default)]
struct TtmlParserState {
    saw_tt: bool,
    mode: TimingMode,
    paragraph: Option<CurrentParagraph>,
    span_stack: Vec<CurrentSpan>,
    /// 未入栈的 `<span>` 嵌套深度，保证 `</span>` 与入栈一一配对
    suppressed_span_depth: usize,
    p_count: usize,
}

/// 解析 TTML 格式内容到 [`ParsedLyrics`]。
///
/// # Errors
///
/// - [`ConvertError::Xml`]: 输入不是合法的 XML；
/// - [`ConvertError::Structural`]: 文档中没有 `<tt>` 根元素。
pub fn parse_ttml(
    content: &str,
    options: &TtmlParsingOptions,
) -> Result<ParsedLyrics, ConvertError> {
    // 预扫描以辅助在 itunes:timing 缺失时推断计时模式
    let has_timed_span_tags = content.contains("<span") && content.contains("begin=");

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut document = LyricDocument {
        lines: Vec::with_capacity(content.matches("<p").count()),
        ..Default::default()
    };
    let mut skipped: Vec<SkippedEntry> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut state = TtmlParserState::default();
    let mut buf = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                error!("TTML 解析错误，位置 {}: {}", reader.error_position(), e);
                return Err(ConvertError::Xml(e));
            }
        };

        match event {
            Event::Eof => break,
            Event::Start(e) => handle_start(
                &e,
                &mut state,
                &reader,
                &mut document,
                &mut warnings,
                has_timed_span_tags,
                options,
            )?,
            Event::End(e) => match e.local_name().as_ref() {
                TAG_SPAN => {
                    if state.suppressed_span_depth > 0 {
                        state.suppressed_span_depth -= 1;
                    } else {
                        finish_span(&mut state);
                    }
                }
                TAG_P => finish_paragraph(&mut state, &mut document, &mut skipped),
                _ => {}
            },
            Event::Text(e) => {
                let text = reader.decoder().decode(e.as_ref())?;
                handle_text(&text, &mut state);
            }
            Event::GeneralRef(e) => {
                let entity_name = std::str::from_utf8(e.as_ref()).map_err(|err| {
                    ConvertError::Internal(format!("无法将实体名解码为 UTF-8: {err}"))
                })?;
                if let Some(c) = decode_entity(entity_name, &mut warnings) {
                    push_char(c, &mut state);
                }
            }
            _ => {}
        }

        buf.clear();
    }

    if !state.saw_tt {
        return Err(ConvertError::Structural(
            "未找到 <tt> 根元素，内容不是 TTML 文档".to_string(),
        ));
    }

    Ok(ParsedLyrics {
        document,
        source_format: LyricFormat::Ttml,
        skipped,
        warnings,
    })
}

fn handle_start(
    e: &BytesStart<'_>,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    document: &mut LyricDocument,
    warnings: &mut Vec<String>,
    has_timed_span_tags: bool,
    options: &TtmlParsingOptions,
) -> Result<(), ConvertError> {
    match e.local_name().as_ref() {
        TAG_TT => process_tt_start(
            e,
            state,
            reader,
            document,
            warnings,
            has_timed_span_tags,
            options,
        ),
        TAG_P if state.paragraph.is_none() => process_p_start(e, state, reader, warnings),
        TAG_SPAN => {
            if state.paragraph.is_some() {
                let role = get_string_attribute(e, reader, &[ATTR_ROLE, ATTR_ROLE_ALIAS])?;
                let background_container = role.as_deref() == Some(ROLE_BACKGROUND);
                // 背景容器在任何计时模式下都入栈，普通 span 仅逐字模式入栈
                if state.mode == TimingMode::Word || background_container {
                    let start_ms = get_time_attribute(e, reader, &[ATTR_BEGIN], warnings)?;
                    let end_ms = get_time_attribute(e, reader, &[ATTR_END], warnings)?;
                    state.span_stack.push(CurrentSpan {
                        start_ms,
                        end_ms,
                        text: String::new(),
                        background_container,
                    });
                    return Ok(());
                }
            }
            state.suppressed_span_depth += 1;
            Ok(())
        }
        TAG_BR => {
            push_char('\n', state);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// 处理 `<tt>` 根元素：确定计时模式，收集 `xml:lang`。
fn process_tt_start(
    e: &BytesStart<'_>,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    document: &mut LyricDocument,
    warnings: &mut Vec<String>,
    has_timed_span_tags: bool,
    options: &TtmlParsingOptions,
) -> Result<(), ConvertError> {
    state.saw_tt = true;

    if let Some(forced) = options.force_timing_mode {
        state.mode = match forced {
            TtmlTimingMode::Word => TimingMode::Word,
            TtmlTimingMode::Line => TimingMode::Line,
        };
    } else {
        let timing_attr = get_string_attribute(e, reader, &[ATTR_ITUNES_TIMING])?;
        state.mode = match timing_attr {
            // 一些工具输出首字母大写的 "Word"/"Line"/"None"，一并接受
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "word" => TimingMode::Word,
                "line" => TimingMode::Line,
                "none" => TimingMode::Untimed,
                _ => {
                    warnings.push(format!(
                        "未知的 itunes:timing 值 '{value}'，根据内容推断计时模式。"
                    ));
                    infer_timing_mode(has_timed_span_tags)
                }
            },
            None => {
                if !has_timed_span_tags {
                    warnings.push(
                        "未指定 itunes:timing 且没有带时间戳的 <span>，按逐行模式解析。"
                            .to_string(),
                    );
                }
                infer_timing_mode(has_timed_span_tags)
            }
        };
    }

    if let Some(lang) = get_string_attribute(e, reader, &[ATTR_XML_LANG])? {
        if !lang.is_empty() {
            document.metadata.insert("language".to_string(), lang);
        }
    }

    Ok(())
}

const fn infer_timing_mode(has_timed_span_tags: bool) -> TimingMode {
    if has_timed_span_tags {
        TimingMode::Word
    } else {
        TimingMode::Line
    }
}

/// 处理 `<p>` 开始事件：读取时间范围和演唱者。
fn process_p_start(
    e: &BytesStart<'_>,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    warnings: &mut Vec<String>,
) -> Result<(), ConvertError> {
    state.p_count += 1;
    let mut paragraph = CurrentParagraph {
        index: state.p_count,
        ..Default::default()
    };
    paragraph.agent = get_string_attribute(e, reader, &[ATTR_AGENT, ATTR_AGENT_ALIAS])?;
    paragraph.is_background =
        get_string_attribute(e, reader, &[ATTR_ROLE, ATTR_ROLE_ALIAS])?.as_deref()
            == Some(ROLE_BACKGROUND);

    // none 模式下段落不携带时间，begin 缺失是正常的
    if state.mode != TimingMode::Untimed {
        match get_string_attribute(e, reader, &[ATTR_BEGIN])? {
            Some(begin_str) => match parse_ttml_time(&begin_str) {
                Ok(ms) => paragraph.start_ms = Some(ms),
                Err(err) => paragraph.skip_reason = Some(format!("begin 属性无效: {err}")),
            },
            None => paragraph.skip_reason = Some("缺少 begin 属性".to_string()),
        }
        paragraph.end_ms = get_time_attribute(e, reader, &[ATTR_END], warnings)?;

        if paragraph.skip_reason.is_none() {
            if let (Some(start), Some(end)) = (paragraph.start_ms, paragraph.end_ms) {
                if end < start {
                    paragraph.skip_reason =
                        Some(format!("结束时间 {end} 早于开始时间 {start}"));
                }
            }
        }
    }

    state.paragraph = Some(paragraph);
    Ok(())
}

/// 处理 `</span>`：最外层 span 产出一个单词，嵌套 span 的文本并入外层，
/// 背景容器内的 span 产出背景单词。
fn finish_span(state: &mut TtmlParserState) {
    let Some(span) = state.span_stack.pop() else {
        return;
    };

    if span.background_container {
        finish_background_container(span, state);
        return;
    }

    match state.span_stack.last_mut() {
        Some(outer) if outer.background_container => {
            if let Some(paragraph) = state.paragraph.as_mut() {
                if !span.text.is_empty() {
                    // 背景单词不继承段落时间，容器的时间范围在生成侧处理
                    paragraph.background_words.push(LyricWord {
                        text: span.text,
                        start_ms: span.start_ms,
                        end_ms: span.end_ms,
                    });
                }
            }
        }
        Some(outer) => outer.text.push_str(&span.text),
        None => {
            if let Some(paragraph) = state.paragraph.as_mut() {
                if !span.text.is_empty() {
                    paragraph.words.push(LyricWord {
                        text: span.text,
                        // 未计时的 span 继承段落的时间
                        start_ms: span.start_ms.or(paragraph.start_ms),
                        end_ms: span.end_ms.or(paragraph.end_ms),
                    });
                }
            }
        }
    }
}

/// 背景容器 span 闭合。没有产出任何子 span 单词时，容器自身的文本
/// 连同容器的时间范围成为一个背景单词；否则剩余文本是第一个子 span
/// 之前的前导内容，保留为未计时的背景单词。
fn finish_background_container(container: CurrentSpan, state: &mut TtmlParserState) {
    let Some(paragraph) = state.paragraph.as_mut() else {
        return;
    };
    if container.text.trim().is_empty() {
        return;
    }

    if paragraph.background_words.is_empty() {
        paragraph.background_words.push(LyricWord {
            text: container.text,
            start_ms: container.start_ms,
            end_ms: container.end_ms,
        });
    } else {
        paragraph.background_words.insert(
            0,
            LyricWord {
                text: container.text,
                start_ms: None,
                end_ms: None,
            },
        );
    }
}

/// 处理 `</p>`：把累积的段落转换为歌词行或跳过条目。
fn finish_paragraph(
    state: &mut TtmlParserState,
    document: &mut LyricDocument,
    skipped: &mut Vec<SkippedEntry>,
) {
    let Some(mut paragraph) = state.paragraph.take() else {
        return;
    };
    state.span_stack.clear();
    state.suppressed_span_depth = 0;

    if let Some(reason) = paragraph.skip_reason.take() {
        let mut content: String = paragraph
            .words
            .iter()
            .map(|w| w.text.as_str())
            .collect();
        content.push_str(&paragraph.pending_text);
        skipped.push(SkippedEntry {
            index: paragraph.index,
            content,
            reason,
        });
        return;
    }

    // 第一个 span 之前的前导文本没有可附加的单词，保留为未计时的前导单词
    if !paragraph.words.is_empty() && !paragraph.pending_text.trim().is_empty() {
        paragraph.words.insert(
            0,
            LyricWord {
                text: std::mem::take(&mut paragraph.pending_text),
                start_ms: None,
                end_ms: None,
            },
        );
    }

    if paragraph.words.is_empty() {
        let text = paragraph.pending_text.trim();
        if !text.is_empty() {
            let word = if state.mode == TimingMode::Word {
                // 不含 span 的纯文本段落视为覆盖整个段落时长的单词
                LyricWord {
                    text: text.to_string(),
                    start_ms: paragraph.start_ms,
                    end_ms: paragraph.end_ms,
                }
            } else {
                LyricWord {
                    text: text.to_string(),
                    start_ms: None,
                    end_ms: None,
                }
            };
            paragraph.words.push(word);
        }
    }

    if paragraph.is_background {
        // 背景段落不产生独立的行，内容并入前一个主行的背景词轨
        if let Some(previous) = document.lines.last_mut() {
            previous.background_words.append(&mut paragraph.words);
            previous.background_words.append(&mut paragraph.background_words);
        } else {
            skipped.push(SkippedEntry {
                index: paragraph.index,
                content: paragraph.words.iter().map(|w| w.text.as_str()).collect(),
                reason: "背景和声段落之前没有可附加的主行".to_string(),
            });
        }
        return;
    }

    document.lines.push(LyricLine {
        start_ms: paragraph.start_ms,
        end_ms: paragraph.end_ms,
        agent: paragraph.agent,
        words: paragraph.words,
        background_words: paragraph.background_words,
    });
}

/// 文本节点按当前上下文归属：span 内容、上一个单词的后缀或段落文本。
fn handle_text(text: &str, state: &mut TtmlParserState) {
    if let Some(span) = state.span_stack.last_mut() {
        if span.background_container {
            // 容器内子 span 之间的排版空白不是内容
            if text.contains('\n') && text.chars().all(char::is_whitespace) {
                return;
            }
            if let Some(paragraph) = state.paragraph.as_mut() {
                if let Some(last_word) = paragraph.background_words.last_mut() {
                    last_word.text.push_str(text);
                    return;
                }
            }
        }
        span.text.push_str(text);
        return;
    }
    if let Some(paragraph) = state.paragraph.as_mut() {
        // 带换行的纯空白节点是排版缩进，不是内容
        if text.contains('\n') && text.chars().all(char::is_whitespace) {
            return;
        }
        if let Some(last_word) = paragraph.words.last_mut() {
            last_word.text.push_str(text);
        } else {
            paragraph.pending_text.push_str(text);
        }
    }
}

fn push_char(c: char, state: &mut TtmlParserState) {
    if let Some(span) = state.span_stack.last_mut() {
        span.text.push(c);
    } else if let Some(paragraph) = state.paragraph.as_mut() {
        if let Some(last_word) = paragraph.words.last_mut() {
            last_word.text.push(c);
        } else {
            paragraph.pending_text.push(c);
        }
    }
}

/// 解码一个 XML 实体引用，无法识别时返回 `None` 并记录警告。
fn decode_entity(entity_name: &str, warnings: &mut Vec<String>) -> Option<char> {
    if let Some(num_str) = entity_name.strip_prefix('#') {
        let (radix, code_point_str) = num_str
            .strip_prefix('x')
            .map_or((10, num_str), |stripped| (16, stripped));
        let decoded = u32::from_str_radix(code_point_str, radix)
            .ok()
            .and_then(char::from_u32);
        if decoded.is_none() {
            warnings.push(format!("无法解析 XML 数字实体 '&{entity_name};'"));
        }
        return decoded;
    }

    match entity_name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            warnings.push(format!("忽略了未知的 XML 实体 '&{entity_name};'"));
            None
        }
    }
}

/// 从属性名列表中取第一个命中的属性并解码为字符串。
fn get_string_attribute(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    attr_names: &[&[u8]],
) -> Result<Option<String>, ConvertError> {
    for &name in attr_names {
        if let Some(attr) = e.try_get_attribute(name)? {
            let decoded = attr.decode_and_unescape_value(reader.decoder())?;
            return Ok(Some(decoded.into_owned()));
        }
    }
    Ok(None)
}

/// 取时间戳属性并解析为毫秒；无法解析的值降级为警告。
fn get_time_attribute(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    attr_names: &[&[u8]],
    warnings: &mut Vec<String>,
) -> Result<Option<u64>, ConvertError> {
    (get_string_attribute(e, reader, attr_names)?).map_or(Ok(None), |value_str| {
        match parse_ttml_time(&value_str) {
            Ok(ms) => Ok(Some(ms)),
            Err(err) => {
                warnings.push(format!("时间戳 '{value_str}' 解析失败 ({err})，该时间戳被忽略。"));
                Ok(None)
            }
        }
    })
}
