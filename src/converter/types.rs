use std::{collections::BTreeMap, fmt};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

/// 枚举：表示支持的歌词格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize, EnumIter)]
#[strum(ascii_case_insensitive)]
#[derive(Default)]
pub enum LyricFormat {
    /// 标准 LRC (`LyRiCs`) 格式，逐行时间戳。
    #[default]
    Lrc,
    /// 增强型 LRC (Enhanced LRC) 格式，支持逐字时间戳。
    EnhancedLrc,
    /// `Timed Text Markup Language` 格式。
    Ttml,
    /// `SubRip` 字幕格式。
    Srt,
    /// 规范化 JSON 格式，模型的直接序列化。
    Json,
}

impl LyricFormat {
    /// 将歌词格式枚举转换为对应的文件扩展名字符串。
    #[must_use]
    pub const fn to_extension_str(self) -> &'static str {
        match self {
            Self::Lrc => "lrc",
            Self::EnhancedLrc => "elrc",
            Self::Ttml => "ttml",
            Self::Srt => "srt",
            Self::Json => "json",
        }
    }

    /// 从字符串（通常是文件扩展名或用户输入）解析歌词格式枚举。
    /// 此方法不区分大小写，并会移除输入字符串中的空格和点。
    #[must_use]
    pub fn from_string(s: &str) -> Option<Self> {
        let normalized_s = s.to_uppercase().replace([' ', '.'], "");
        match normalized_s.as_str() {
            "LRC" => Some(Self::Lrc),
            "ENHANCEDLRC" | "LRCX" | "ELRC" | "ALRC" => Some(Self::EnhancedLrc),
            "TTML" | "XML" => Some(Self::Ttml),
            "SRT" => Some(Self::Srt),
            "JSON" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LyricFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lrc => write!(f, "LRC"),
            Self::EnhancedLrc => write!(f, "Enhanced LRC"),
            Self::Ttml => write!(f, "TTML"),
            Self::Srt => write!(f, "SRT"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// 文档的同步粒度，由模型内容推导得出，不单独存储。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingGranularity {
    /// 至少有一个单词携带自己的时间戳。
    Word,
    /// 行级时间戳，没有独立的单词时间。
    Line,
    /// 完全没有时间信息。
    Untimed,
}

/// 逐字歌词中的一个单词。
///
/// `text` 保存字面内容，单词之间的空格保留在前一个单词的文本尾部，
/// 不使用单独的标志位表示。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct LyricWord {
    /// 单词的文本内容，纯计时标记可以为空。
    #[builder(setter(into))]
    pub text: String,
    /// 单词开始时间，相对于歌曲开始的绝对时间（毫秒）。
    /// 没有逐字时间信息时为 `None`，此时行的时间是权威的。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<u64>,
    /// 单词结束时间（毫秒）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<u64>,
}

impl LyricWord {
    /// 单词是否携带自己的时间戳。
    #[must_use]
    pub const fn has_timing(&self) -> bool {
        self.start_ms.is_some()
    }
}

/// 歌词行结构。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct LyricLine {
    /// 行的开始时间，相对于歌曲开始的绝对时间（毫秒）。
    /// 仅在源格式没有行级时间时为 `None`；同步格式的生成器将其视为结构错误。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<u64>,
    /// 行的结束时间（毫秒）。TTML 和 SRT 携带显式行结束，普通 LRC 没有。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<u64>,
    /// 可选的演唱者标识，例如 "v1"、"v2"。
    #[builder(setter(into, strip_option = false))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// 该行的单词序列。行级同步的源只产生一个覆盖整行的单词；
    /// 空白行（纯计时行）没有单词。
    #[builder(setter(each = "word"))]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<LyricWord>,
    /// 背景和声词轨，依附于主行。LRC 中对应行尾的 `[bg:...]` 片段，
    /// TTML 中对应 `ttm:role="x-bg"` 的 span 或段落。
    #[builder(setter(each = "background_word"))]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background_words: Vec<LyricWord>,
}

impl LyricLine {
    /// 拼接所有单词得到整行文本。空白行返回空字符串。
    #[must_use]
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }

    /// 拼接背景和声词轨得到背景文本。
    #[must_use]
    pub fn background_text(&self) -> String {
        self.background_words
            .iter()
            .map(|w| w.text.as_str())
            .collect()
    }

    /// 该行是否包含携带独立时间戳的单词。
    #[must_use]
    pub fn has_word_timing(&self) -> bool {
        self.words.iter().any(LyricWord::has_timing)
    }

    /// 背景和声词轨是否携带任何时间信息。
    #[must_use]
    pub fn has_timed_background(&self) -> bool {
        self.background_words
            .iter()
            .any(|w| w.start_ms.is_some() || w.end_ms.is_some())
    }
}

/// 规范歌词模型：所有解析器的产物，所有生成器的输入。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricDocument {
    /// 元数据键值对。键以小写形式存储，重复的指令后写覆盖先写。
    /// 使用有序映射保证 JSON 序列化结果确定。
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// 歌词行，顺序与源文件一致，时间戳乱序也不会被重排。
    pub lines: Vec<LyricLine>,
}

impl LyricDocument {
    /// 推导文档的同步粒度。背景和声词轨与主词轨同等参与判断。
    #[must_use]
    pub fn granularity(&self) -> TimingGranularity {
        if self
            .lines
            .iter()
            .any(|l| l.has_word_timing() || l.has_timed_background())
        {
            TimingGranularity::Word
        } else if self.lines.iter().any(|l| l.start_ms.is_some()) {
            TimingGranularity::Line
        } else {
            TimingGranularity::Untimed
        }
    }

    /// 统计携带独立时间戳的单词数量（含背景和声），用于精度损失报告。
    #[must_use]
    pub fn timed_word_count(&self) -> usize {
        self.lines
            .iter()
            .map(|l| {
                l.words
                    .iter()
                    .chain(&l.background_words)
                    .filter(|w| w.has_timing())
                    .count()
            })
            .sum()
    }
}

/// 解析时被跳过的行或块的记录。
///
/// TTML 和 SRT 的解析器容忍单行/单块的时间戳故障：出错的条目被记录在此，
/// 解析继续进行，由调用方决定如何处置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// 源文件中的行号或块号，从 1 开始。
    pub index: usize,
    /// 原始文本内容。
    pub content: String,
    /// 跳过原因的描述。
    pub reason: String,
}

/// 解析器的完整产物：模型、来源格式、跳过记录与警告。
#[derive(Debug, Default, Clone)]
pub struct ParsedLyrics {
    /// 解析得到的规范歌词模型。
    pub document: LyricDocument,
    /// 来源格式。
    pub source_format: LyricFormat,
    /// 被容忍跳过的行或块。
    pub skipped: Vec<SkippedEntry>,
    /// 解析过程中产生的非致命警告。
    pub warnings: Vec<String>,
}

/// 精度损失报告。转换成功但部分同步粒度被丢弃时产生，不是错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionLoss {
    /// 被丢弃的独立单词时间戳数量。
    pub discarded_word_timings: usize,
}

impl fmt::Display for PrecisionLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "目标格式不支持逐字同步，{} 个单词时间戳被丢弃",
            self.discarded_word_timings
        )
    }
}

/// 一次完整转换的结果。
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// 目标格式的文本。
    pub output: String,
    /// 粒度降级时的精度损失报告。
    pub precision_loss: Option<PrecisionLoss>,
    /// 解析阶段被跳过的条目。
    pub skipped: Vec<SkippedEntry>,
    /// 解析阶段的警告。
    pub warnings: Vec<String>,
}
