use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// TTML 的计时模式，对应 `<tt>` 上的 `itunes:timing` 属性。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TtmlTimingMode {
    /// 逐字计时
    #[default]
    Word,
    /// 逐行计时
    Line,
}

/// TTML 解析选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtmlParsingOptions {
    /// 强制指定计时模式，忽略文件内的 `itunes:timing` 属性和自动检测逻辑。
    #[serde(default)]
    pub force_timing_mode: Option<TtmlTimingMode>,
}

/// TTML 生成选项
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
pub struct TtmlGenerationOptions {
    /// 生成的计时模式。`None` 时按文档的同步粒度推导。
    /// 对逐字文档强制逐行计时会丢弃单词时间戳，转换结果会附带精度损失报告。
    pub timing_mode: Option<TtmlTimingMode>,
    /// 是否输出带缩进的格式化 TTML 文件。
    pub format: bool,
}

/// JSON 生成选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonGenerationOptions {
    /// 是否输出带缩进的 JSON。默认紧凑输出。
    #[serde(default)]
    pub pretty: bool,
}

/// 统一管理所有格式的转换选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// TTML 生成选项
    #[serde(default)]
    pub ttml: TtmlGenerationOptions,
    /// TTML 解析选项
    #[serde(default)]
    pub ttml_parsing: TtmlParsingOptions,
    /// JSON 生成选项
    #[serde(default)]
    pub json: JsonGenerationOptions,
}
