use std::{fmt, io};

use quick_xml::{
    Error as QuickXmlErrorMain, encoding::EncodingError,
    events::attributes::AttrError as QuickXmlAttrError,
};
use thiserror::Error;

/// 定义歌词转换和处理过程中可能发生的各种错误。
#[derive(Error, Debug)]
pub enum ConvertError {
    /// 时间戳字符串不符合目标格式的语法。
    #[error("无效的时间戳格式: {0}")]
    MalformedTimestamp(String),
    /// 时间偏移为负值或超出边界允许的范围。
    #[error("时间戳超出允许范围: {0}")]
    InvalidTimestamp(String),
    /// 必需的结构元素缺失或位置错误，整个转换将被中止。
    #[error("结构错误: {0}")]
    Structural(String),
    /// 无法识别或推断的歌词格式标签。
    #[error("未知的歌词格式: {0}")]
    UnknownFormat(String),
    /// XML 生成错误，通常来自 `quick-xml` 库。
    #[error("生成 XML 错误: {0}")]
    Xml(#[from] QuickXmlErrorMain),
    /// XML 属性解析错误，通常来自 `quick-xml` 库。
    #[error("XML 属性错误: {0}")]
    Attribute(#[from] QuickXmlAttrError),
    /// XML 文本编码或解码错误。
    #[error("文本编码或解码错误: {0}")]
    Encoding(#[from] EncodingError),
    /// JSON 解析错误。
    #[error("解析 JSON 内容 {context} 失败: {source}")]
    JsonParse {
        /// 底层 `serde_json` 错误
        #[source]
        source: serde_json::Error,
        /// 有关错误发生位置的上下文信息。
        context: String,
    },
    /// 整数解析错误。
    #[error("解析错误: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    /// 字符串格式化错误。
    #[error("格式错误: {0}")]
    Format(#[from] fmt::Error),
    /// 底层写入器的 IO 错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// 从字节序列转换为 UTF-8 字符串失败。
    #[error("UTF-8 转换错误: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),
    /// 内部逻辑错误或未明确分类的错误。
    #[error("错误: {0}")]
    Internal(String),
}

impl From<ConvertError> for io::Error {
    fn from(err: ConvertError) -> Self {
        Self::other(err)
    }
}

impl ConvertError {
    /// 创建一个带有上下文的 `JsonParse` 错误。
    #[must_use]
    pub fn json_parse(source: serde_json::Error, context: String) -> Self {
        Self::JsonParse { source, context }
    }
}
