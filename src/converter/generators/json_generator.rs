//! # JSON 格式生成器
//!
//! 规范模型的直接序列化。元数据使用有序映射，因此输出是确定的，
//! 解析后再生成可以得到逐字节相同的结果。

use crate::converter::config::JsonGenerationOptions;
use crate::converter::types::LyricDocument;
use crate::error::ConvertError;

/// 把规范模型序列化为 JSON 文本。默认输出紧凑形式，
/// [`JsonGenerationOptions::pretty`] 开启缩进排版。
///
/// # Errors
///
/// 序列化失败时返回 [`ConvertError::Internal`]。
pub fn generate_json(
    document: &LyricDocument,
    options: &JsonGenerationOptions,
) -> Result<String, ConvertError> {
    let result = if options.pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    };
    result.map_err(|e| ConvertError::Internal(format!("序列化歌词文档失败: {e}")))
}
