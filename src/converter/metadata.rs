//! # 元数据指令辅助
//!
//! LRC 元数据指令（`[ti:...]`、`[ar:...]` 等）的识别、存储与生成。
//! 键以小写形式存入模型，生成时按固定的规范顺序输出，保证输出确定。

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

/// 匹配 LRC 元数据指令行。键必须是纯字母，时间戳行不会被误判。
static METADATA_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<key>[a-zA-Z]+):(?P<value>.*)]$").expect("未能编译 METADATA_TAG_REGEX")
});

/// 生成 LRC 头部时的固定键顺序，未列出的键按字母序跟随其后。
const LRC_TAG_ORDER: [&str; 6] = ["ti", "ar", "al", "by", "language", "offset"];

/// 尝试把一行解析为元数据指令并存入映射，键转为小写，值去除首尾空白。
/// 返回 `true` 表示该行已被当作元数据消费。重复的键后写覆盖先写。
pub(crate) fn parse_and_store_metadata(
    line: &str,
    metadata: &mut BTreeMap<String, String>,
) -> bool {
    METADATA_TAG_REGEX.captures(line).is_some_and(|caps| {
        let key = caps["key"].to_lowercase();
        let value = caps["value"].trim().to_string();
        metadata.insert(key, value);
        true
    })
}

/// 按规范顺序生成 LRC 头部指令行。
///
/// 先输出 `ti, ar, al, by, language, offset` 中存在的键，
/// 其余键按字母序跟随，与插入顺序无关。
pub(crate) fn generate_lrc_header(metadata: &BTreeMap<String, String>) -> String {
    let mut output = String::new();

    for tag in LRC_TAG_ORDER {
        if let Some(value) = metadata.get(tag) {
            let _ = writeln!(output, "[{tag}:{value}]");
        }
    }
    for (key, value) in metadata {
        if !LRC_TAG_ORDER.contains(&key.as_str()) {
            let _ = writeln!(output, "[{key}:{value}]");
        }
    }
    output
}
