//! # 时间戳编解码器
//!
//! 按各格式的原生写法解析和格式化时间偏移，内部统一使用毫秒 (`u64`)。
//! 解析失败返回 [`ConvertError::MalformedTimestamp`]，显式的负值和
//! 超出毫秒可表示范围的值返回 [`ConvertError::InvalidTimestamp`]；
//! 格式化对任何毫秒值都能成功。

use std::sync::LazyLock;

use regex::Regex;

use crate::converter::types::LyricFormat;
use crate::error::ConvertError;

/// LRC 时间戳：`MM:SS.ff` 或 `MM:SS.fff`，分钟至少两位且不设上限，
/// 小数分隔符也接受 `:`。
static LRC_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2})[.:](\d{2,3})$").expect("未能编译 LRC_TIME_REGEX")
});

/// SRT 时间戳：`HH:MM:SS,mmm`，小时部分可省略。
static SRT_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d{2,}):)?(\d{2}):(\d{2}),(\d{3})$").expect("未能编译 SRT_TIME_REGEX")
});

/// 按格式标签解析时间戳字符串为毫秒。
///
/// # Errors
///
/// 字符串不符合该格式的时间语法时返回错误；JSON 格式的时间以毫秒数值
/// 表示，没有文本时间戳语法，对其调用返回 [`ConvertError::Internal`]。
pub fn parse_timestamp(raw: &str, format: LyricFormat) -> Result<u64, ConvertError> {
    match format {
        LyricFormat::Lrc | LyricFormat::EnhancedLrc => parse_lrc_time(raw),
        LyricFormat::Ttml => parse_ttml_time(raw),
        LyricFormat::Srt => parse_srt_time(raw),
        LyricFormat::Json => Err(ConvertError::Internal(
            "JSON 格式的时间以毫秒数值表示，不使用文本时间戳".to_string(),
        )),
    }
}

/// 按格式标签把毫秒格式化为该格式的规范写法。
///
/// # Errors
///
/// 仅对 JSON 格式标签返回 [`ConvertError::Internal`]，见 [`parse_timestamp`]。
pub fn format_timestamp(ms: u64, format: LyricFormat) -> Result<String, ConvertError> {
    match format {
        LyricFormat::Lrc | LyricFormat::EnhancedLrc => Ok(format_lrc_time(ms)),
        LyricFormat::Ttml => Ok(format_ttml_time(ms)),
        LyricFormat::Srt => Ok(format_srt_time(ms)),
        LyricFormat::Json => Err(ConvertError::Internal(
            "JSON 格式的时间以毫秒数值表示，不使用文本时间戳".to_string(),
        )),
    }
}

/// 解析 LRC 时间戳（`MM:SS.ff` / `MM:SS.fff`）为毫秒。
///
/// 两位小数按厘秒处理，三位按毫秒处理；秒必须小于 60，分钟不设上限。
///
/// # Errors
///
/// 不符合语法或秒数越界时返回 [`ConvertError::MalformedTimestamp`]，
/// 总毫秒数超出 `u64` 时返回 [`ConvertError::InvalidTimestamp`]。
pub fn parse_lrc_time(raw: &str) -> Result<u64, ConvertError> {
    let caps = LRC_TIME_REGEX.captures(raw).ok_or_else(|| {
        ConvertError::MalformedTimestamp(format!("'{raw}' 不符合 LRC 时间语法 MM:SS.xx"))
    })?;

    let minutes: u64 = caps[1].parse()?;
    let seconds: u64 = caps[2].parse()?;
    if seconds >= 60 {
        return Err(ConvertError::MalformedTimestamp(format!(
            "秒值 '{seconds}' (应 < 60) 在时间戳 '{raw}' 中无效"
        )));
    }

    let fraction_str = &caps[3];
    let fraction: u64 = fraction_str.parse()?;
    let milliseconds = if fraction_str.len() == 2 {
        fraction * 10
    } else {
        fraction
    };

    let total_seconds = checked_scale_add(minutes, 60, seconds, raw)?;
    checked_scale_add(total_seconds, 1000, milliseconds, raw)
}

/// 把毫秒格式化为 LRC 规范写法 `MM:SS.cc`（厘秒，向下截断）。
#[must_use]
pub fn format_lrc_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}

/// 解析 SRT 时间戳（`HH:MM:SS,mmm`，小时可省略）为毫秒。
///
/// # Errors
///
/// 不符合语法或分钟/秒数越界时返回 [`ConvertError::MalformedTimestamp`]，
/// 总毫秒数超出 `u64` 时返回 [`ConvertError::InvalidTimestamp`]。
pub fn parse_srt_time(raw: &str) -> Result<u64, ConvertError> {
    let caps = SRT_TIME_REGEX.captures(raw).ok_or_else(|| {
        ConvertError::MalformedTimestamp(format!("'{raw}' 不符合 SRT 时间语法 HH:MM:SS,mmm"))
    })?;

    let hours: u64 = caps.get(1).map_or(Ok(0), |m| m.as_str().parse())?;
    let minutes: u64 = caps[2].parse()?;
    let seconds: u64 = caps[3].parse()?;
    let milliseconds: u64 = caps[4].parse()?;

    if minutes >= 60 {
        return Err(ConvertError::MalformedTimestamp(format!(
            "分钟值 '{minutes}' (应 < 60) 在时间戳 '{raw}' 中无效"
        )));
    }
    if seconds >= 60 {
        return Err(ConvertError::MalformedTimestamp(format!(
            "秒值 '{seconds}' (应 < 60) 在时间戳 '{raw}' 中无效"
        )));
    }

    let total_minutes = checked_scale_add(hours, 60, minutes, raw)?;
    let total_seconds = checked_scale_add(total_minutes, 60, seconds, raw)?;
    checked_scale_add(total_seconds, 1000, milliseconds, raw)
}

/// 把毫秒格式化为 SRT 规范写法 `HH:MM:SS,mmm`。
#[must_use]
pub fn format_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// 解析 TTML 时间字符串为毫秒。
///
/// 同时接受偏移写法（`12.345s`、`15s`、裸 `7.5`）和钟面写法
/// （`HH:MM:SS.mmm`、`MM:SS.mmm`、`SS.mmm`），小数部分 1 到 3 位。
///
/// # Errors
///
/// 显式负值和超出 `u64` 毫秒范围的值返回 [`ConvertError::InvalidTimestamp`]，
/// 其余语法问题返回 [`ConvertError::MalformedTimestamp`]。
pub fn parse_ttml_time(raw: &str) -> Result<u64, ConvertError> {
    if let Some(stripped) = raw.strip_suffix('s') {
        if stripped.is_empty() || stripped.starts_with('.') || stripped.ends_with('.') {
            return Err(ConvertError::MalformedTimestamp(format!(
                "时间戳 '{raw}' 包含无效的秒格式"
            )));
        }
        if stripped.starts_with('-') {
            return Err(ConvertError::InvalidTimestamp(format!(
                "时间戳不能为负: '{raw}'"
            )));
        }
        let (seconds, milliseconds) = split_seconds_part(stripped, raw)?;
        return checked_scale_add(seconds, 1000, milliseconds, raw);
    }

    if raw.starts_with('-') {
        return Err(ConvertError::InvalidTimestamp(format!(
            "时间戳不能为负: '{raw}'"
        )));
    }

    let fields: Vec<&str> = raw.split(':').collect();
    if raw.is_empty() || fields.len() > 3 {
        return Err(ConvertError::MalformedTimestamp(format!(
            "时间格式 '{raw}' 无效"
        )));
    }

    // 最后一个字段是 SS 或 SS.mmm，其余依次是分钟和小时
    let (seconds, milliseconds) = split_seconds_part(fields[fields.len() - 1], raw)?;
    let mut total_ms = checked_scale_add(seconds, 1000, milliseconds, raw)?;

    if fields.len() >= 2 {
        if seconds >= 60 {
            return Err(ConvertError::MalformedTimestamp(format!(
                "秒值 '{seconds}' (应 < 60) 在时间戳 '{raw}' 中无效"
            )));
        }
        let minutes_str = fields[fields.len() - 2];
        let minutes: u64 = minutes_str.parse().map_err(|e| {
            ConvertError::MalformedTimestamp(format!(
                "在 '{raw}' 中解析分钟 '{minutes_str}' 失败: {e}"
            ))
        })?;
        if minutes >= 60 {
            return Err(ConvertError::MalformedTimestamp(format!(
                "分钟值 '{minutes}' (应 < 60) 在时间戳 '{raw}' 中无效"
            )));
        }
        total_ms = checked_scale_add(minutes, 60_000, total_ms, raw)?;
    }

    if fields.len() == 3 {
        let hours_str = fields[0];
        let hours: u64 = hours_str.parse().map_err(|e| {
            ConvertError::MalformedTimestamp(format!(
                "在 '{raw}' 中解析小时 '{hours_str}' 失败: {e}"
            ))
        })?;
        total_ms = checked_scale_add(hours, 3_600_000, total_ms, raw)?;
    }

    Ok(total_ms)
}

/// 把毫秒格式化为 TTML 的规范写法：带单位后缀的十进制秒，如 `3.500s`。
#[must_use]
pub fn format_ttml_time(ms: u64) -> String {
    let seconds = ms / 1000;
    let millis = ms % 1000;
    format!("{seconds}.{millis:03}s")
}

/// 组合 `a * b + c`，溢出时报告超出可表示范围的时间戳。
fn checked_scale_add(a: u64, b: u64, c: u64, raw: &str) -> Result<u64, ConvertError> {
    a.checked_mul(b)
        .and_then(|scaled| scaled.checked_add(c))
        .ok_or_else(|| ConvertError::InvalidTimestamp(format!("时间戳 '{raw}' 超出可表示范围")))
}

/// 拆出 `SS` 或 `SS.mmm` 字段的秒和毫秒。
fn split_seconds_part(part: &str, raw: &str) -> Result<(u64, u64), ConvertError> {
    let (seconds_str, fraction_str) = match part.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (part, None),
    };

    if seconds_str.is_empty() {
        return Err(ConvertError::MalformedTimestamp(format!(
            "时间格式 '{raw}' 的秒部分为空"
        )));
    }
    let seconds = seconds_str.parse::<u64>().map_err(|e| {
        ConvertError::MalformedTimestamp(format!("在时间戳 '{raw}' 中解析秒 '{seconds_str}' 失败: {e}"))
    })?;

    let milliseconds = match fraction_str {
        None => 0,
        Some(f) => {
            if f.is_empty() || f.len() > 3 || f.bytes().any(|b| !b.is_ascii_digit()) {
                return Err(ConvertError::MalformedTimestamp(format!(
                    "毫秒部分 '{f}' 在时间戳 '{raw}' 中无效 (只支持最多3位数字)"
                )));
            }
            let val: u64 = f.parse().map_err(|e| {
                ConvertError::MalformedTimestamp(format!(
                    "无法解析时间戳 '{raw}' 中的毫秒部分 '{f}': {e}"
                ))
            })?;
            val * 10u64.pow(3 - u32::try_from(f.len()).unwrap_or(3))
        }
    };

    Ok((seconds, milliseconds))
}
