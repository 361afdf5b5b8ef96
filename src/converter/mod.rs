//! # 歌词转换模块
//!
//! 转换以规范模型 [`types::LyricDocument`] 为中枢：任何输入格式先解析为模型，
//! 再由模型生成任何输出格式，新增一种格式只需要一个解析器和一个生成器。
//!
//! 入口是 [`convert`]。源格式与目标格式相同时输入原样返回，不做解析；
//! 目标格式的同步粒度低于文档时转换照常进行，
//! 结果附带 [`types::PrecisionLoss`] 报告说明丢弃了多少单词时间戳。

pub mod config;
pub mod generators;
mod metadata;
pub mod parsers;
pub mod timestamp;
pub mod types;

use tracing::{debug, warn};

use crate::error::ConvertError;

use config::{ConversionOptions, TtmlTimingMode};
use types::{ConversionOutcome, LyricDocument, LyricFormat, ParsedLyrics, PrecisionLoss};

/// 执行一次完整的歌词转换。
///
/// 源格式与目标格式相同时直接透传，输入不经过解析，
/// 因此即使内容有缺陷也会原样返回。
///
/// # Errors
///
/// 解析失败或目标格式无法表示文档结构（例如给无时间的行生成 SRT）时
/// 返回 [`ConvertError`]。
pub fn convert(
    input: &str,
    input_format: LyricFormat,
    output_format: LyricFormat,
    options: &ConversionOptions,
) -> Result<ConversionOutcome, ConvertError> {
    if input_format == output_format {
        debug!("源格式与目标格式相同 ({input_format})，跳过解析直接透传");
        return Ok(ConversionOutcome {
            output: input.to_string(),
            precision_loss: None,
            skipped: Vec::new(),
            warnings: Vec::new(),
        });
    }

    debug!("开始转换: {input_format} -> {output_format}");
    let parsed = parse(input, input_format, options)?;
    for warning in &parsed.warnings {
        warn!("解析警告: {warning}");
    }
    for entry in &parsed.skipped {
        warn!("条目 {} 被跳过: {}", entry.index, entry.reason);
    }

    let precision_loss = precision_loss_for(&parsed.document, output_format, options);
    if let Some(loss) = &precision_loss {
        warn!("{loss}");
    }

    let output = generate(&parsed.document, output_format, options)?;
    Ok(ConversionOutcome {
        output,
        precision_loss,
        skipped: parsed.skipped,
        warnings: parsed.warnings,
    })
}

/// 把一种格式的文本解析为规范模型。
///
/// 标准 LRC 与增强型 LRC 共用一个解析器：逐字标记出现与否
/// 只影响模型里的单词时间，不影响解析路径。
///
/// # Errors
///
/// 输入不是该格式的合法文档时返回 [`ConvertError`]。
pub fn parse(
    content: &str,
    format: LyricFormat,
    options: &ConversionOptions,
) -> Result<ParsedLyrics, ConvertError> {
    let mut parsed = match format {
        LyricFormat::Lrc | LyricFormat::EnhancedLrc => parsers::parse_lrc(content)?,
        LyricFormat::Ttml => parsers::parse_ttml(content, &options.ttml_parsing)?,
        LyricFormat::Srt => parsers::parse_srt(content)?,
        LyricFormat::Json => parsers::parse_json(content)?,
    };
    parsed.source_format = format;
    Ok(parsed)
}

/// 从规范模型生成目标格式的文本。
///
/// # Errors
///
/// 目标格式无法表示文档结构时返回 [`ConvertError::Structural`]。
pub fn generate(
    document: &LyricDocument,
    format: LyricFormat,
    options: &ConversionOptions,
) -> Result<String, ConvertError> {
    match format {
        LyricFormat::Lrc => generators::generate_lrc(document),
        LyricFormat::EnhancedLrc => generators::generate_enhanced_lrc(document),
        LyricFormat::Ttml => generators::generate_ttml(document, &options.ttml),
        LyricFormat::Srt => generators::generate_srt(document),
        LyricFormat::Json => generators::generate_json(document, &options.json),
    }
}

/// 根据文件名或显式标签确定歌词格式。显式标签优先于扩展名。
///
/// # Errors
///
/// 两个来源都无法确定格式时返回 [`ConvertError::UnknownFormat`]。
pub fn resolve_format(
    explicit: Option<LyricFormat>,
    file_name: Option<&str>,
) -> Result<LyricFormat, ConvertError> {
    if let Some(format) = explicit {
        return Ok(format);
    }

    if let Some(name) = file_name {
        let extension = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str());
        if let Some(ext) = extension {
            if let Some(format) = LyricFormat::from_string(ext) {
                return Ok(format);
            }
            return Err(ConvertError::UnknownFormat(format!(
                "无法识别的文件扩展名: '{ext}'"
            )));
        }
        return Err(ConvertError::UnknownFormat(format!(
            "文件名 '{name}' 没有扩展名"
        )));
    }

    Err(ConvertError::UnknownFormat(
        "没有显式格式标签，也没有可供推断的文件名".to_string(),
    ))
}

/// 目标格式丢弃文档同步粒度时计算精度损失，不丢弃时返回 `None`。
///
/// 只有独立的单词时间戳会被统计：行级时间在所有目标格式中都保留。
fn precision_loss_for(
    document: &LyricDocument,
    output_format: LyricFormat,
    options: &ConversionOptions,
) -> Option<PrecisionLoss> {
    let discarded_word_timings = document.timed_word_count();
    if discarded_word_timings == 0 {
        return None;
    }

    let degrades = match output_format {
        LyricFormat::Lrc | LyricFormat::Srt => true,
        // 强制逐行计时的 TTML 也会丢弃单词时间
        LyricFormat::Ttml => options.ttml.timing_mode == Some(TtmlTimingMode::Line),
        LyricFormat::EnhancedLrc | LyricFormat::Json => false,
    };
    degrades.then_some(PrecisionLoss {
        discarded_word_timings,
    })
}
