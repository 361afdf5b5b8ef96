//! 跨格式转换的集成测试。
//!
//! 单元测试覆盖各解析器和生成器的细节，这里验证完整的转换链：
//! 规范模型经过任何能表达它的格式后保持不变，降级转换产生精度损失报告，
//! 可容忍的故障以跳过条目的形式暴露给调用方。

use lyrics_converter::{
    ConversionOptions, ConvertError, LyricFormat, TimingGranularity, TtmlGenerationOptions,
    TtmlTimingMode, convert, generate, parse,
};

const WORD_TIMED_TTML: &str = include_str!("test_data/word_timed.ttml");
const LINE_TIMED_LRC: &str = include_str!("test_data/line_timed.lrc");
const SUBTITLES_SRT: &str = include_str!("test_data/subtitles.srt");

fn default_options() -> ConversionOptions {
    ConversionOptions::default()
}

#[test]
fn test_ttml_fixture_parses_completely() {
    let parsed = parse(WORD_TIMED_TTML, LyricFormat::Ttml, &default_options()).unwrap();
    let document = &parsed.document;

    assert_eq!(document.lines.len(), 8);
    assert_eq!(document.timed_word_count(), 32);
    assert_eq!(document.granularity(), TimingGranularity::Word);
    assert_eq!(
        document.metadata.get("language").map(String::as_str),
        Some("en")
    );
    assert_eq!(document.lines[0].agent.as_deref(), Some("v1"));
    assert_eq!(document.lines[3].agent.as_deref(), Some("v2"));
    assert_eq!(document.lines[0].text(), "Under neon skies");
    assert!(parsed.skipped.is_empty(), "样本中不应有被跳过的段落");
}

#[test]
fn test_lrc_fixture_parses_with_metadata() {
    let parsed = parse(LINE_TIMED_LRC, LyricFormat::Lrc, &default_options()).unwrap();
    let document = &parsed.document;

    assert_eq!(document.lines.len(), 8);
    assert_eq!(document.granularity(), TimingGranularity::Line);
    assert_eq!(document.metadata.len(), 5);
    assert_eq!(
        document.metadata.get("ti").map(String::as_str),
        Some("Paper Moons")
    );
    assert_eq!(document.lines[0].start_ms, Some(12_410));
}

#[test]
fn test_json_roundtrip_preserves_model() {
    let original = parse(WORD_TIMED_TTML, LyricFormat::Ttml, &default_options())
        .unwrap()
        .document;

    let json = convert(
        WORD_TIMED_TTML,
        LyricFormat::Ttml,
        LyricFormat::Json,
        &default_options(),
    )
    .unwrap()
    .output;
    let reparsed = parse(&json, LyricFormat::Json, &default_options())
        .unwrap()
        .document;

    assert_eq!(original, reparsed, "JSON 往返后模型必须逐字段相等");

    let regenerated = generate(&reparsed, LyricFormat::Json, &default_options()).unwrap();
    assert_eq!(json, regenerated, "规范 JSON 再解析再生成必须逐字节相同");
}

#[test]
fn test_ttml_to_enhanced_lrc_is_lossless() {
    let original = parse(WORD_TIMED_TTML, LyricFormat::Ttml, &default_options())
        .unwrap()
        .document;

    let outcome = convert(
        WORD_TIMED_TTML,
        LyricFormat::Ttml,
        LyricFormat::EnhancedLrc,
        &default_options(),
    )
    .unwrap();
    assert!(
        outcome.precision_loss.is_none(),
        "增强型 LRC 保留逐字时间，不应报告精度损失"
    );

    let reparsed = parse(&outcome.output, LyricFormat::EnhancedLrc, &default_options())
        .unwrap()
        .document;
    assert_eq!(original, reparsed, "逐字时间戳和演唱者都必须在往返后保留");
}

#[test]
fn test_enhanced_lrc_output_shape() {
    let outcome = convert(
        WORD_TIMED_TTML,
        LyricFormat::Ttml,
        LyricFormat::EnhancedLrc,
        &default_options(),
    )
    .unwrap();

    insta::assert_snapshot!(outcome.output.trim_end(), @r"
[language:en]
[00:12.41]v1:Under <00:12.90>neon <00:13.48>skies<00:15.10>
[00:15.43]v1:We <00:15.70>trade <00:16.32>our <00:16.64>midnight <00:17.51>signs<00:18.25>
[00:18.70]v1:Every <00:19.35>borrowed <00:20.21>light<00:21.93>
[00:22.48]v2:Carries <00:23.15>half <00:23.69>a <00:23.86>name<00:26.01>
[00:26.44]v2:Paper <00:27.12>moons <00:28.03>on <00:28.31>the <00:28.55>wire<00:29.88>
[00:30.12]v1:Count <00:30.64>the <00:30.89>static <00:31.72>down<00:33.45>
[00:33.90]v1:And <00:34.18>we <00:34.42>glow<00:37.21>
[00:37.66]v2:Till <00:38.05>the <00:38.29>morning <00:39.40>finds <00:40.18>us<00:41.00>
");
}

#[test]
fn test_word_timed_ttml_to_srt_reports_loss() {
    let outcome = convert(
        WORD_TIMED_TTML,
        LyricFormat::Ttml,
        LyricFormat::Srt,
        &default_options(),
    )
    .unwrap();

    assert_eq!(
        outcome.precision_loss.map(|l| l.discarded_word_timings),
        Some(32),
        "SRT 只保留行级时间，所有单词时间戳都应计入损失"
    );
    assert!(outcome.output.starts_with(
        "1\n00:00:12,410 --> 00:00:15,100\nUnder neon skies\n"
    ));
}

#[test]
fn test_srt_fixture_to_lrc() {
    let outcome = convert(
        SUBTITLES_SRT,
        LyricFormat::Srt,
        LyricFormat::Lrc,
        &default_options(),
    )
    .unwrap();

    insta::assert_snapshot!(outcome.output.trim_end(), @r"
[00:12.41]Under neon skies
[00:15.43]We trade our midnight signs
[00:18.70]Every borrowed light
And every borrowed sound
[00:22.48]Carries half a name
");
}

#[test]
fn test_srt_to_json_to_lrc_matches_direct_conversion() {
    let options = default_options();
    let direct = convert(SUBTITLES_SRT, LyricFormat::Srt, LyricFormat::Lrc, &options)
        .unwrap()
        .output;

    let json = convert(SUBTITLES_SRT, LyricFormat::Srt, LyricFormat::Json, &options)
        .unwrap()
        .output;
    let via_json = convert(&json, LyricFormat::Json, LyricFormat::Lrc, &options)
        .unwrap()
        .output;

    assert_eq!(direct, via_json, "经过 JSON 中转不应改变转换结果");
}

#[test]
fn test_out_of_order_timestamps_keep_document_order() {
    let input = "[00:05.00]five\n[00:01.00]one\n[00:03.00]three\n";
    let parsed = parse(input, LyricFormat::Lrc, &default_options()).unwrap();
    let starts: Vec<Option<u64>> = parsed.document.lines.iter().map(|l| l.start_ms).collect();
    assert_eq!(starts, vec![Some(5000), Some(1000), Some(3000)]);

    // 时间倒退的下一行不能作为结束时间，这两行回落到默认时长
    let outcome = convert(input, LyricFormat::Lrc, LyricFormat::Srt, &default_options()).unwrap();
    assert_eq!(
        outcome.output,
        "1\n00:00:05,000 --> 00:00:15,000\nfive\n\n2\n00:00:01,000 --> 00:00:03,000\none\n\n3\n00:00:03,000 --> 00:00:13,000\nthree\n"
    );
}

#[test]
fn test_repeated_timestamps_expand_to_multiple_lines() {
    let input = "[00:10.00][00:50.00]Chorus line\n";
    let parsed = parse(input, LyricFormat::Lrc, &default_options()).unwrap();

    assert_eq!(parsed.document.lines.len(), 2);
    assert_eq!(parsed.document.lines[0].start_ms, Some(10_000));
    assert_eq!(parsed.document.lines[1].start_ms, Some(50_000));
    assert_eq!(parsed.document.lines[0].text(), "Chorus line");
    assert_eq!(parsed.document.lines[1].text(), "Chorus line");
}

#[test]
fn test_malformed_srt_block_is_skipped_and_reported() {
    let input = "1\n00:00:01,000 --> 00:00:02,000\nfirst\n\nnot a subtitle block\n\n3\n00:00:05,000 --> 00:00:06,000\nthird\n";
    let outcome = convert(input, LyricFormat::Srt, LyricFormat::Lrc, &default_options()).unwrap();
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].index, 2);
    assert_eq!(outcome.output, "[00:01.00]first\n[00:05.00]third\n");
}

#[test]
fn test_ttml_paragraph_without_begin_is_skipped() {
    let input = r#"<tt xmlns="http://www.w3.org/ns/ttml" itunes:timing="line"><body><div><p begin="1.000s" end="2.000s">ok</p><p end="3.000s">broken</p></div></body></tt>"#;
    let outcome = convert(input, LyricFormat::Ttml, LyricFormat::Lrc, &default_options()).unwrap();

    assert_eq!(outcome.output, "[00:01.00]ok\n");
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].index, 2);
    assert!(outcome.skipped[0].reason.contains("begin"));
}

#[test]
fn test_invalid_lrc_seconds_skip_line() {
    let input = "[99:99.99]broken\n[00:01.00]good\n";
    let outcome = convert(input, LyricFormat::Lrc, LyricFormat::Json, &default_options()).unwrap();

    assert_eq!(outcome.skipped.len(), 1);
    assert!(!outcome.warnings.is_empty());
    assert!(outcome.output.contains("good"));
    assert!(!outcome.output.contains("broken"));
}

#[test]
fn test_untimed_ttml_document() {
    let input = r#"<tt xmlns="http://www.w3.org/ns/ttml" itunes:timing="none"><body><div><p>First verse line</p><p>Second verse line</p></div></body></tt>"#;
    let parsed = parse(input, LyricFormat::Ttml, &default_options()).unwrap();
    assert_eq!(parsed.document.granularity(), TimingGranularity::Untimed);

    // 无时间的文档可以生成 LRC（纯文本行），但不能生成 SRT
    let lrc = convert(input, LyricFormat::Ttml, LyricFormat::Lrc, &default_options()).unwrap();
    assert_eq!(lrc.output, "First verse line\nSecond verse line\n");

    let err = convert(input, LyricFormat::Ttml, LyricFormat::Srt, &default_options()).unwrap_err();
    assert!(matches!(err, ConvertError::Structural(_)));
}

#[test]
fn test_same_format_passthrough_is_verbatim() {
    let outcome = convert(
        WORD_TIMED_TTML,
        LyricFormat::Ttml,
        LyricFormat::Ttml,
        &default_options(),
    )
    .unwrap();
    assert_eq!(outcome.output, WORD_TIMED_TTML);
    assert!(outcome.precision_loss.is_none());
    assert!(outcome.skipped.is_empty());
}

#[test]
fn test_agents_roundtrip_through_ttml() {
    let input = "[00:05.00]v1:Lead line\n[00:08.00]v2:Answer line\n";
    let options = default_options();

    let ttml = convert(input, LyricFormat::Lrc, LyricFormat::Ttml, &options)
        .unwrap()
        .output;
    assert!(ttml.contains(r#"<ttm:agent type="person" xml:id="v1"/>"#));
    assert!(ttml.contains(r#"ttm:agent="v2""#));

    let back = convert(&ttml, LyricFormat::Ttml, LyricFormat::Lrc, &options)
        .unwrap()
        .output;
    assert_eq!(back, input, "演唱者前缀必须原样回到 LRC");
}

#[test]
fn test_background_vocals_roundtrip_through_ttml() {
    let input = concat!(
        r#"<tt xmlns="http://www.w3.org/ns/ttml" xmlns:ttm="http://www.w3.org/ns/ttml#metadata" itunes:timing="word">"#,
        r#"<body><div><p begin="1.000s" end="4.000s"><span begin="1.000s" end="2.000s">Lead</span>"#,
        r#"<span ttm:role="x-bg"><span begin="2.000s" end="3.000s"> (ooh)</span></span></p></div></body></tt>"#,
    );

    let parsed = parse(input, LyricFormat::Ttml, &default_options()).unwrap();
    let line = &parsed.document.lines[0];
    assert_eq!(line.text(), "Lead", "背景和声不应混入主词轨");
    assert_eq!(line.background_words.len(), 1);
    assert_eq!(line.background_words[0].text, " (ooh)");
    assert_eq!(line.background_words[0].start_ms, Some(2000));
    assert_eq!(line.background_words[0].end_ms, Some(3000));

    let regenerated = generate(&parsed.document, LyricFormat::Ttml, &default_options()).unwrap();
    assert!(regenerated.contains(
        r#"<span ttm:role="x-bg" begin="2.000s" end="3.000s"><span begin="2.000s" end="3.000s"> (ooh)</span></span>"#
    ));
}

#[test]
fn test_lrc_background_segment_to_ttml() {
    let input = "[00:01.00]main line [bg:background line]\n";
    let outcome = convert(input, LyricFormat::Lrc, LyricFormat::Ttml, &default_options()).unwrap();

    assert!(
        !outcome.output.contains("[bg:"),
        "背景片段不应以字面文本出现在 TTML 里"
    );
    assert!(
        outcome
            .output
            .contains(r#"<span ttm:role="x-bg">background line</span>"#)
    );

    let back = convert(
        &outcome.output,
        LyricFormat::Ttml,
        LyricFormat::Lrc,
        &default_options(),
    )
    .unwrap()
    .output;
    assert_eq!(back, input, "背景片段必须原样回到 LRC");
}

#[test]
fn test_forced_word_timing_on_line_synced_document() {
    let options = ConversionOptions {
        ttml: TtmlGenerationOptions {
            timing_mode: Some(TtmlTimingMode::Word),
            format: false,
        },
        ..Default::default()
    };
    let outcome = convert(LINE_TIMED_LRC, LyricFormat::Lrc, LyricFormat::Ttml, &options).unwrap();

    assert!(outcome.output.contains("itunes:timing=\"word\""));
    assert!(
        !outcome.output.contains("<span"),
        "行级文档没有单词时间，强制逐字模式也只能内联文本"
    );
    assert!(outcome.precision_loss.is_none());
}

#[test]
fn test_formatted_ttml_output() {
    let options = ConversionOptions {
        ttml: TtmlGenerationOptions {
            timing_mode: None,
            format: true,
        },
        ..Default::default()
    };
    let outcome = convert(SUBTITLES_SRT, LyricFormat::Srt, LyricFormat::Ttml, &options).unwrap();

    insta::assert_snapshot!(outcome.output, @r#"
<tt xmlns="http://www.w3.org/ns/ttml" xmlns:itunes="http://music.apple.com/lyric-ttml-internal" xmlns:ttm="http://www.w3.org/ns/ttml#metadata" itunes:timing="line">
  <body>
    <div>
      <p begin="12.410s" end="15.100s">Under neon skies</p>
      <p begin="15.430s" end="18.250s">We trade our midnight signs</p>
      <p begin="18.700s" end="21.930s">Every borrowed light
And every borrowed sound</p>
      <p begin="22.480s" end="26.010s">Carries half a name</p>
    </div>
  </body>
</tt>
"#);
}

#[test]
fn test_metadata_survives_lrc_to_json_to_lrc() {
    let options = default_options();
    let json = convert(LINE_TIMED_LRC, LyricFormat::Lrc, LyricFormat::Json, &options)
        .unwrap()
        .output;
    let back = convert(&json, LyricFormat::Json, LyricFormat::Lrc, &options)
        .unwrap()
        .output;

    assert!(back.starts_with(
        "[ti:Paper Moons]\n[ar:The Cardboard Orchestra]\n[al:Static Season]\n[by:subtitle workshop]\n[offset:0]\n"
    ));
    assert!(back.contains("[00:12.41]Under neon skies\n"));
}
