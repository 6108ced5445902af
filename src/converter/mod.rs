//! 歌词转换器核心模块
//!
//! 把各提供商的时间标记格式（KRC、QRC 内层文本、YRC、LRC、纯文本）
//! 统一为 [`CanonicalLyricDocument`]，再渲染为 `[mm:ss.mmm]` 风格的文本。

pub mod generators;
pub mod parsers;
pub mod types;
pub mod utils;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

pub use generators::lrc_generator::format_lrc_time_ms as format_timestamp;

use crate::{
    converter::{
        parsers::{krc_parser, lrc_parser, qrc_parser, yrc_parser},
        types::{ConvertError, ParsedSourceData},
    },
    model::lyric::{CanonicalLyricDocument, LyricMarkup},
};

static BRACKET_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d+,\d+\]").expect("编译 BRACKET_LINE_REGEX 失败"));

static KRC_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\d+,\d+,\d+>").expect("编译 KRC_WORD_REGEX 失败"));

static YRC_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+,\d+,\d+\)").expect("编译 YRC_WORD_REGEX 失败"));

/// 根据文本内容判断其时间标记格式。
///
/// 以 `[数字,数字]` 开头的行决定是 KRC / YRC / QRC 中的哪一种；
/// 没有这类行时，存在 LRC 时间戳即为 LRC，否则为纯文本。
#[must_use]
pub fn detect_markup(text: &str) -> LyricMarkup {
    let mut has_bracket_line = false;
    let mut has_lrc_line = false;

    for line in text.lines().map(str::trim) {
        if BRACKET_LINE_REGEX.is_match(line) {
            if KRC_WORD_REGEX.is_match(line) {
                return LyricMarkup::WordTagged;
            }
            if YRC_WORD_REGEX.is_match(line) {
                return LyricMarkup::Yrc;
            }
            has_bracket_line = true;
        } else if lrc_parser::is_lrc_line(line) {
            has_lrc_line = true;
        }
    }

    if has_bracket_line {
        LyricMarkup::LineTagged
    } else if has_lrc_line {
        LyricMarkup::Lrc
    } else {
        LyricMarkup::Plain
    }
}

/// 按指定格式解析文本。
pub fn parse_as(text: &str, markup: LyricMarkup) -> Result<ParsedSourceData, ConvertError> {
    let parsed = match markup {
        LyricMarkup::WordTagged => krc_parser::parse_krc(text)?,
        LyricMarkup::LineTagged => qrc_parser::parse_qrc(text)?,
        LyricMarkup::Yrc => yrc_parser::parse_yrc(text)?,
        LyricMarkup::Lrc => lrc_parser::parse_lrc(text)?,
        LyricMarkup::Plain => lrc_parser::parse_plain(text),
    };

    if !parsed.warnings.is_empty() {
        debug!(
            "解析 {markup} 歌词时跳过了 {} 行: {:?}",
            parsed.warnings.len(),
            parsed.warnings
        );
    }
    Ok(parsed)
}

/// 自动识别格式并解析为规范化文档。
pub fn normalize(text: &str) -> Result<CanonicalLyricDocument, ConvertError> {
    let markup = detect_markup(text);
    Ok(parse_as(text, markup)?.into_document())
}

/// 将任意支持格式的歌词文本渲染为统一带 `[mm:ss.mmm]` 标签的文本。
///
/// - KRC / YRC: 每个单词一个时间标签；
/// - QRC 内层文本: 去掉 `(start,duration)`，只保留行时间标签；
/// - 已带标签的 LRC: 原样返回；
/// - 纯文本: 每个非空行加上 `[00:00.000]`。
pub fn normalize_to_lrc(text: &str) -> Result<String, ConvertError> {
    let markup = detect_markup(text);
    if markup == LyricMarkup::Lrc {
        return Ok(text.to_string());
    }

    let document = parse_as(text, markup)?.into_document();
    if document.is_empty() {
        warn!("{markup} 歌词解析后没有任何歌词行");
    }

    Ok(document.to_lrc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lyric::LyricsType;

    #[test]
    fn test_detect_markup() {
        assert_eq!(detect_markup("[1000,500]<200,100,0>hello"), LyricMarkup::WordTagged);
        assert_eq!(detect_markup("[1000,500](1000,100,0)hello"), LyricMarkup::Yrc);
        assert_eq!(detect_markup("[1000,500]hello(1000,100)"), LyricMarkup::LineTagged);
        assert_eq!(detect_markup("[ar:x]\n[00:01.00]hello"), LyricMarkup::Lrc);
        assert_eq!(detect_markup("just words\nmore words"), LyricMarkup::Plain);
    }

    #[test]
    fn test_word_tagged_example() {
        assert_eq!(
            normalize_to_lrc("[1000,500]<200,100,0>hello").unwrap(),
            "[00:01.200]hello\n"
        );
    }

    #[test]
    fn test_line_without_words_is_never_dropped() {
        let krc = "[0,1000]<0,500,0>a<500,500,0>b\n[1000,500]\n[2000,500]<0,500,0>c";
        let lrc = normalize_to_lrc(krc).unwrap();

        assert_eq!(lrc.lines().count(), 3);
        insta::assert_snapshot!(lrc.trim_end(), @r"
        [00:00.000]a[00:00.500]b
        [00:01.000]
        [00:02.000]c
        ");
    }

    #[test]
    fn test_line_tagged_strips_ranges() {
        let qrc = "[ti:歌名]\n[61000,2000]你(61000,300)好(61300,400)";
        let lrc = normalize_to_lrc(qrc).unwrap();
        assert_eq!(lrc, "[ti:歌名]\n[01:01.000]你好\n");

        let document = normalize(qrc).unwrap();
        assert_eq!(document.lyrics_type(), LyricsType::Verbatim);
    }

    #[test]
    fn test_document_rendering_matches_normalize_to_lrc() {
        let samples = [
            "[ti:歌名]\n[61000,2000]你(61000,300)好(61300,400)",
            "[1000,500]<200,100,0>hello",
            "[1000,800](1000,300,0)还(1300,500,0)没",
            "第一行\n第二行",
        ];

        for sample in samples {
            assert_eq!(
                normalize(sample).unwrap().to_lrc(),
                normalize_to_lrc(sample).unwrap(),
                "文档渲染结果应与 normalize_to_lrc 一致: {sample}"
            );
        }
        assert_eq!(
            normalize(samples[0]).unwrap().to_lrc(),
            "[ti:歌名]\n[01:01.000]你好\n"
        );
    }

    #[test]
    fn test_lrc_passes_through_and_plain_is_wrapped() {
        let lrc = "[00:01.00]first\n[00:02.00]second";
        assert_eq!(normalize_to_lrc(lrc).unwrap(), lrc);

        assert_eq!(
            normalize_to_lrc("第一行\n\n第二行").unwrap(),
            "[00:00.000]第一行\n[00:00.000]第二行\n"
        );
        assert_eq!(normalize("第一行").unwrap().lyrics_type(), LyricsType::PlainText);
    }

    #[test]
    fn test_yrc_renders_word_tags() {
        let yrc = "[1000,800](1000,300,0)还(1300,500,0)没";
        assert_eq!(
            normalize_to_lrc(yrc).unwrap(),
            "[00:01.000]还[00:01.300]没\n"
        );
    }
}
