//! # QRC 格式解析器
//!
//! 解析 `LyricContent` 中的内层文本：`[行开始,行时长]文本(开始,时长)文本(开始,时长)...`。
//! 括号内的时间是绝对时间。

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    converter::{
        types::{ConvertError, ParsedSourceData},
        utils::{parse_and_store_metadata, to_ms},
    },
    model::lyric::{LyricLine, LyricMarkup, LyricWord},
};

static QRC_LINE_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<start>\d+),(?P<duration>\d+)\]")
        .expect("编译 QRC_LINE_TIMESTAMP_REGEX 失败")
});

static LYRIC_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<text>.+?)\((?P<start>\d+),(?P<duration>\d+)\)")
        .expect("编译 LYRIC_TOKEN_REGEX 失败")
});

static INLINE_RANGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+,\d+\)").expect("编译 INLINE_RANGE_REGEX 失败"));

/// 解析 QRC 格式内容到 `ParsedSourceData` 结构。
///
/// 行文本是去掉所有 `(start,duration)` 之后的内容；逐字信息同时保留在 `words` 中。
pub fn parse_qrc(content: &str) -> Result<ParsedSourceData, ConvertError> {
    let mut lines: Vec<LyricLine> = Vec::new();
    let mut raw_metadata: Vec<(String, String)> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (i, line_str) in content.lines().enumerate() {
        let trimmed_line = line_str.trim();
        if trimmed_line.is_empty() || parse_and_store_metadata(trimmed_line, &mut raw_metadata) {
            continue;
        }

        let Some(line_caps) = QRC_LINE_TIMESTAMP_REGEX.captures(trimmed_line) else {
            warnings.push(format!("第 {} 行: 未能识别的行格式。", i + 1));
            continue;
        };

        let line_start_ms = to_ms(line_caps["start"].parse()?)?;
        let body = &trimmed_line[line_caps[0].len()..];

        let mut words: Vec<LyricWord> = Vec::new();
        for token in LYRIC_TOKEN_REGEX.captures_iter(body) {
            words.push(LyricWord {
                start_ms: to_ms(token["start"].parse()?)?,
                text: token["text"].to_string(),
            });
        }

        lines.push(LyricLine {
            start_ms: line_start_ms,
            text: INLINE_RANGE_REGEX.replace_all(body, "").into_owned(),
            words: (!words.is_empty()).then_some(words),
        });
    }

    Ok(ParsedSourceData {
        lines,
        raw_metadata,
        warnings,
        source_format: LyricMarkup::LineTagged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_ranges_are_stripped() {
        let parsed =
            parse_qrc("[ti:歌]\n[1000,2000]你(1000,300)好(1300,400) world(1700,500)").unwrap();

        assert_eq!(parsed.raw_metadata, vec![("ti".to_string(), "歌".to_string())]);
        let line = &parsed.lines[0];
        assert_eq!(line.start_ms, 1000);
        assert_eq!(line.text, "你好 world");

        let words = line.words.as_ref().unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[2].start_ms, 1700);
        assert_eq!(words[2].text, " world");
    }

    #[test]
    fn test_parentheses_inside_word_text() {
        let parsed = parse_qrc("[1000,2000](Oh(1000,300) baby)(1300,400)").unwrap();
        let line = &parsed.lines[0];
        assert_eq!(line.text, "(Oh baby)");

        let words = line.words.as_ref().unwrap();
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["(Oh", " baby)"]);
        assert_eq!(texts.concat(), line.text, "单词拼接后应等于行文本");
    }

    #[test]
    fn test_line_without_ranges() {
        let parsed = parse_qrc("[500,100]纯文本").unwrap();
        assert_eq!(parsed.lines, vec![LyricLine::line(500, "纯文本")]);
    }
}
