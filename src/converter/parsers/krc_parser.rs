//! # KRC 格式解析器
//!
//! 行格式为 `[行开始,行时长]<偏移,时长,0>文本<偏移,时长,0>文本...`，
//! 单词的绝对开始时间等于行开始时间加上偏移。

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    converter::{
        types::{ConvertError, ParsedSourceData},
        utils::{parse_and_store_metadata, to_ms},
    },
    model::lyric::{LyricLine, LyricMarkup, LyricWord},
};

/// 匹配 KRC 行级时间戳 `[start,duration]`
static KRC_LINE_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<start>\d+),(?P<duration>\d+)\]")
        .expect("编译 KRC_LINE_TIMESTAMP_REGEX 失败")
});

/// 匹配 KRC 音节级时间戳和文本 `<offset,duration,pitch>text`
static KRC_SYLLABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?P<offset>\d+),(?P<duration>\d+),\d+>(?P<text>[^<]*)")
        .expect("编译 KRC_SYLLABLE_REGEX 失败")
});

/// 解析 KRC 格式内容到 `ParsedSourceData` 结构。
///
/// 没有任何单词标签的行会保留为逐行歌词，文本为时间戳之后的原始内容。
pub fn parse_krc(content: &str) -> Result<ParsedSourceData, ConvertError> {
    let mut lines: Vec<LyricLine> = Vec::new();
    let mut raw_metadata: Vec<(String, String)> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (i, line_str) in content.lines().enumerate() {
        let line_num = i + 1;
        let trimmed_line = line_str.trim();

        if trimmed_line.is_empty() {
            continue;
        }

        // 内嵌的翻译与音译，不属于正文
        if trimmed_line.starts_with("[language:") {
            continue;
        }

        if parse_and_store_metadata(trimmed_line, &mut raw_metadata) {
            continue;
        }

        let Some(line_caps) = KRC_LINE_TIMESTAMP_REGEX.captures(trimmed_line) else {
            warnings.push(format!("第 {line_num} 行: 未能识别的行格式。"));
            continue;
        };

        let line_start_ms = to_ms(line_caps["start"].parse()?)?;
        let content_after_line_ts = &trimmed_line[line_caps[0].len()..];

        let mut words: Vec<LyricWord> = Vec::new();
        for syl_caps in KRC_SYLLABLE_REGEX.captures_iter(content_after_line_ts) {
            let offset_ms = to_ms(syl_caps["offset"].parse()?)?;
            let start_ms = line_start_ms.checked_add(offset_ms).ok_or_else(|| {
                ConvertError::InvalidTime(format!("第 {line_num} 行: 单词时间溢出"))
            })?;
            words.push(LyricWord {
                start_ms,
                text: syl_caps["text"].to_string(),
            });
        }

        if words.is_empty() {
            lines.push(LyricLine::line(line_start_ms, content_after_line_ts));
        } else {
            lines.push(LyricLine::verbatim(line_start_ms, words));
        }
    }

    Ok(ParsedSourceData {
        lines,
        raw_metadata,
        warnings,
        source_format: LyricMarkup::WordTagged,
    })
}
