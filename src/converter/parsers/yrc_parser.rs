//! # YRC 格式解析器
//!
//! 网易云逐字歌词：`[行开始,行时长](开始,时长,0)文本(开始,时长,0)文本...`，
//! 单词时间为绝对时间。以 `{` 开头的 JSON 行是制作人员信息。

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    converter::{
        types::{ConvertError, ParsedSourceData},
        utils::{parse_and_store_metadata, parse_credit_line, to_ms},
    },
    model::lyric::{LyricLine, LyricMarkup, LyricWord},
};

/// 匹配 YRC 行级时间戳 `[start,duration]`
static YRC_LINE_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<start>\d+),(?P<duration>\d+)]").expect("编译 YRC_LINE_TIMESTAMP_REGEX 失败")
});

/// 匹配 YRC 音节级时间戳 `(start,duration,0)`
static YRC_SYLLABLE_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?P<start>\d+),(?P<duration>\d+),\d+\)")
        .expect("编译 YRC_SYLLABLE_TIMESTAMP_REGEX 失败")
});

/// 元数据中保存制作人员行所用的键。
pub const CREDIT_METADATA_KEY: &str = "credit";

/// 解析单行 YRC 歌词文本到 `LyricLine` 结构。
fn parse_yrc_line(line_str: &str, line_num: usize) -> Result<LyricLine, ConvertError> {
    let line_ts_cap = YRC_LINE_TIMESTAMP_REGEX.captures(line_str).ok_or_else(|| {
        ConvertError::InvalidLyricFormat(format!(
            "第 {line_num} 行: 行首缺少行时间戳标记 `[开始时间,总时长]`。",
        ))
    })?;

    let line_start_ms = to_ms(line_ts_cap["start"].parse()?)?;
    let content_after_line_ts = &line_str[line_ts_cap[0].len()..];

    let timestamp_caps: Vec<_> = YRC_SYLLABLE_TIMESTAMP_REGEX
        .captures_iter(content_after_line_ts)
        .collect();

    let mut words: Vec<LyricWord> = Vec::with_capacity(timestamp_caps.len());
    for (i, caps) in timestamp_caps.iter().enumerate() {
        let text_start_pos = caps.get(0).map_or(0, |m| m.end());
        let text_end_pos = timestamp_caps
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(content_after_line_ts.len(), |m| m.start());
        let text = &content_after_line_ts[text_start_pos..text_end_pos];
        if text.is_empty() {
            continue;
        }
        words.push(LyricWord {
            start_ms: to_ms(caps["start"].parse()?)?,
            text: text.to_string(),
        });
    }

    if words.is_empty() {
        return Ok(LyricLine::line(line_start_ms, content_after_line_ts));
    }
    Ok(LyricLine::verbatim(line_start_ms, words))
}

/// 解析 YRC 格式内容到 `ParsedSourceData` 结构。
pub fn parse_yrc(content: &str) -> Result<ParsedSourceData, ConvertError> {
    let mut lines: Vec<LyricLine> = Vec::new();
    let mut raw_metadata: Vec<(String, String)> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (i, line_str) in content.lines().enumerate() {
        let line_num = i + 1;
        let trimmed_line = line_str.trim();
        if trimmed_line.is_empty() {
            continue;
        }

        if trimmed_line.starts_with('{') {
            match parse_credit_line(trimmed_line) {
                Ok(credit) if !credit.is_empty() => {
                    raw_metadata.push((CREDIT_METADATA_KEY.to_string(), credit));
                }
                Ok(_) => {}
                Err(e) => warnings.push(format!("第 {line_num} 行: {e}")),
            }
            continue;
        }

        if parse_and_store_metadata(trimmed_line, &mut raw_metadata) {
            continue;
        }

        match parse_yrc_line(trimmed_line, line_num) {
            Ok(line) => lines.push(line),
            Err(ConvertError::InvalidLyricFormat(msg)) => warnings.push(msg),
            Err(e) => return Err(e),
        }
    }

    Ok(ParsedSourceData {
        lines,
        raw_metadata,
        warnings,
        source_format: LyricMarkup::Yrc,
    })
}
