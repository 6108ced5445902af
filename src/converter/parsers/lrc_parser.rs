//! # LRC 格式解析器

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    converter::{
        types::{ConvertError, ParsedSourceData},
        utils::{normalize_text_whitespace, parse_and_store_metadata, parse_credit_line, to_ms},
    },
    model::lyric::{LyricLine, LyricMarkup},
};

/// 用于匹配一个完整的 LRC 歌词行，捕获时间戳部分和文本部分
static LRC_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\[\d+:\d{2}[.:]\d{2,3}\])+)(.*)$").expect("未能编译 LRC_LINE_REGEX")
});

/// 用于从一个时间戳组中提取出单个时间戳
static LRC_TIMESTAMP_EXTRACT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d+):(\d{2})[.:](\d{2,3})\]").expect("未能编译 LRC_TIMESTAMP_EXTRACT_REGEX")
});

/// 判断一行是否以 LRC 时间戳开头。
pub fn is_lrc_line(line: &str) -> bool {
    LRC_LINE_REGEX.is_match(line.trim())
}

/// 解析单个 `[mm:ss.xx]` / `[mm:ss.xxx]` 时间戳的三个部分。
fn parse_timestamp(minutes: &str, seconds: &str, fraction: &str) -> Option<u64> {
    let min = minutes.parse::<u64>().ok()?;
    let sec = seconds.parse::<u64>().ok()?;
    let ms = match fraction.len() {
        2 => fraction.parse::<u64>().ok()? * 10,
        3 => fraction.parse::<u64>().ok()?,
        _ => return None,
    };
    (sec < 60).then_some((min * 60 + sec) * 1000 + ms)
}

/// 解析 LRC 格式内容到 `ParsedSourceData` 结构。
///
/// 一行带有多个时间戳时，会为每个时间戳生成一行。
pub fn parse_lrc(content: &str) -> Result<ParsedSourceData, ConvertError> {
    let mut raw_metadata: Vec<(String, String)> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut lines: Vec<LyricLine> = Vec::new();

    for (line_num_zero_based, line_str_raw) in content.lines().enumerate() {
        let line_num_one_based = line_num_zero_based + 1;
        let line_str_trimmed = line_str_raw.trim();

        if line_str_trimmed.is_empty() {
            continue;
        }

        if line_str_trimmed.starts_with('{') {
            if let Ok(credit) = parse_credit_line(line_str_trimmed)
                && !credit.is_empty()
            {
                raw_metadata.push(("credit".to_string(), credit));
            }
            continue;
        }

        if parse_and_store_metadata(line_str_trimmed, &mut raw_metadata) {
            continue;
        }

        let Some(line_caps) = LRC_LINE_REGEX.captures(line_str_trimmed) else {
            warnings.push(format!(
                "LRC解析警告 (行 {line_num_one_based}): 无法识别的行格式 '{line_str_trimmed}'。"
            ));
            continue;
        };

        let all_timestamps_str = line_caps.get(1).map_or("", |m| m.as_str());
        let text_part = normalize_text_whitespace(line_caps.get(2).map_or("", |m| m.as_str()));

        for ts_cap in LRC_TIMESTAMP_EXTRACT_REGEX.captures_iter(all_timestamps_str) {
            match parse_timestamp(&ts_cap[1], &ts_cap[2], &ts_cap[3]) {
                Some(total_ms) => lines.push(LyricLine::line(to_ms(total_ms)?, text_part.clone())),
                None => warnings.push(format!(
                    "LRC解析警告 (行 {}): 无法解析时间戳部分 '{}'。",
                    line_num_one_based, &ts_cap[0]
                )),
            }
        }
    }

    Ok(ParsedSourceData {
        lines,
        raw_metadata,
        warnings,
        source_format: LyricMarkup::Lrc,
    })
}

/// 将没有任何时间标签的纯文本解析为时间为 0 的逐行歌词。
#[must_use]
pub fn parse_plain(content: &str) -> ParsedSourceData {
    let lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LyricLine::line(0, line))
        .collect();

    ParsedSourceData {
        lines,
        source_format: LyricMarkup::Plain,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lrc_expands_repeated_timestamps() {
        let content = "[ar:歌手]\n[00:10.50][01:00.000]副歌\n[00:01.00]  第一  句 \n[00:99.00]坏";
        let parsed = parse_lrc(content).unwrap();

        assert_eq!(parsed.raw_metadata, vec![("ar".to_string(), "歌手".to_string())]);
        assert_eq!(
            parsed.lines,
            vec![
                LyricLine::line(10_500, "副歌"),
                LyricLine::line(60_000, "副歌"),
                LyricLine::line(1_000, "第一 句"),
            ]
        );
        assert_eq!(parsed.warnings.len(), 1);

        let doc = parsed.into_document();
        assert_eq!(doc.lines()[0].start_ms, 1_000);
    }

    #[test]
    fn test_single_digit_minutes() {
        assert!(is_lrc_line("[0:01.00]短分钟"));

        let parsed = parse_lrc("[0:01.00]第一句\n[1:02.500]第二句").unwrap();
        assert!(parsed.warnings.is_empty());
        assert_eq!(
            parsed.lines,
            vec![LyricLine::line(1_000, "第一句"), LyricLine::line(62_500, "第二句")]
        );
    }

    #[test]
    fn test_parse_plain_skips_blank_lines() {
        let parsed = parse_plain("第一行\n\n  第二行  \n");
        assert_eq!(
            parsed.lines,
            vec![LyricLine::line(0, "第一行"), LyricLine::line(0, "第二行")]
        );
    }
}
