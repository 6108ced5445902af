//! 包含一些工具函数的模块。

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::converter::types::ConvertError;

static METADATA_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<key>[a-zA-Z_][a-zA-Z0-9_]*):(?P<value>.*)\]$")
        .expect("编译 METADATA_TAG_REGEX 失败")
});

/// 尝试将一行文本解析为 LRC 风格的 `[key:value]` 元数据。
/// 如果成功，则将结果追加到 `raw_metadata` 并返回 `true`。
pub fn parse_and_store_metadata(line: &str, raw_metadata: &mut Vec<(String, String)>) -> bool {
    if let Some(caps) = METADATA_TAG_REGEX.captures(line)
        && let (Some(key), Some(value)) = (caps.name("key"), caps.name("value"))
    {
        raw_metadata.push((
            key.as_str().to_string(),
            normalize_text_whitespace(value.as_str()),
        ));
        return true;
    }
    false
}

#[derive(Deserialize)]
struct CreditLine {
    #[serde(default)]
    c: Vec<CreditSegment>,
}

#[derive(Deserialize)]
struct CreditSegment {
    #[serde(default)]
    tx: String,
}

/// 解析网易云歌词中以 JSON 表示的制作人员行，例如
/// `{"t":0,"c":[{"tx":"作词: "},{"tx":"某人"}]}`。
///
/// 返回拼接后的文本。
pub fn parse_credit_line(line: &str) -> Result<String, ConvertError> {
    let credit: CreditLine = serde_json::from_str(line)
        .map_err(|e| ConvertError::json_parse(e, "制作人员行".to_string()))?;
    let text: String = credit.c.iter().map(|segment| segment.tx.as_str()).collect();
    Ok(normalize_text_whitespace(&text))
}

/// 规范化文本中的空白字符
pub fn normalize_text_whitespace(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// 将解析出的毫秒数收窄到 `u32`。
pub fn to_ms(value: u64) -> Result<u32, ConvertError> {
    u32::try_from(value).map_err(|_| ConvertError::InvalidTime(format!("{value} 毫秒超出范围")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_store_metadata() {
        let mut metadata = Vec::new();
        assert!(parse_and_store_metadata("[ar:  歌手   A ]", &mut metadata));
        assert!(parse_and_store_metadata("[offset:0]", &mut metadata));
        assert!(!parse_and_store_metadata("[00:01.00]歌词", &mut metadata));
        assert!(!parse_and_store_metadata("[1000,500]歌词", &mut metadata));

        assert_eq!(
            metadata,
            vec![
                ("ar".to_string(), "歌手 A".to_string()),
                ("offset".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_credit_line() {
        let line = r#"{"t":0,"c":[{"tx":"作词: "},{"tx":"某人","li":"http://x"}]}"#;
        assert_eq!(parse_credit_line(line).unwrap(), "作词: 某人");
        assert!(parse_credit_line("{broken").is_err());
    }

    #[test]
    fn test_to_ms_rejects_overflow() {
        assert_eq!(to_ms(1200).unwrap(), 1200);
        assert!(matches!(
            to_ms(u64::from(u32::MAX) + 1),
            Err(ConvertError::InvalidTime(_))
        ));
    }
}
