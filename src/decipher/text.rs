//! 字节到文本的解码，以及“像不像歌词”的判断。

use encoding_rs::GBK;

use super::inflate::strip_utf8_bom;

/// 将字节解码为文本：先按 UTF-8（去掉 BOM），失败后按 GBK。
///
/// 两种编码都不合法时返回 `None`，不做有损替换。
#[must_use]
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    match String::from_utf8(strip_utf8_bom(bytes.to_vec())) {
        Ok(text) => Some(text),
        Err(e) => GBK
            .decode_without_bom_handling_and_without_replacement(e.as_bytes())
            .map(|text| text.into_owned()),
    }
}

/// 粗略判断文本是否像带时间标签的歌词。
///
/// 要求出现一对方括号，并且含有冒号或点号。
#[must_use]
pub fn looks_like_lyrics(text: &str) -> bool {
    let has_bracket_pair = text
        .find('[')
        .is_some_and(|open| text[open..].contains(']'));
    has_bracket_pair && (text.contains(':') || text.contains('.'))
}
