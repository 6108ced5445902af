//! QQ 音乐加密 QRC 歌词的编解码。
//!
//! 密文是十六进制字符串，解码后按 8 字节分组用非标准 TripleDES 解密，再做 zlib 解压。
//! 解压后的文本通常是一个 `<?xml ...><QrcInfos>` 包装，真正的歌词在 `LyricContent` 属性里。

use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::debug;

use crate::{
    crypto::des::{BLOCK_SIZE, DesEngine, DesVariant, Mode},
    decipher::{inflate, text::decode_text},
    error::{CipherError, LyricsCodecError, Result},
};

/// QRC 使用的 24 字节 TripleDES 密钥。
pub const QRC_KEY: &[u8; 24] = b"!@#)(*$%123ZXC!@!@#)(NHL";

static QRC_LYRIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"LyricContent="([^"]*)""#).expect("编译 QRC_LYRIC_RE 失败")
});

static AMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?![a-zA-Z]{2,6};|#[0-9]{2,4};)").expect("编译 AMP_RE 失败")
});

static QUOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<attr>\s+[\w:.-]+\s*=\s*")(?P<value>(?:[^"]|"(?!\s+[\w:.-]+\s*=\s*"|\s*(?:/?|\?)>))*)"#)
        .expect("编译 QUOT_RE 失败")
});

/// QRC 编解码器，持有自己的 DES 引擎与轮密钥缓存。
#[derive(Debug)]
pub struct QrcCodec {
    engine: DesEngine,
}

impl Default for QrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl QrcCodec {
    /// 创建一个使用 QQ 音乐 DES 变体的编解码器。
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(DesEngine::new(DesVariant::QqMusic))
    }

    /// 使用外部提供的引擎。
    #[must_use]
    pub fn with_engine(engine: DesEngine) -> Self {
        Self { engine }
    }

    /// 内部引擎的引用。
    #[must_use]
    pub fn engine(&self) -> &DesEngine {
        &self.engine
    }

    /// 解密 QRC 原始字节，返回解压后的明文字节。
    ///
    /// 最后一个不足 8 字节的分组在左侧补零后解密。
    /// 解密结果无法解压时，会尝试直接解压原始字节（对应只压缩未加密的字段）。
    pub fn decrypt_bytes(&self, data: &[u8]) -> std::result::Result<Vec<u8>, CipherError> {
        if data.len() < BLOCK_SIZE {
            return Err(CipherError::TooShort {
                needed: BLOCK_SIZE,
                actual: data.len(),
            });
        }

        let mut decrypted = Vec::with_capacity(data.len().next_multiple_of(BLOCK_SIZE));
        for chunk in data.chunks(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block[BLOCK_SIZE - chunk.len()..].copy_from_slice(chunk);
            decrypted.extend_from_slice(&self.engine.triple_crypt_block(
                QRC_KEY,
                &block,
                Mode::Decrypt,
            ));
        }

        match inflate::inflate_zlib(&decrypted) {
            Ok(plain) => Ok(plain),
            Err(first) => {
                debug!("QRC 解密后解压失败 ({first})，尝试直接解压原始数据");
                inflate::inflate_zlib(data)
            }
        }
    }

    /// 解密十六进制编码的 QRC 字段，返回解压后的文本（可能仍带 XML 包装）。
    pub fn decrypt_hex(&self, encrypted_hex: &str) -> Result<String> {
        let bytes = hex::decode(encrypted_hex.trim())
            .map_err(|e| CipherError::Hex(e.to_string()))?;
        let plain = self.decrypt_bytes(&bytes)?;
        decode_text(&plain)
            .ok_or_else(|| LyricsCodecError::DecodeFailure("QRC 解密结果不是有效文本".into()))
    }

    /// 加密明文歌词：zlib 压缩，零填充到 8 字节整数倍，TripleDES 加密，输出十六进制。
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut data = inflate::deflate_zlib(plaintext.as_bytes())?;
        data.resize(data.len().next_multiple_of(BLOCK_SIZE), 0);

        let mut encrypted = Vec::with_capacity(data.len());
        for chunk in data.chunks_exact(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            encrypted.extend_from_slice(&self.engine.triple_crypt_block(
                QRC_KEY,
                &block,
                Mode::Encrypt,
            ));
        }
        Ok(hex::encode_upper(encrypted))
    }
}

/// 从 `<?xml ...>` 包装中提取 `LyricContent` 属性的内容。
///
/// 会先修复文本中未转义的 `&` 与属性值里的双引号。
/// 输入不是 XML 包装时原样返回。
#[must_use]
pub fn extract_lyric_content(decrypted_text: &str) -> String {
    if !decrypted_text.trim_start().starts_with("<?xml") {
        return decrypted_text.to_string();
    }

    let replaced_amp = AMP_RE.replace_all(decrypted_text, "&amp;");
    let fixed_text = QUOT_RE.replace_all(&replaced_amp, |caps: &fancy_regex::Captures| {
        format!("{}{}\"", &caps["attr"], caps["value"].replace('"', "&quot;"))
    });

    match QRC_LYRIC_RE.captures(&fixed_text) {
        Ok(Some(caps)) => caps
            .get(1)
            .map_or_else(String::new, |m| unescape_xml(m.as_str())),
        _ => decrypted_text.to_string(),
    }
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#10;", "\n")
        .replace("&#13;", "\r")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCRYPTED_HEX_STRING: &str = include_str!("../../tests/test_data/qrc_sample.hex");

    #[test]
    fn test_full_decryption_flow() {
        let codec = QrcCodec::new();
        let decrypted = codec.decrypt_hex(ENCRYPTED_HEX_STRING);

        assert!(
            decrypted.is_ok(),
            "解密过程不应返回错误。收到的错误: {:?}",
            decrypted.err()
        );
        let decrypted = decrypted.unwrap();
        assert!(!decrypted.is_empty(), "解密后的内容为空字符串。");

        let content = extract_lyric_content(&decrypted);
        assert!(!content.is_empty(), "未能提取出 LyricContent");
        assert!(content.contains('['));
    }

    #[test]
    fn test_round_trip() {
        let codec = QrcCodec::new();
        let initial_plaintext = codec.decrypt_hex(ENCRYPTED_HEX_STRING).expect("初始解密失败");

        let re_encrypted_hex = codec.encrypt(&initial_plaintext).expect("再次加密失败");
        let final_plaintext = codec.decrypt_hex(&re_encrypted_hex).expect("最终解密失败");

        assert_eq!(initial_plaintext, final_plaintext, "初始文本不等于最终文本");
        assert_eq!(codec.engine().cached_schedules(), 6);
    }

    #[test]
    fn test_compressed_but_unencrypted_falls_back() {
        let compressed = inflate::deflate_zlib(b"[00:01.00]plain").unwrap();
        let codec = QrcCodec::new();
        assert_eq!(codec.decrypt_bytes(&compressed).unwrap(), b"[00:01.00]plain");
    }

    #[test]
    fn test_malformed_input_fails_the_same_way_twice() {
        let codec = QrcCodec::new();

        let short = codec.decrypt_bytes(&[1, 2, 3]);
        assert_eq!(
            short,
            Err(CipherError::TooShort {
                needed: 8,
                actual: 3
            })
        );

        let garbage = b"[00:01.00]this is not ciphertext at all";
        let first = codec.decrypt_bytes(garbage);
        let second = codec.decrypt_bytes(garbage);
        assert!(matches!(first, Err(CipherError::Inflate(_))));
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_lyric_content_repairs_xml() {
        let wrapped = r#"<?xml version="1.0" encoding="utf-8"?>
<QrcInfos><LyricInfo LyricCount="1"><Lyric_1 LyricType="1" LyricContent="[ti:Rock & "Roll"]
[1000,500]a(1000,500)"/></LyricInfo></QrcInfos>"#;

        let content = extract_lyric_content(wrapped);
        assert_eq!(content, "[ti:Rock & \"Roll\"]\n[1000,500]a(1000,500)");

        assert_eq!(extract_lyric_content("[00:01.00]x"), "[00:01.00]x");
    }
}
