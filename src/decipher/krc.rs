//! 酷狗 KRC 歌词解密。
//!
//! ## 致谢
//!
//! 本模块的解密逻辑（包括固定的16字节密钥和异或算法）源于
//! `LyricDecoder` 项目。
//!
//! - Copyright (c) `SuJiKiNen` (`LyricDecoder` Project)
//! - Licensed under the MIT License.
//!
//! <https://github.com/SuJiKiNen/LyricDecoder>

use base64::{Engine as _, engine::general_purpose};
use tracing::debug;

use crate::{
    decipher::{inflate, text::decode_text},
    error::{CipherError, LyricsCodecError, Result},
};

/// KRC 容器的头部长度（通常为 `krc1`）。
pub const KRC_HEADER_LEN: usize = 4;

/// KRC 容器的魔数。
pub const KRC_MAGIC: &[u8] = b"krc1";

/// 酷狗 KRC 歌词解密所使用的固定16字节密钥。
const KRC_DECRYPT_KEY: [u8; 16] = [
    0x40, 0x47, 0x61, 0x77, 0x5E, 0x32, 0x74, 0x47, 0x51, 0x36, 0x31, 0x2D, 0xCE, 0xD2, 0x6E, 0x69,
];

/// 解开 KRC 容器后得到的内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KrcPayload {
    /// 异或后 zlib 解压成功，内容经过校验和验证。
    Inflated(Vec<u8>),
    /// 解压失败，只做了异或，内容未经任何校验。
    Xored(Vec<u8>),
}

impl KrcPayload {
    /// 取出字节内容。
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Inflated(bytes) | Self::Xored(bytes) => bytes,
        }
    }
}

/// 解开 KRC 容器，并区分内容是否经过解压。
///
/// 去掉 4 字节头部后与密钥循环异或，再做 zlib 解压。
/// 解压失败时返回 [`KrcPayload::Xored`]，调用方需要自行判断内容是否可信。
///
/// # 错误
///
/// 数据不超过头部长度时返回 [`CipherError::TooShort`]。
pub fn open_krc_container(data: &[u8]) -> std::result::Result<KrcPayload, CipherError> {
    if data.len() <= KRC_HEADER_LEN {
        return Err(CipherError::TooShort {
            needed: KRC_HEADER_LEN + 1,
            actual: data.len(),
        });
    }

    let xored = xor_with_key(&data[KRC_HEADER_LEN..]);

    match inflate::inflate_zlib(&xored) {
        Ok(decompressed) => Ok(KrcPayload::Inflated(decompressed)),
        Err(e) => {
            debug!("KRC 解压失败，按未压缩文本处理: {e}");
            Ok(KrcPayload::Xored(inflate::strip_utf8_bom(xored)))
        }
    }
}

/// 解密 KRC 容器的原始字节。
///
/// 与 [`open_krc_container`] 相同，但不区分内容是否经过解压。
pub fn decrypt_krc_bytes(data: &[u8]) -> std::result::Result<Vec<u8>, CipherError> {
    open_krc_container(data).map(KrcPayload::into_bytes)
}

fn xor_with_key(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .zip(KRC_DECRYPT_KEY.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

/// 构造一个未压缩、只做了异或的 KRC 容器。
#[cfg(test)]
pub(crate) fn xor_only_container(plaintext: &[u8]) -> Vec<u8> {
    let mut container = KRC_MAGIC.to_vec();
    container.extend(xor_with_key(plaintext));
    container
}

/// 解密 Base64 编码的 KRC 歌词，返回 KRC 文本。
pub fn decrypt_krc(encrypted_krc_base64: &str) -> Result<String> {
    let data = general_purpose::STANDARD.decode(encrypted_krc_base64.trim().as_bytes())?;
    let decrypted = decrypt_krc_bytes(&data)?;
    decode_text(&decrypted)
        .ok_or_else(|| LyricsCodecError::DecodeFailure("KRC 解密结果不是有效文本".into()))
}

/// 将 KRC 文本加密为容器字节，是 [`decrypt_krc_bytes`] 的逆过程。
pub fn encrypt_krc_bytes(plaintext: &str) -> std::result::Result<Vec<u8>, CipherError> {
    let compressed = inflate::deflate_zlib(plaintext.as_bytes())?;
    let mut output = KRC_MAGIC.to_vec();
    output.extend(xor_with_key(&compressed));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KRC: &str = "[ti:测试]\n[1000,500]<0,200,0>hello<200,300,0> world\n";

    #[test]
    fn test_decrypt_compressed_container() {
        let container = encrypt_krc_bytes(SAMPLE_KRC).unwrap();
        let decrypted = decrypt_krc_bytes(&container).unwrap();
        assert_eq!(String::from_utf8(decrypted).unwrap(), SAMPLE_KRC);

        let encoded = general_purpose::STANDARD.encode(&container);
        assert_eq!(decrypt_krc(&encoded).unwrap(), SAMPLE_KRC);
    }

    #[test]
    fn test_falls_back_to_xored_bytes_when_not_compressed() {
        let plaintext = b"[0,100]<0,100,0>la";
        let container = xor_only_container(plaintext);

        let decrypted = decrypt_krc_bytes(&container).unwrap();
        assert_eq!(decrypted, plaintext);
        assert_eq!(
            open_krc_container(&container).unwrap(),
            KrcPayload::Xored(plaintext.to_vec()),
            "未压缩的内容应被标记为只做了异或"
        );

        let compressed = encrypt_krc_bytes("[0,100]<0,100,0>la").unwrap();
        assert!(matches!(
            open_krc_container(&compressed),
            Ok(KrcPayload::Inflated(_))
        ));
    }

    #[test]
    fn test_too_short_is_typed_and_repeatable() {
        let first = decrypt_krc_bytes(b"krc1");
        let second = decrypt_krc_bytes(b"krc1");
        assert_eq!(
            first,
            Err(CipherError::TooShort {
                needed: 5,
                actual: 4
            })
        );
        assert_eq!(first, second);
    }
}
