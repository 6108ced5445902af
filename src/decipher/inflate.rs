//! zlib / deflate 压缩与解压的薄封装。

use std::io::{Read, Write};

use flate2::{
    Compression,
    read::{DeflateDecoder, ZlibDecoder},
    write::ZlibEncoder,
};

use crate::error::CipherError;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// 使用 zlib 解压字节数据，并移除头部的 UTF-8 BOM。
pub fn inflate_zlib(data: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut decompressed = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut decompressed)
        .map_err(|e| CipherError::Inflate(format!("Zlib 解压缩失败: {e}")))?;
    Ok(strip_utf8_bom(decompressed))
}

/// 使用无头部的 raw deflate 解压字节数据。
///
/// raw deflate 没有校验，任意字节都可能“解压成功”，调用方需要自行判断结果是否可信。
pub fn inflate_raw(data: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut decompressed = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut decompressed)
        .map_err(|e| CipherError::Inflate(format!("Deflate 解压缩失败: {e}")))?;
    Ok(strip_utf8_bom(decompressed))
}

/// 使用 zlib 压缩字节数据。
pub fn deflate_zlib(data: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CipherError::Deflate(format!("Zlib 压缩写入失败: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CipherError::Deflate(format!("Zlib 压缩完成失败: {e}")))
}

/// 移除头部的 UTF-8 BOM (0xEF 0xBB 0xBF)。
#[must_use]
pub fn strip_utf8_bom(mut data: Vec<u8>) -> Vec<u8> {
    if data.starts_with(&UTF8_BOM) {
        data.drain(..UTF8_BOM.len());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_round_trip_and_bom() {
        let mut payload = UTF8_BOM.to_vec();
        payload.extend_from_slice("[00:01.00]你好".as_bytes());

        let compressed = deflate_zlib(&payload).unwrap();
        let restored = inflate_zlib(&compressed).unwrap();

        assert_eq!(restored, "[00:01.00]你好".as_bytes());
    }

    #[test]
    fn test_zlib_rejects_plain_text() {
        let result = inflate_zlib(b"[ti:not compressed]");
        assert!(matches!(result, Err(CipherError::Inflate(_))));
    }
}
