//! 底层密码学原语。
//!
//! DES / TripleDES 自行实现；MD5 与 AES 使用 `md-5`、`aes` 等现成 crate。

pub mod des;

use md5::{Digest, Md5};

/// 计算输入的 MD5，返回 32 位小写十六进制字符串。
#[must_use]
pub fn md5_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(input.as_ref()))
}
