//! 定义了整个 `lyrics-codec` 库的错误类型 `LyricsCodecError`。

use std::io;
use thiserror::Error;

use crate::{converter::types::ConvertError, model::provider::ProviderId};

/// 密码学适配器层面的错误。
///
/// 这类错误总是可恢复的，调用方应当尝试下一个解码策略。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// 输入数据过短
    #[error("输入数据过短: 至少需要 {needed} 字节，实际为 {actual} 字节")]
    TooShort {
        /// 所需的最小长度
        needed: usize,
        /// 实际长度
        actual: usize,
    },

    /// 密钥长度不合法
    #[error("密钥长度必须为 8 或 24 字节，实际为 {0}")]
    InvalidKeyLength(usize),

    /// 十六进制解码失败
    #[error("无效的十六进制字符串: {0}")]
    Hex(String),

    /// Base64 解码失败
    #[error("Base64 解码失败: {0}")]
    Base64(String),

    /// 解压缩失败
    #[error("解压缩失败: {0}")]
    Inflate(String),

    /// 压缩失败
    #[error("压缩失败: {0}")]
    Deflate(String),

    /// AES 填充校验失败
    #[error("PKCS7 填充无效")]
    Padding,
}

/// `lyrics-codec` 库的通用错误枚举。
#[derive(Error, Debug)]
pub enum LyricsCodecError {
    /// 网络请求失败 (源自 `reqwest::Error`)
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// 传输层返回了非成功状态或其他网络错误
    #[error("传输失败: {0}")]
    Transport(String),

    /// 所有解码策略都没有产生可用的歌词
    #[error("解码失败: {0}")]
    DecodeFailure(String),

    /// 解密适配器拒绝了输入
    #[error("解密失败: {0}")]
    Cipher(#[from] CipherError),

    /// 远端在结构完整的响应中返回了业务错误码
    #[error("{provider} 返回业务错误 (code = {code}): {message}")]
    ProviderApplication {
        /// 返回错误的提供商
        provider: ProviderId,
        /// 业务错误码
        code: i64,
        /// 附带的错误信息
        message: String,
    },

    /// 提供商会话失效且续期失败
    #[error("会话已失效: {0}")]
    SessionExpired(String),

    /// JSON 解析失败 (源自 `serde_json::Error`)
    #[error("JSON 解析失败: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Base64 解码失败 (源自 `base64::DecodeError`)
    #[error("Base64 解码失败: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// I/O 错误 (源自 `io::Error`)
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    /// 歌词文本解析失败
    #[error("歌词解析失败: {0}")]
    Parser(String),

    /// 加密失败
    #[error("加密失败: {0}")]
    Encryption(String),

    /// 不支持的操作
    #[error("提供商 '{0}' 不支持该操作")]
    ProviderNotSupported(ProviderId),
}

impl From<ConvertError> for LyricsCodecError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::JsonParse { source, context } => {
                let error_message = format!("解析 JSON 内容 {context} 失败: {source}");
                Self::Parser(error_message)
            }

            ConvertError::InvalidTime(s) | ConvertError::InvalidLyricFormat(s) => Self::Parser(s),

            ConvertError::ParseInt(e) => Self::Parser(e.to_string()),
        }
    }
}

impl LyricsCodecError {
    /// 该错误是否代表会话被远端拒绝，需要续期。
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

/// `LyricsCodecError` 的 `Result` 类型别名，方便在函数签名中使用。
pub type Result<T> = std::result::Result<T, LyricsCodecError>;
