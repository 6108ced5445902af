//! 本模块用于加密发送给网易云音乐 EAPI 的请求，以及解密其响应。
//! 本实现仅用于与网易云音乐 API 通信，不应用于实际安全目的。
//!
//! 加密逻辑来源于 <https://github.com/Binaryify/NeteaseCloudMusicApi>

use aes::{
    Aes128,
    cipher::{BlockSizeUser, generic_array::GenericArray},
};
use block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use ecb::{Decryptor as EcbModeDecryptor, Encryptor as EcbModeEncryptor};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    crypto::md5_hex,
    error::{CipherError, LyricsCodecError, Result},
    model::provider::ProviderId,
};

/// EAPI 加密中使用的固定 AES ECB 密钥
pub const EAPI_KEY: &[u8; 16] = b"e82ckenh8dichen8";

/// 明文各段之间的分隔符
const EAPI_SEPARATOR: &str = "-36cd479b6b5-";

/// 表示登录状态失效的业务码。
const SESSION_REJECTED_CODES: [i64; 2] = [301, -460];

/// 实现 AES ECB 模式加密。
///
/// # 返回
/// 加密后的数据的十六进制字符串 (大写)。
pub fn aes_ecb_encrypt(data: &[u8], key: &[u8; 16]) -> Result<String> {
    let cipher = EcbModeEncryptor::<Aes128>::new(GenericArray::from_slice(key));

    let block_size = Aes128::block_size();
    let msg_len = data.len();
    let mut buffer = data.to_vec();
    buffer.resize((msg_len / block_size + 1) * block_size, 0);

    let ciphertext = cipher
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, msg_len)
        .map_err(|e| LyricsCodecError::Encryption(format!("AES ECB 加密失败: {e:?}")))?;

    Ok(hex::encode_upper(ciphertext))
}

/// 实现 AES ECB 模式解密并去除 PKCS7 填充。
pub fn aes_ecb_decrypt(data: &[u8], key: &[u8; 16]) -> std::result::Result<Vec<u8>, CipherError> {
    let block_size = Aes128::block_size();
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CipherError::TooShort {
            needed: data.len().div_ceil(block_size).max(1) * block_size,
            actual: data.len(),
        });
    }

    let cipher = EcbModeDecryptor::<Aes128>::new(GenericArray::from_slice(key));
    let mut buffer = data.to_vec();
    let plaintext = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CipherError::Padding)?;
    Ok(plaintext.to_vec())
}

/// 准备 EAPI 请求的加密参数。
///
/// # 参数
/// * `url_path` - API 的 URL 路径段 (例如 "/api/song/lyric/v1")。
/// * `json` - 已序列化的请求参数。
///
/// # 返回
/// 作为表单字段 `params` 发送的十六进制大写密文。
pub fn encrypt_request(url_path: &str, json: &str) -> Result<String> {
    let digest = md5_hex(format!("nobody{url_path}use{json}md5forencrypt"));
    let plaintext = format!("{url_path}{EAPI_SEPARATOR}{json}{EAPI_SEPARATOR}{digest}");
    aes_ecb_encrypt(plaintext.as_bytes(), EAPI_KEY)
}

/// 序列化请求参数对象并加密。
pub fn encrypt_params<T: serde::Serialize>(url_path: &str, params: &T) -> Result<String> {
    let json = serde_json::to_string(params)?;
    encrypt_request(url_path, &json)
}

/// 解密 EAPI 响应。
///
/// 响应既可能是十六进制文本，也可能是原始密文。解密或解析失败时，
/// 把原始字节直接当作 JSON 解析（部分接口返回明文）。
///
/// # 错误
///
/// 两种方式都得不到 JSON 时返回 [`LyricsCodecError::DecodeFailure`]。
pub fn decrypt_response(raw: &[u8]) -> Result<Value> {
    match decrypt_to_json(raw) {
        Ok(value) => return Ok(value),
        Err(e) => trace!("EAPI 响应解密失败，尝试按明文解析: {e}"),
    }

    serde_json::from_slice(raw.trim_ascii()).map_err(|e| {
        debug!("EAPI 响应既无法解密也不是 JSON");
        LyricsCodecError::DecodeFailure(format!("无法解析网易云响应: {e}"))
    })
}

fn decrypt_to_json(raw: &[u8]) -> Result<Value> {
    let trimmed = raw.trim_ascii();
    let ciphertext = if !trimmed.is_empty() && trimmed.iter().all(u8::is_ascii_hexdigit) {
        hex::decode(trimmed).map_err(|e| CipherError::Hex(e.to_string()))?
    } else {
        raw.to_vec()
    };
    let plaintext = aes_ecb_decrypt(&ciphertext, EAPI_KEY)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// 从请求明文中取回路径与 JSON，是 [`encrypt_request`] 的逆过程。
///
/// 返回 `None` 表示明文格式不符或摘要不匹配。
#[must_use]
pub fn open_request(params_hex: &str) -> Option<(String, String)> {
    let ciphertext = hex::decode(params_hex).ok()?;
    let plaintext = String::from_utf8(aes_ecb_decrypt(&ciphertext, EAPI_KEY).ok()?).ok()?;

    let (path, rest) = plaintext.split_once(EAPI_SEPARATOR)?;
    let (json, digest) = rest.rsplit_once(EAPI_SEPARATOR)?;
    (md5_hex(format!("nobody{path}use{json}md5forencrypt")) == digest)
        .then(|| (path.to_string(), json.to_string()))
}

/// 检查响应中的 `code` 字段。
///
/// # 错误
///
/// * `301`、`-460` 返回 [`LyricsCodecError::SessionExpired`]；
/// * 其他非 `200` 的值返回 [`LyricsCodecError::ProviderApplication`]。
pub fn check_code(value: &Value) -> Result<()> {
    let Some(code) = value.get("code").and_then(Value::as_i64) else {
        return Ok(());
    };
    if code == 200 {
        return Ok(());
    }

    let message = value
        .get("message")
        .or_else(|| value.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if SESSION_REJECTED_CODES.contains(&code) {
        return Err(LyricsCodecError::SessionExpired(format!(
            "网易云拒绝了当前会话 (code = {code}): {message}"
        )));
    }
    Err(LyricsCodecError::ProviderApplication {
        provider: ProviderId::Netease,
        code,
        message,
    })
}
