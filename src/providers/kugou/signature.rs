//! 此模块包含为酷狗 API 请求生成签名的函数。
//! API 来源于 <https://github.com/MakcRe/KuGouMusicApi>

use std::collections::BTreeMap;

use crate::crypto::md5_hex;

const KUGOU_ANDROID_SALT: &str = "OIlwieks28dk2k092lksi2UIkp";
const KUGOU_LITE_ANDROID_SALT: &str = "LnT6xpN3khm36zse0QzvmgTZ3waWdRSA";

/// 签名所用的盐。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KugouSalt {
    /// 酷狗安卓版
    Android,
    /// 酷狗概念版，歌词接口使用这一个
    #[default]
    Lite,
}

impl KugouSalt {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Android => KUGOU_ANDROID_SALT,
            Self::Lite => KUGOU_LITE_ANDROID_SALT,
        }
    }
}

/// 为酷狗 API 请求生成 `signature`。
///
/// 签名为 `MD5(salt + "k1=v1k2=v2..." + body + salt)`，键按字典序排列。
/// 这是一个纯函数：相同的参数、请求体和盐总是得到相同的签名。
///
/// # 参数
/// * `params` - 一个包含所有 URL 查询参数的 `BTreeMap`。
/// * `body` - POST 请求的请求体字符串。对于 GET 请求，应传入空字符串。
/// * `salt` - 使用哪个客户端的盐。
///
/// # 返回
/// 返回计算出的 32 位小写 MD5 签名字符串。
#[must_use]
pub fn signature_params(params: &BTreeMap<String, String>, body: &str, salt: KugouSalt) -> String {
    let salt = salt.as_str();

    // BTreeMap 的迭代器已经按 key 的字典序排好序
    let params_string: String = params.iter().map(|(k, v)| format!("{k}={v}")).collect();

    let mut string_to_sign =
        String::with_capacity(salt.len() * 2 + params_string.len() + body.len());
    string_to_sign.push_str(salt);
    string_to_sign.push_str(&params_string);
    string_to_sign.push_str(body);
    string_to_sign.push_str(salt);

    md5_hex(string_to_sign)
}

/// 对参数签名，返回附加了 `signature` 的查询参数列表。
#[must_use]
pub fn sign_query(params: &BTreeMap<String, String>, salt: KugouSalt) -> Vec<(String, String)> {
    let signature = signature_params(params, "", salt);
    params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .chain(std::iter::once(("signature".to_string(), signature)))
        .collect()
}
