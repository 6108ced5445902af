//! 提供商标识。

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// 歌词来源的提供商标识。
///
/// 用于选择解码策略、请求签名方式，以及在结果中标注来源。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// QQ 音乐，歌词字段为十六进制编码的 QRC 或 Base64 编码的 LRC。
    Qq,
    /// QQ 音乐旧版 QMC1 逐字节异或格式。
    Qmc1,
    /// 酷狗音乐，歌词为 Base64 编码的 KRC 容器。
    Kugou,
    /// 网易云音乐，请求与响应使用 eapi 信封。
    Netease,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_and_parse() {
        assert_eq!(ProviderId::Netease.to_string(), "netease");
        assert_eq!(ProviderId::from_str("KUGOU").unwrap(), ProviderId::Kugou);
        assert!(ProviderId::from_str("lrclib").is_err());
    }
}
