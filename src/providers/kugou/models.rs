//! 此模块定义了酷狗歌词接口的 JSON 响应结构。

use serde::Deserialize;

/// 歌词搜索接口 (`/v1/search`) 的顶层响应结构。
#[derive(Debug, Deserialize)]
pub struct SearchLyricsResponse {
    /// API 状态码，`200` 表示成功。
    pub status: i64,
    /// API 错误信息。
    #[serde(default, rename = "errmsg")]
    pub err_msg: Option<String>,
    /// 候选歌词列表。通常只关心第一个匹配项。
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// 代表一个可供下载的歌词候选版本。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    /// 该歌词版本的唯一 ID，用于下载。
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// 下载歌词所需的访问密钥 (access key)。
    pub accesskey: String,
    /// 演唱者姓名。
    #[serde(default)]
    pub singer: String,
    /// 歌曲名。
    #[serde(default)]
    pub song: String,
}

/// 歌词下载接口 (`/download`) 的响应结构。
#[derive(Debug, Deserialize)]
pub struct LyricDownloadResponse {
    /// API 状态码，`200` 表示成功。
    pub status: i64,
    /// 错误信息。
    #[serde(default)]
    pub info: Option<String>,
    /// 内容格式，`krc` 或 `lrc`。
    #[serde(default)]
    pub fmt: String,
    /// Base64 编码的歌词内容。
    #[serde(default)]
    pub content: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "期望字符串或数字，实际为 {other}"
        ))),
    }
}

/// 歌曲搜索接口 (`complexsearch.kugou.com/v2/search/song`) 的顶层响应结构。
#[derive(Debug, Deserialize)]
pub struct SearchSongResponse {
    /// API 状态码，`1` 表示成功。
    pub status: i64,
    /// API 错误码。
    #[serde(default, rename = "error_code")]
    pub err_code: Option<i64>,
    /// API 错误信息。
    #[serde(default, rename = "error_msg")]
    pub error: Option<String>,
    /// 搜索结果。
    pub data: Option<SearchSongData>,
}

/// 歌曲搜索结果的数据部分。
#[derive(Debug, Deserialize)]
pub struct SearchSongData {
    /// 歌曲列表。
    #[serde(default, rename = "lists")]
    pub info: Vec<SongInfo>,
}

/// 搜索结果中的单首歌曲。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SongInfo {
    /// 文件哈希，获取歌词时作为歌曲标识。
    pub file_hash: String,
    /// 歌曲名。
    pub song_name: String,
    /// 歌手名，多个歌手以 `、` 分隔。
    pub singer_name: String,
    /// 专辑名。
    pub album_name: String,
    /// 时长（秒）。
    pub duration: u64,
}
