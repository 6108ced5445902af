//! 此模块定义了 QQ 音乐 `musicu.fcg` 歌词接口的响应结构。

use serde::Deserialize;

/// `musicu.fcg` 的顶层响应。
#[derive(Debug, Deserialize)]
pub struct MusicuResponse {
    /// 整个请求的返回码，`0` 表示成功。
    #[serde(default)]
    pub code: i64,
    /// 歌词请求的结果。
    pub request: Option<LyricApiResult>,
}

/// `GetPlayLyricInfo` 请求的结果。
#[derive(Debug, Deserialize)]
pub struct LyricApiResult {
    /// 业务返回码，`0` 表示成功。
    #[serde(default)]
    pub code: i64,
    /// 包含了核心歌词数据的对象。
    #[serde(default)]
    pub data: LyricApiResponse,
}

/// `GetPlayLyricInfo` API 响应的核心数据。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LyricApiResponse {
    /// 十六进制编码的加密 QRC 歌词。
    pub qrc: String,
    /// Base64 编码的 LRC 歌词。
    pub lyric: String,
}

/// `DoSearchForQQMusicLite` 搜索接口的顶层响应。
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// 搜索请求的结果。
    pub request: Option<SearchApiResult>,
}

/// 搜索请求的结果。
#[derive(Debug, Deserialize)]
pub struct SearchApiResult {
    /// 业务返回码，`0` 表示成功。
    #[serde(default)]
    pub code: i64,
    /// 搜索数据。
    #[serde(default)]
    pub data: SearchData,
}

/// 搜索数据。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchData {
    /// 结果主体。
    pub body: SearchBody,
}

/// 搜索结果主体。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchBody {
    /// 歌曲列表。
    pub item_song: Vec<Song>,
}

/// 搜索结果中的单首歌曲。
///
/// `name` 与 `title` 通常相同，`title` 缺失时使用 `name`。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Song {
    /// 数字歌曲 ID，获取歌词时使用。
    pub id: u64,
    /// 歌曲 MID。
    pub mid: String,
    /// 歌曲名。
    pub name: String,
    /// 带版本信息的歌曲标题。
    pub title: String,
    /// 歌手列表。
    pub singer: Vec<Singer>,
    /// 专辑。
    pub album: Album,
    /// 时长（秒）。
    pub interval: u64,
}

/// 歌手。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Singer {
    /// 歌手名。
    pub name: String,
}

/// 专辑。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Album {
    /// 专辑名。
    pub name: String,
}
