//! 此模块定义了用于反序列化网易云音乐歌词接口响应的数据结构。
//! API 来源于 <https://github.com/NeteaseCloudMusicApiReborn/api>

use serde::Deserialize;

/// 歌词接口 (`/eapi/song/lyric/v1`) 的顶层响应结构。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LyricResult {
    /// API 返回码，`200` 表示成功。
    pub code: i64,
    /// 标准 LRC 歌词。
    pub lrc: Option<LyricData>,
    /// 逐字 YRC 歌词。
    pub yrc: Option<LyricData>,
}

/// 单一歌词内容的数据结构。
#[derive(Debug, Default, Deserialize)]
pub struct LyricData {
    /// 歌词文本内容。
    #[serde(default)]
    pub lyric: String,
}

impl LyricResult {
    fn non_empty(data: Option<&LyricData>) -> Option<&str> {
        data.map(|d| d.lyric.as_str()).filter(|s| !s.trim().is_empty())
    }

    /// 逐字歌词（若存在且非空）。
    #[must_use]
    pub fn yrc_lyric(&self) -> Option<&str> {
        Self::non_empty(self.yrc.as_ref())
    }

    /// 逐行歌词（若存在且非空）。
    #[must_use]
    pub fn lrc_lyric(&self) -> Option<&str> {
        Self::non_empty(self.lrc.as_ref())
    }
}

/// 歌曲搜索接口 (`/eapi/search/song/list/page`) 的顶层响应结构。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchPageResult {
    /// API 返回码，`200` 表示成功。
    pub code: i64,
    /// 搜索数据。
    pub data: Option<SearchPageData>,
}

/// 搜索数据。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchPageData {
    /// 结果资源列表。
    pub resources: Vec<SearchResource>,
}

/// 一个搜索结果资源。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResource {
    /// 资源的基本信息。
    #[serde(rename = "baseInfo")]
    pub base_info: Option<BaseInfo>,
}

/// 资源的基本信息。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BaseInfo {
    /// 歌曲的精简信息。
    #[serde(rename = "simpleSongData")]
    pub simple_song_data: Option<Song>,
}

/// 歌曲的精简信息。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Song {
    /// 歌曲 ID。
    pub id: u64,
    /// 歌曲名。
    pub name: String,
    /// 歌手列表。
    pub ar: Vec<Artist>,
    /// 专辑。
    pub al: Option<Album>,
    /// 时长（毫秒）。
    pub dt: u64,
}

/// 歌手。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Artist {
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
