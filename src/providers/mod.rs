//! 提供商模块
//!
//! 该模块定义了与各音乐平台交互的核心抽象：每个提供商负责构造（签名或加密的）请求，
//! 通过注入的 [`Transport`](crate::transport::Transport) 发送，
//! 并从响应中取出候选歌词字段交给解码编排器。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    decoder::RawField,
    error::Result,
    model::{lyric::LyricsType, provider::ProviderId},
};

pub mod kugou;
pub mod netease;
pub mod qq;

/// 获取歌词所需的歌曲信息。
///
/// `song_id` 的含义取决于提供商：QQ 音乐与网易云为歌曲 ID，酷狗为文件哈希。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsQuery {
    /// 提供商内的歌曲标识。
    pub song_id: String,
    /// 歌曲名。
    pub title: String,
    /// 歌手名。
    pub artist: String,
    /// 专辑名。
    pub album: String,
    /// 歌曲时长（毫秒），未知时为 0。
    pub duration_ms: u64,
}

impl LyricsQuery {
    /// 以歌曲标识创建查询。
    pub fn new(song_id: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            ..Default::default()
        }
    }

    /// 设置歌曲名。
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// 设置歌手名。
    #[must_use]
    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// 设置专辑名。
    #[must_use]
    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    /// 设置时长。
    #[must_use]
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// 关键词搜索得到的一首歌曲。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 结果来自哪个提供商。
    pub provider: ProviderId,
    /// 提供商内的歌曲标识，可直接用于获取歌词。
    pub song_id: String,
    /// 歌曲名。
    pub title: String,
    /// 歌手列表。
    pub artists: Vec<String>,
    /// 专辑名。
    pub album: String,
    /// 时长（毫秒）。
    pub duration_ms: u64,
    /// 该提供商歌词通常的时间粒度。
    pub lyrics_type: LyricsType,
}

impl SearchResult {
    /// 转换为获取歌词的查询，多个歌手以 `、` 连接。
    #[must_use]
    pub fn to_query(&self) -> LyricsQuery {
        LyricsQuery::new(self.song_id.clone())
            .title(self.title.clone())
            .artist(self.artists.join("、"))
            .album(self.album.clone())
            .duration_ms(self.duration_ms)
    }
}

/// 签名或加密后、可以直接发送的请求内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedRequest {
    /// 附带 `signature` 的查询参数（酷狗）。
    Query(Vec<(String, String)>),
    /// eapi 表单，字段 `params` 为十六进制密文（网易云）。
    EapiForm {
        /// 十六进制大写的密文。
        params: String,
    },
    /// JSON 请求体（QQ 音乐）。
    JsonBody(String),
}

/// 定义了所有音乐平台提供商需要实现的通用接口。
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// 提供商标识。
    fn id(&self) -> ProviderId;

    /// 获取候选歌词字段，按优先级排列。
    ///
    /// 找不到歌词时返回空列表而不是错误。
    async fn fetch_lyric_fields(&self, query: &LyricsQuery) -> Result<Vec<RawField>>;

    /// 按关键词搜索歌曲。
    ///
    /// 没有结果时返回空列表而不是错误。
    async fn search_songs(&self, keyword: &str) -> Result<Vec<SearchResult>>;
}

/// 把 JSON 对象中的标量值展开为字符串映射，供签名使用。
pub(crate) fn flatten_params(params: &serde_json::Value) -> BTreeMap<String, String> {
    params
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_params() {
        let params = flatten_params(&json!({"b": 1, "a": "x", "c": true}));
        assert_eq!(
            params.into_iter().collect::<Vec<_>>(),
            vec![
                ("a".to_string(), "x".to_string()),
                ("b".to_string(), "1".to_string()),
                ("c".to_string(), "true".to_string()),
            ]
        );
        assert!(flatten_params(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_search_result_to_query() {
        let result = SearchResult {
            provider: ProviderId::Kugou,
            song_id: "ABC".into(),
            title: "晴天".into(),
            artists: vec!["周杰伦".into(), "某人".into()],
            album: "叶惠美".into(),
            duration_ms: 269_000,
            lyrics_type: LyricsType::Verbatim,
        };

        assert_eq!(
            result.to_query(),
            LyricsQuery::new("ABC")
                .title("晴天")
                .artist("周杰伦、某人")
                .album("叶惠美")
                .duration_ms(269_000)
        );
    }
}
