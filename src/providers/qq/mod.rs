//! 此模块实现了 QQ 音乐歌词的获取流程。
//!
//! 歌词通过 `musicu.fcg` 的 `GetPlayLyricInfo` 接口获取：
//! `qrc` 字段是十六进制编码的 TripleDES 密文，`lyric` 字段是 Base64 编码的 LRC。
//! 关键词搜索走同一个入口的 `DoSearchForQQMusicLite` 接口。

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{Value, json};
use tracing::{debug, instrument, trace};

use crate::{
    decoder::RawField,
    error::{LyricsCodecError, Result},
    model::{lyric::LyricsType, provider::ProviderId},
    providers::{LyricsProvider, LyricsQuery, SearchResult},
    transport::{HttpRequest, Transport},
};

pub mod models;

use models::{MusicuResponse, SearchResponse};

const MUSIC_U_FCG_URL: &str = "https://u.y.qq.com/cgi-bin/musicu.fcg";
const GET_LYRIC_MODULE: &str = "music.musichallSong.PlayLyricInfo";
const GET_LYRIC_METHOD: &str = "GetPlayLyricInfo";
const SEARCH_MODULE: &str = "music.search.SearchCgiService";
const SEARCH_METHOD: &str = "DoSearchForQQMusicLite";

/// QQ 音乐的客户端实现。
#[derive(Clone)]
pub struct QQMusic {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for QQMusic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QQMusic").finish_non_exhaustive()
    }
}

fn build_comm() -> Value {
    json!({
        "ct": 11,
        "cv": "1003006",
        "v": "1003006",
        "tmeAppID": "qqmusiclight",
        "nettype": "NETWORK_WIFI",
        "udid": "0"
    })
}

fn wrap_request(module: &str, method: &str, param: Value) -> Value {
    json!({
        "comm": build_comm(),
        "request": {
            "method": method,
            "module": module,
            "param": param,
        }
    })
}

/// 用 `comm` 与 `request` 包装一个 `GetPlayLyricInfo` 的 `param` 对象。
#[must_use]
pub fn wrap_lyric_request(param: Value) -> Value {
    wrap_request(GET_LYRIC_MODULE, GET_LYRIC_METHOD, param)
}

impl QQMusic {
    /// 创建一个新的 `QQMusic` 客户端。
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 构造歌词请求体。
    ///
    /// # 错误
    ///
    /// 歌曲 ID 不是数字时返回 [`LyricsCodecError::Parser`]。
    pub fn build_lyric_request_body(query: &LyricsQuery) -> Result<Value> {
        let song_id: u64 = query.song_id.trim().parse().map_err(|e| {
            LyricsCodecError::Parser(format!("QQ 音乐歌曲 ID '{}' 无效: {e}", query.song_id))
        })?;
        let encode = |s: &str| general_purpose::STANDARD.encode(s);

        Ok(wrap_lyric_request(json!({
            "songID": song_id,
            "songName": encode(&query.title),
            "albumName": encode(&query.album),
            "singerName": encode(&query.artist),
            "qrc": 1,
            "qrc_t": 0,
            "trans": 1,
            "trans_t": 0,
            "type": 0,
        })))
    }

    /// 构造可直接发送的歌词请求。
    pub fn lyric_request(query: &LyricsQuery) -> Result<HttpRequest> {
        let body = serde_json::to_vec(&Self::build_lyric_request_body(query)?)?;
        Ok(HttpRequest::post(MUSIC_U_FCG_URL, body).header("Content-Type", "application/json"))
    }

    /// 构造关键词搜索请求体。
    #[must_use]
    pub fn build_search_request_body(keyword: &str) -> Value {
        wrap_request(
            SEARCH_MODULE,
            SEARCH_METHOD,
            json!({
                "search_id": rand::random::<u64>().to_string(),
                "remoteplace": "search.android.keyboard",
                "query": keyword,
                "search_type": 0,
                "num_per_page": 20,
                "page_num": 1,
                "highlight": 0,
                "nqc_flag": 0,
                "page_id": 1,
                "grp": 1,
            }),
        )
    }

    /// 构造可直接发送的搜索请求。
    pub fn search_request(keyword: &str) -> Result<HttpRequest> {
        let body = serde_json::to_vec(&Self::build_search_request_body(keyword))?;
        Ok(HttpRequest::post(MUSIC_U_FCG_URL, body).header("Content-Type", "application/json"))
    }

    /// 解析搜索响应。歌曲 ID 为 `0` 的条目会被跳过。
    pub fn parse_search_response(body: &[u8]) -> Result<Vec<SearchResult>> {
        let value: Value = serde_json::from_slice(body)?;
        Self::check_code(&value)?;
        let resp: SearchResponse = serde_json::from_value(value)?;

        let songs = resp
            .request
            .map(|r| r.data.body.item_song)
            .unwrap_or_default();
        Ok(songs
            .into_iter()
            .filter(|song| song.id != 0)
            .map(|song| SearchResult {
                provider: ProviderId::Qq,
                song_id: song.id.to_string(),
                title: if song.title.is_empty() {
                    song.name
                } else {
                    song.title
                },
                artists: song.singer.into_iter().map(|s| s.name).collect(),
                album: song.album.name,
                duration_ms: song.interval * 1000,
                lyrics_type: LyricsType::Verbatim,
            })
            .collect())
    }

    async fn post_json(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let response = self.transport.send(request).await?.error_for_status()?;
        trace!(
            response.body = %String::from_utf8_lossy(&response.body),
            "原始 JSON 响应"
        );
        Ok(response.body)
    }

    /// 检查响应 JSON 顶层与 `request` 中的 `code` 字段。
    pub fn check_code(value: &Value) -> Result<()> {
        let top = value.get("code").and_then(Value::as_i64).unwrap_or(0);
        let request = value
            .pointer("/request/code")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let code = if top != 0 { top } else { request };
        if code == 0 {
            return Ok(());
        }
        Err(LyricsCodecError::ProviderApplication {
            provider: ProviderId::Qq,
            code,
            message: "musicu.fcg 请求返回错误".to_string(),
        })
    }

    /// 解析歌词响应。`qrc` 字段排在 `lyric` 之前。
    ///
    /// # 错误
    ///
    /// 顶层或请求级的 `code` 非 `0` 时返回 [`LyricsCodecError::ProviderApplication`]。
    pub fn parse_lyric_response(body: &[u8]) -> Result<Vec<RawField>> {
        let value: Value = serde_json::from_slice(body)?;
        Self::check_code(&value)?;
        let resp: MusicuResponse = serde_json::from_value(value)?;

        let Some(data) = resp.request.map(|r| r.data) else {
            return Ok(Vec::new());
        };
        let mut fields = Vec::with_capacity(2);
        if !data.qrc.trim().is_empty() {
            fields.push(RawField::hex("qrc", data.qrc));
        }
        if !data.lyric.trim().is_empty() {
            fields.push(RawField::base64("lyric", data.lyric));
        }
        Ok(fields)
    }
}

#[async_trait]
impl LyricsProvider for QQMusic {
    fn id(&self) -> ProviderId {
        ProviderId::Qq
    }

    #[instrument(skip(self, query), fields(song_id = %query.song_id))]
    async fn fetch_lyric_fields(&self, query: &LyricsQuery) -> Result<Vec<RawField>> {
        let body = self.post_json(Self::lyric_request(query)?).await?;
        let fields = Self::parse_lyric_response(&body)?;
        debug!(field_count = fields.len(), "已获取 QQ 音乐歌词字段");
        Ok(fields)
    }

    #[instrument(skip(self))]
    async fn search_songs(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        let body = self.post_json(Self::search_request(keyword)?).await?;
        let results = Self::parse_search_response(&body)?;
        debug!(count = results.len(), "QQ 音乐搜索完成");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyric_request_body() {
        let query = LyricsQuery::new("312214056")
            .title("目及皆是你")
            .artist("小蓝背心");
        let body = QQMusic::build_lyric_request_body(&query).unwrap();

        assert_eq!(body["comm"]["tmeAppID"], "qqmusiclight");
        assert_eq!(body["request"]["method"], "GetPlayLyricInfo");
        let param = &body["request"]["param"];
        assert_eq!(param["songID"], 312_214_056_u64);
        assert_eq!(param["qrc"], 1);
        assert_eq!(param["trans"], 1);
        assert_eq!(param["albumName"], "");
        assert_eq!(
            general_purpose::STANDARD
                .decode(param["songName"].as_str().unwrap())
                .unwrap(),
            "目及皆是你".as_bytes()
        );

        assert!(QQMusic::build_lyric_request_body(&LyricsQuery::new("003dmKuv")).is_err());
    }

    #[test]
    fn test_parse_lyric_response() {
        let body = br#"{"code":0,"request":{"code":0,"data":{"qrc":"0A0B","lyric":"WzAwOjAxLjAwXWE="}}}"#;
        let fields = QQMusic::parse_lyric_response(body).unwrap();
        assert_eq!(
            fields,
            vec![
                RawField::hex("qrc", "0A0B"),
                RawField::base64("lyric", "WzAwOjAxLjAwXWE=")
            ]
        );

        let empty = br#"{"code":0,"request":{"code":0,"data":{"qrc":"","lyric":""}}}"#;
        assert!(QQMusic::parse_lyric_response(empty).unwrap().is_empty());
    }

    #[test]
    fn test_search_request_body() {
        let body = QQMusic::build_search_request_body("周杰伦 晴天");

        assert_eq!(body["request"]["module"], "music.search.SearchCgiService");
        assert_eq!(body["request"]["method"], "DoSearchForQQMusicLite");
        let param = &body["request"]["param"];
        assert_eq!(param["query"], "周杰伦 晴天");
        assert_eq!(param["num_per_page"], 20);
        assert!(
            param["search_id"]
                .as_str()
                .unwrap()
                .chars()
                .all(|c| c.is_ascii_digit()),
            "search_id 应为纯数字字符串"
        );
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{"code":0,"request":{"code":0,"data":{"body":{"item_song":[
            {"id":97773,"mid":"0039MnYb0qxYhV","name":"晴天","title":"晴天","singer":[{"name":"周杰伦"}],"album":{"name":"叶惠美"},"interval":269},
            {"id":0,"name":"无效"},
            {"id":1,"name":"只有 name"}
        ]}}}}"#;
        let results = QQMusic::parse_search_response(body.as_bytes()).unwrap();

        assert_eq!(results.len(), 2, "ID 为 0 的条目应被跳过");
        assert_eq!(results[0].song_id, "97773");
        assert_eq!(results[0].artists, ["周杰伦"]);
        assert_eq!(results[0].album, "叶惠美");
        assert_eq!(results[0].duration_ms, 269_000);
        assert_eq!(results[1].title, "只有 name");

        let empty = br#"{"code":0,"request":{"code":0,"data":{}}}"#;
        assert!(QQMusic::parse_search_response(empty).unwrap().is_empty());
    }

    #[test]
    fn test_request_level_error_code() {
        let body = br#"{"code":0,"request":{"code":104400,"data":{}}}"#;
        let err = QQMusic::parse_lyric_response(body).unwrap_err();
        assert!(matches!(
            err,
            LyricsCodecError::ProviderApplication {
                provider: ProviderId::Qq,
                code: 104_400,
                ..
            }
        ));
    }
}
