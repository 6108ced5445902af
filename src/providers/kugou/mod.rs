//! 此模块实现了酷狗歌词的获取流程。
//!
//! 先用歌曲哈希、关键词和时长在 `lyrics.kugou.com/v1/search` 搜索候选歌词，
//! 再用第一个候选的 `id` 与 `accesskey` 下载 Base64 编码的 KRC 容器。
//! 两个请求都带有 MD5 签名。
//!
//! 关键词搜索歌曲使用 `complexsearch.kugou.com`，同样带签名，返回的 `FileHash` 即歌曲标识。

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, trace};

use crate::{
    crypto::md5_hex,
    decoder::RawField,
    error::{LyricsCodecError, Result},
    model::{lyric::LyricsType, provider::ProviderId},
    providers::{LyricsProvider, LyricsQuery, SearchResult},
    transport::{HttpRequest, Transport},
};

pub mod models;
pub mod signature;

use models::{Candidate, LyricDownloadResponse, SearchLyricsResponse, SearchSongResponse};
use signature::{KugouSalt, sign_query};

const LYRICS_SEARCH_URL: &str = "https://lyrics.kugou.com/v1/search";
const LYRICS_DOWNLOAD_URL: &str = "http://lyrics.kugou.com/download";
const SONG_SEARCH_URL: &str = "http://complexsearch.kugou.com/v2/search/song";
const SEARCH_USER_AGENT: &str = "Android14-1070-11070-201-0-SearchSong-wifi";
const APP_ID: &str = "3116";
const CLIENT_VER: &str = "11070";

/// 酷狗音乐的客户端实现。
#[derive(Clone)]
pub struct KugouClient {
    transport: Arc<dyn Transport>,
    salt: KugouSalt,
}

impl std::fmt::Debug for KugouClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KugouClient")
            .field("salt", &self.salt)
            .finish_non_exhaustive()
    }
}

impl KugouClient {
    /// 创建一个新的 `KugouClient`。
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            salt: KugouSalt::default(),
        }
    }

    /// 构造歌词搜索请求的参数（未签名）。
    #[must_use]
    pub fn search_params(query: &LyricsQuery, now: DateTime<Utc>) -> BTreeMap<String, String> {
        let keyword = if query.artist.is_empty() {
            query.title.clone()
        } else {
            format!("{} - {}", query.artist, query.title)
        };

        BTreeMap::from([
            ("appid".to_string(), APP_ID.to_string()),
            ("clienttime".to_string(), now.timestamp().to_string()),
            ("clientver".to_string(), CLIENT_VER.to_string()),
            ("duration".to_string(), query.duration_ms.to_string()),
            ("hash".to_string(), query.song_id.clone()),
            ("keyword".to_string(), keyword),
            (
                "mid".to_string(),
                md5_hex(now.timestamp_millis().to_string()),
            ),
            ("man".to_string(), "no".to_string()),
            ("userid".to_string(), "0".to_string()),
        ])
    }

    /// 构造歌词下载请求的参数（未签名）。
    #[must_use]
    pub fn download_params(candidate: &Candidate) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("accesskey".to_string(), candidate.accesskey.clone()),
            ("appid".to_string(), APP_ID.to_string()),
            ("charset".to_string(), "utf8".to_string()),
            ("client".to_string(), "mobi".to_string()),
            ("clientver".to_string(), CLIENT_VER.to_string()),
            ("fmt".to_string(), "krc".to_string()),
            ("id".to_string(), candidate.id.clone()),
            ("userid".to_string(), "0".to_string()),
            ("ver".to_string(), "1".to_string()),
        ])
    }

    /// 构造歌曲关键词搜索的参数（未签名）。
    #[must_use]
    pub fn song_search_params(keyword: &str, now: DateTime<Utc>) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("appid".to_string(), APP_ID.to_string()),
            ("clienttime".to_string(), now.timestamp().to_string()),
            ("clientver".to_string(), CLIENT_VER.to_string()),
            ("dfid".to_string(), "-".to_string()),
            ("keyword".to_string(), keyword.to_string()),
            (
                "mid".to_string(),
                md5_hex(now.timestamp_millis().to_string()),
            ),
            ("page".to_string(), "1".to_string()),
            ("pagesize".to_string(), "20".to_string()),
            ("platform".to_string(), "AndroidFilter".to_string()),
            ("sorttype".to_string(), "0".to_string()),
            ("userid".to_string(), "0".to_string()),
            ("uuid".to_string(), "-".to_string()),
        ])
    }

    /// 构造签名后的歌曲搜索请求。
    #[must_use]
    pub fn song_search_request(&self, keyword: &str, now: DateTime<Utc>) -> HttpRequest {
        HttpRequest::get(SONG_SEARCH_URL)
            .with_query(sign_query(&Self::song_search_params(keyword, now), self.salt))
            .header("User-Agent", SEARCH_USER_AGENT)
            .header("KG-RC", "1")
            .header("KG-Thrift-Client", "1")
    }

    /// 构造签名后的歌词搜索请求。
    #[must_use]
    pub fn search_request(&self, query: &LyricsQuery, now: DateTime<Utc>) -> HttpRequest {
        HttpRequest::get(LYRICS_SEARCH_URL)
            .with_query(sign_query(&Self::search_params(query, now), self.salt))
    }

    /// 构造签名后的歌词下载请求。
    #[must_use]
    pub fn download_request(&self, candidate: &Candidate) -> HttpRequest {
        HttpRequest::get(LYRICS_DOWNLOAD_URL)
            .with_query(sign_query(&Self::download_params(candidate), self.salt))
    }

    /// 解析搜索响应，返回第一个候选。
    pub fn parse_search_response(body: &[u8]) -> Result<Option<Candidate>> {
        let resp: SearchLyricsResponse = serde_json::from_slice(body)?;
        if resp.status != 200 {
            return Err(LyricsCodecError::ProviderApplication {
                provider: ProviderId::Kugou,
                code: resp.status,
                message: resp.err_msg.unwrap_or_default(),
            });
        }
        Ok(resp.candidates.into_iter().next())
    }

    /// 解析歌曲搜索响应。没有文件哈希的条目会被跳过。
    pub fn parse_song_search_response(body: &[u8]) -> Result<Vec<SearchResult>> {
        let resp: SearchSongResponse = serde_json::from_slice(body)?;
        if resp.status != 1 {
            return Err(LyricsCodecError::ProviderApplication {
                provider: ProviderId::Kugou,
                code: resp.err_code.unwrap_or(resp.status),
                message: resp.error.unwrap_or_default(),
            });
        }

        let songs = resp.data.map(|data| data.info).unwrap_or_default();
        Ok(songs
            .into_iter()
            .filter(|song| !song.file_hash.is_empty())
            .map(|song| SearchResult {
                provider: ProviderId::Kugou,
                song_id: song.file_hash,
                title: song.song_name,
                artists: song
                    .singer_name
                    .split('、')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect(),
                album: song.album_name,
                duration_ms: song.duration * 1000,
                lyrics_type: LyricsType::Verbatim,
            })
            .collect())
    }

    /// 解析下载响应，返回候选歌词字段。
    pub fn parse_download_response(body: &[u8]) -> Result<Vec<RawField>> {
        let resp: LyricDownloadResponse = serde_json::from_slice(body)?;
        if resp.status != 200 {
            return Err(LyricsCodecError::ProviderApplication {
                provider: ProviderId::Kugou,
                code: resp.status,
                message: resp.info.unwrap_or_default(),
            });
        }
        if resp.content.is_empty() {
            return Ok(Vec::new());
        }
        debug!(fmt = %resp.fmt, len = resp.content.len(), "已下载酷狗歌词");
        Ok(vec![RawField::base64(resp.fmt, resp.content)])
    }

    /// 检查任意酷狗 JSON 响应的 `status` 字段。
    pub fn check_status(value: &serde_json::Value) -> Result<()> {
        let Some(status) = value.get("status").and_then(serde_json::Value::as_i64) else {
            return Ok(());
        };
        if status == 200 {
            return Ok(());
        }
        let message = ["errmsg", "info", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
            .unwrap_or_default()
            .to_string();
        Err(LyricsCodecError::ProviderApplication {
            provider: ProviderId::Kugou,
            code: status,
            message,
        })
    }

    async fn get_json(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let url = request.url.clone();
        let response = self.transport.send(request).await?.error_for_status()?;
        trace!(
            url,
            response.body = %String::from_utf8_lossy(&response.body),
            "原始 JSON 响应"
        );
        Ok(response.body)
    }
}

#[async_trait]
impl LyricsProvider for KugouClient {
    fn id(&self) -> ProviderId {
        ProviderId::Kugou
    }

    #[instrument(skip(self, query), fields(hash = %query.song_id))]
    async fn fetch_lyric_fields(&self, query: &LyricsQuery) -> Result<Vec<RawField>> {
        let search_body = self.get_json(self.search_request(query, Utc::now())).await?;
        let Some(candidate) = Self::parse_search_response(&search_body)? else {
            info!("酷狗没有找到候选歌词");
            return Ok(Vec::new());
        };

        debug!(id = %candidate.id, song = %candidate.song, "选择第一个候选歌词");
        let download_body = self.get_json(self.download_request(&candidate)).await?;
        Self::parse_download_response(&download_body)
    }

    #[instrument(skip(self))]
    async fn search_songs(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        let body = self
            .get_json(self.song_search_request(keyword, Utc::now()))
            .await?;
        let results = Self::parse_song_search_response(&body)?;
        debug!(count = results.len(), "酷狗搜索完成");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::providers::kugou::signature::signature_params;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 15, 13, 20, 0).unwrap()
    }

    #[test]
    fn test_search_request_is_signed_deterministically() {
        let client = KugouClient::new(Arc::new(crate::transport::ReqwestTransport::from_client(
            reqwest::Client::new(),
        )));
        let query = LyricsQuery::new("ABCDEF")
            .title("歌名")
            .artist("歌手")
            .duration_ms(215_000);

        let first = client.search_request(&query, fixed_now());
        let second = client.search_request(&query, fixed_now());
        assert_eq!(first, second);

        assert_eq!(first.query_value("keyword"), Some("歌手 - 歌名"));
        assert_eq!(first.query_value("clienttime"), Some("1678886400"));
        assert_eq!(first.query_value("hash"), Some("ABCDEF"));

        let params = KugouClient::search_params(&query, fixed_now());
        assert_eq!(
            first.query_value("signature"),
            Some(signature_params(&params, "", KugouSalt::Lite).as_str())
        );
    }

    #[test]
    fn test_parse_search_response() {
        let body = br#"{"status":200,"errmsg":"","candidates":[{"id":12345,"accesskey":"AK","singer":"s","song":"t"},{"id":"2","accesskey":"B"}]}"#;
        let candidate = KugouClient::parse_search_response(body).unwrap().unwrap();
        assert_eq!(candidate.id, "12345");
        assert_eq!(candidate.accesskey, "AK");

        let empty = br#"{"status":200,"candidates":[]}"#;
        assert!(KugouClient::parse_search_response(empty).unwrap().is_none());

        let failed = br#"{"status":404,"errmsg":"not found"}"#;
        assert!(matches!(
            KugouClient::parse_search_response(failed),
            Err(LyricsCodecError::ProviderApplication { code: 404, .. })
        ));
    }

    #[test]
    fn test_song_search_request() {
        let client = KugouClient::new(Arc::new(crate::transport::ReqwestTransport::from_client(
            reqwest::Client::new(),
        )));
        let request = client.song_search_request("周杰伦 晴天", fixed_now());

        assert_eq!(request.url, SONG_SEARCH_URL);
        assert_eq!(request.query_value("keyword"), Some("周杰伦 晴天"));
        assert_eq!(request.query_value("platform"), Some("AndroidFilter"));
        assert!(
            request
                .headers
                .contains(&("KG-Thrift-Client".to_string(), "1".to_string())),
            "搜索请求应带有 KG-Thrift-Client 头"
        );

        let params = KugouClient::song_search_params("周杰伦 晴天", fixed_now());
        assert_eq!(
            request.query_value("signature"),
            Some(signature_params(&params, "", KugouSalt::Lite).as_str())
        );
    }

    #[test]
    fn test_parse_song_search_response() {
        let body = r#"{"status":1,"error_code":0,"data":{"lists":[
            {"FileHash":"ABC","SongName":"晴天","SingerName":"周杰伦、某人","AlbumName":"叶惠美","Duration":269},
            {"FileHash":"","SongName":"无哈希"}
        ]}}"#;
        let results = KugouClient::parse_song_search_response(body.as_bytes()).unwrap();

        assert_eq!(results.len(), 1, "没有哈希的条目应被跳过");
        assert_eq!(results[0].song_id, "ABC");
        assert_eq!(results[0].artists, ["周杰伦", "某人"]);
        assert_eq!(results[0].duration_ms, 269_000);
        assert_eq!(results[0].lyrics_type, LyricsType::Verbatim);

        let failed = br#"{"status":0,"error_code":20010,"error_msg":"sign error"}"#;
        assert!(matches!(
            KugouClient::parse_song_search_response(failed),
            Err(LyricsCodecError::ProviderApplication { code: 20010, .. })
        ));
    }

    #[test]
    fn test_parse_download_response() {
        let body = br#"{"status":200,"info":"OK","fmt":"krc","content":"a3JjMQ=="}"#;
        let fields = KugouClient::parse_download_response(body).unwrap();
        assert_eq!(fields, vec![RawField::base64("krc", "a3JjMQ==")]);

        let empty = br#"{"status":200,"fmt":"krc","content":""}"#;
        assert!(KugouClient::parse_download_response(empty).unwrap().is_empty());
    }

    #[test]
    fn test_check_status() {
        assert!(KugouClient::check_status(&serde_json::json!({"status": 200})).is_ok());
        let err = KugouClient::check_status(&serde_json::json!({"status": 0, "info": "bad"}))
            .unwrap_err();
        assert!(matches!(
            err,
            LyricsCodecError::ProviderApplication { code: 0, ref message, .. } if message == "bad"
        ));
    }
}
