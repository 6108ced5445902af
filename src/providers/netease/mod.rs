//! 此模块实现了网易云音乐歌词的获取流程。
//! API 来源于 <https://github.com/NeteaseCloudMusicApiReborn/api>
//!
//! 请求参数经 eapi 加密后以表单字段 `params` 发送，响应同样可能是 eapi 密文。
//! 会话由注入的 [`SessionProvider`] 提供，每次请求只使用一个快照；
//! 远端拒绝会话时续期一次并重试。歌词与关键词搜索共用这一流程。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, instrument, trace, warn};

use crate::{
    decoder::RawField,
    error::Result,
    model::{lyric::LyricsType, provider::ProviderId},
    providers::{LyricsProvider, LyricsQuery, SearchResult},
    transport::{HttpRequest, Transport},
};

pub mod eapi;
pub mod models;
pub mod session;

use models::{LyricResult, SearchPageResult};
use session::{DESKTOP_APP_VERSION, ProviderSession, SessionProvider};

/// 歌词接口的 eapi 路径，参与摘要计算。
pub const LYRIC_API_PATH: &str = "/api/song/lyric/v1";
const LYRIC_API_URL: &str = "https://interface.music.163.com/eapi/song/lyric/v1";
/// 歌曲搜索接口的 eapi 路径。
pub const SEARCH_API_PATH: &str = "/api/search/song/list/page";
const SEARCH_API_URL: &str = "https://interface.music.163.com/eapi/search/song/list/page";
const BASE_URL_NETEASE: &str = "https://music.163.com";

/// 网易云音乐的客户端实现。
#[derive(Clone)]
pub struct NeteaseClient {
    transport: Arc<dyn Transport>,
    sessions: Arc<dyn SessionProvider>,
}

impl std::fmt::Debug for NeteaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeteaseClient").finish_non_exhaustive()
    }
}

fn user_agent() -> String {
    format!("NeteaseMusicDesktop/{DESKTOP_APP_VERSION}")
}

fn new_request_id() -> String {
    format!(
        "{}_{:04}",
        Utc::now().timestamp_millis(),
        rand::random::<u16>() % 1000
    )
}

impl NeteaseClient {
    /// 创建一个新的 `NeteaseClient`。
    pub fn new(transport: Arc<dyn Transport>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            transport,
            sessions,
        }
    }

    /// 歌词接口的请求参数。
    #[must_use]
    pub fn lyric_payload(song_id: &str, session: &ProviderSession, request_id: &str) -> Value {
        json!({
            "id": song_id,
            "lv": -1,
            "tv": -1,
            "rv": -1,
            "kv": -1,
            "yv": -1,
            "e_r": true,
            "header": Value::Object(session.eapi_header(request_id)).to_string(),
        })
    }

    /// 歌曲搜索接口的请求参数。
    #[must_use]
    pub fn search_payload(keyword: &str, session: &ProviderSession, request_id: &str) -> Value {
        json!({
            "limit": 20,
            "offset": 0,
            "keyword": keyword,
            "scene": "NORMAL",
            "needCorrect": true,
            "e_r": true,
            "header": Value::Object(session.eapi_header(request_id)).to_string(),
        })
    }

    fn eapi_request(
        url: &str,
        path: &str,
        payload: &Value,
        session: &ProviderSession,
        request_id: &str,
    ) -> Result<HttpRequest> {
        let params = eapi::encrypt_params(path, payload)?;

        Ok(HttpRequest::post(url, format!("params={params}"))
            .header("User-Agent", user_agent())
            .header("Referer", BASE_URL_NETEASE)
            .header("Cookie", session.cookie(request_id))
            .header("Content-Type", "application/x-www-form-urlencoded"))
    }

    /// 构造加密后的歌词请求。
    pub fn lyric_request(
        song_id: &str,
        session: &ProviderSession,
        request_id: &str,
    ) -> Result<HttpRequest> {
        let payload = Self::lyric_payload(song_id, session, request_id);
        Self::eapi_request(LYRIC_API_URL, LYRIC_API_PATH, &payload, session, request_id)
    }

    /// 构造加密后的歌曲搜索请求。
    pub fn search_request(
        keyword: &str,
        session: &ProviderSession,
        request_id: &str,
    ) -> Result<HttpRequest> {
        let payload = Self::search_payload(keyword, session, request_id);
        Self::eapi_request(SEARCH_API_URL, SEARCH_API_PATH, &payload, session, request_id)
    }

    /// 解析歌词响应，逐字歌词优先于逐行歌词。
    ///
    /// # 错误
    ///
    /// 业务码非 `200` 时返回相应错误，会话被拒绝时为
    /// [`LyricsCodecError::SessionExpired`](crate::error::LyricsCodecError::SessionExpired)。
    pub fn parse_lyric_response(body: &[u8]) -> Result<Vec<RawField>> {
        let value = eapi::decrypt_response(body)?;
        trace!(response = %value, "网易云歌词响应");
        eapi::check_code(&value)?;

        let result: LyricResult = serde_json::from_value(value)?;
        let mut fields = Vec::with_capacity(2);
        if let Some(yrc) = result.yrc_lyric() {
            fields.push(RawField::text("yrc", yrc));
        }
        if let Some(lrc) = result.lrc_lyric() {
            fields.push(RawField::text("lrc", lrc));
        }
        Ok(fields)
    }

    /// 解析歌曲搜索响应。歌曲 ID 为 `0` 的条目会被跳过。
    pub fn parse_search_response(body: &[u8]) -> Result<Vec<SearchResult>> {
        let value = eapi::decrypt_response(body)?;
        trace!(response = %value, "网易云搜索响应");
        eapi::check_code(&value)?;

        let result: SearchPageResult = serde_json::from_value(value)?;
        let resources = result.data.map(|d| d.resources).unwrap_or_default();
        Ok(resources
            .into_iter()
            .filter_map(|r| r.base_info.and_then(|info| info.simple_song_data))
            .filter(|song| song.id != 0)
            .map(|song| SearchResult {
                provider: ProviderId::Netease,
                song_id: song.id.to_string(),
                title: song.name,
                artists: song.ar.into_iter().map(|a| a.name).collect(),
                album: song.al.map(|al| al.name).unwrap_or_default(),
                duration_ms: song.dt,
                lyrics_type: LyricsType::LineByLine,
            })
            .collect())
    }

    /// 用当前会话发送请求；会话被拒绝时续期一次并重试。
    async fn send_with_renewal<T, B>(&self, build: B, parse: fn(&[u8]) -> Result<T>) -> Result<T>
    where
        B: Fn(&ProviderSession, &str) -> Result<HttpRequest> + Sync,
    {
        let session = self.sessions.current()?;

        match self.send_once(&build, &session, parse).await {
            Err(e) if e.is_session_expired() => {
                warn!("网易云会话被拒绝，续期后重试: {e}");
                let renewed = self.sessions.renew()?;
                debug!(device_id = %renewed.device_id, "使用新会话重试");
                self.send_once(&build, &renewed, parse).await
            }
            other => other,
        }
    }

    async fn send_once<T, B>(
        &self,
        build: &B,
        session: &ProviderSession,
        parse: fn(&[u8]) -> Result<T>,
    ) -> Result<T>
    where
        B: Fn(&ProviderSession, &str) -> Result<HttpRequest> + Sync,
    {
        let request = build(session, &new_request_id())?;
        let response = self.transport.send(request).await?.error_for_status()?;
        parse(&response.body)
    }
}

#[async_trait]
impl LyricsProvider for NeteaseClient {
    fn id(&self) -> ProviderId {
        ProviderId::Netease
    }

    #[instrument(skip(self, query), fields(song_id = %query.song_id))]
    async fn fetch_lyric_fields(&self, query: &LyricsQuery) -> Result<Vec<RawField>> {
        self.send_with_renewal(
            |session, request_id| Self::lyric_request(&query.song_id, session, request_id),
            Self::parse_lyric_response,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn search_songs(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        let results = self
            .send_with_renewal(
                |session, request_id| Self::search_request(keyword, session, request_id),
                Self::parse_search_response,
            )
            .await?;
        debug!(count = results.len(), "网易云搜索完成");
        Ok(results)
    }
}
