#![warn(missing_docs)]

//! # Lyrics Codec RS
//!
//! 一个 Rust 库，用于还原各音乐平台加密或压缩过的歌词，为平台请求签名，
//! 并把不同的时间轴标记规范化为统一的歌词文档。
//!
//! ## 主要功能
//!
//! - **歌词解密**: QQ 音乐 QRC（TripleDES + zlib）、QMC1、酷狗 KRC。
//! - **请求签名**: 酷狗 MD5 签名、网易云 eapi 加密信封、QQ 音乐请求体。
//! - **格式规范化**: KRC、QRC、YRC、LRC 与纯文本统一为 [`CanonicalLyricDocument`]，可输出 LRC。
//! - **歌词获取**: 通过可替换的 [`Transport`](transport::Transport) 完成“请求 → 解码 → 规范化”。
//! - **歌曲搜索**: 按关键词在各提供商搜索歌曲，或按歌名与歌手自动选择最合适的歌词。
//!
//! ## 解码字段
//!
//! ```rust
//! use lyrics_codec_rs::{LyricsCodec, ProviderId, RawField};
//!
//! let codec = LyricsCodec::new();
//! let field = RawField::text("lrc", "[00:01.00]你好\n[00:02.50]世界");
//! let document = codec.decode_lyric_field(ProviderId::Netease, &field).unwrap();
//! assert_eq!(document.lines().len(), 2);
//! ```
//!
//! ## 获取歌词
//!
//! ```rust,no_run
//! use lyrics_codec_rs::{FetcherConfig, LyricsFetcher, ProviderId, providers::LyricsQuery};
//!
//! async {
//!     let fetcher = LyricsFetcher::new(FetcherConfig::default()).unwrap();
//!     let query = LyricsQuery::new("186016").title("晴天").artist("周杰伦");
//!     match fetcher.fetch(ProviderId::Netease, &query).await {
//!         Ok(Some(lyrics)) => println!("获取歌词成功！共 {} 行。", lyrics.document.lines().len()),
//!         Ok(None) => println!("未找到任何可用的歌词。"),
//!         Err(e) => eprintln!("发生错误: {}", e),
//!     }
//! };
//! ```
pub mod config;
pub mod converter;
pub mod crypto;
pub mod decipher;
pub mod decoder;
pub mod error;
pub mod model;
pub mod providers;
pub mod transport;

use std::{collections::HashSet, sync::Arc};

use futures::future;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub use crate::{
    config::FetcherConfig,
    decoder::{DecodeStrategy, DecodedLyrics, FieldEncoding, RawField},
    error::{CipherError, LyricsCodecError, Result},
    model::{
        lyric::{CanonicalLyricDocument, LyricMarkup, LyricsType},
        provider::ProviderId,
    },
    providers::{LyricsQuery, SearchResult, SignedRequest},
};

use crate::{
    crypto::des::DesEngine,
    decoder::DecodeOrchestrator,
    providers::{
        LyricsProvider, flatten_params,
        kugou::{
            KugouClient,
            signature::{KugouSalt, sign_query},
        },
        netease::{
            LYRIC_API_PATH, NeteaseClient, eapi,
            session::{CachedSessionProvider, SessionProvider},
        },
        qq::{self, QQMusic},
    },
    transport::{ReqwestTransport, Transport},
};

// ==========================================================
//  顶层 API
// ==========================================================

/// 无网络的编解码入口：字段解码、请求签名、响应解密。
///
/// 内部持有一个 DES 引擎（及其轮密钥缓存），可以在多个线程间共享。
#[derive(Debug, Default)]
pub struct LyricsCodec {
    decoder: DecodeOrchestrator,
    kugou_salt: KugouSalt,
}

impl LyricsCodec {
    /// 创建一个新的 `LyricsCodec`。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用外部提供的 DES 引擎。
    #[must_use]
    pub fn with_engine(engine: DesEngine) -> Self {
        Self {
            decoder: DecodeOrchestrator::with_engine(engine),
            kugou_salt: KugouSalt::default(),
        }
    }

    /// 指定酷狗签名使用的盐。
    #[must_use]
    pub fn with_kugou_salt(mut self, salt: KugouSalt) -> Self {
        self.kugou_salt = salt;
        self
    }

    /// 内部的解码编排器。
    #[must_use]
    pub fn decoder(&self) -> &DecodeOrchestrator {
        &self.decoder
    }

    /// 解码单个歌词字段并规范化。
    ///
    /// # 错误
    ///
    /// 所有策略都失败时返回 [`LyricsCodecError::DecodeFailure`]。
    pub fn decode_lyric_field(
        &self,
        provider: ProviderId,
        field: &RawField,
    ) -> Result<CanonicalLyricDocument> {
        self.decoder.decode_lyric_field(provider, field)
    }

    /// 按顺序解码多个候选字段，第一个成功的字段胜出。
    pub fn decode_lyric_fields(
        &self,
        provider: ProviderId,
        fields: &[RawField],
    ) -> Result<DecodedLyrics> {
        self.decoder.decode_lyric_fields(provider, fields)
    }

    /// 为请求参数签名或加密。
    ///
    /// * 酷狗：参数展开为字符串后附加 `signature`；
    /// * 网易云：按歌词接口路径生成 eapi 表单；
    /// * QQ 音乐：把参数作为 `GetPlayLyricInfo` 的 `param` 包装成请求体。
    ///
    /// # 错误
    ///
    /// QMC1 没有远端接口，返回 [`LyricsCodecError::ProviderNotSupported`]。
    pub fn sign_request(&self, provider: ProviderId, params: &Value) -> Result<SignedRequest> {
        match provider {
            ProviderId::Kugou => Ok(SignedRequest::Query(sign_query(
                &flatten_params(params),
                self.kugou_salt,
            ))),
            ProviderId::Netease => self.sign_eapi_request(LYRIC_API_PATH, params),
            ProviderId::Qq => Ok(SignedRequest::JsonBody(
                qq::wrap_lyric_request(params.clone()).to_string(),
            )),
            ProviderId::Qmc1 => Err(LyricsCodecError::ProviderNotSupported(provider)),
        }
    }

    /// 为任意网易云 eapi 路径生成加密表单。
    pub fn sign_eapi_request(&self, path: &str, params: &Value) -> Result<SignedRequest> {
        Ok(SignedRequest::EapiForm {
            params: eapi::encrypt_params(path, params)?,
        })
    }

    /// 解密并解析提供商的响应，同时检查业务返回码。
    ///
    /// # 错误
    ///
    /// * 无法得到 JSON 时返回 [`LyricsCodecError::DecodeFailure`]；
    /// * 业务返回码表示失败时返回 [`LyricsCodecError::ProviderApplication`]，
    ///   网易云会话被拒绝时返回 [`LyricsCodecError::SessionExpired`]。
    pub fn decrypt_response(&self, provider: ProviderId, raw: &[u8]) -> Result<Value> {
        let parse_plain = |raw: &[u8]| -> Result<Value> {
            serde_json::from_slice(raw.trim_ascii()).map_err(|e| {
                LyricsCodecError::DecodeFailure(format!("无法解析 {provider} 的响应: {e}"))
            })
        };

        match provider {
            ProviderId::Netease => {
                let value = eapi::decrypt_response(raw)?;
                eapi::check_code(&value)?;
                Ok(value)
            }
            ProviderId::Kugou => {
                let value = parse_plain(raw)?;
                KugouClient::check_status(&value)?;
                Ok(value)
            }
            ProviderId::Qq => {
                let value = parse_plain(raw)?;
                QQMusic::check_code(&value)?;
                Ok(value)
            }
            ProviderId::Qmc1 => Err(LyricsCodecError::ProviderNotSupported(provider)),
        }
    }
}

/// 获取到的歌词及其来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLyrics {
    /// 歌词来源提供商。
    pub provider: ProviderId,
    /// 提供商内的歌曲标识。
    pub song_id: String,
    /// 产生结果的响应字段。
    pub field: String,
    /// 产生结果的解码策略。
    pub strategy: DecodeStrategy,
    /// 歌词的时间粒度。
    pub lyrics_type: LyricsType,
    /// 解码出的原始文本。
    pub text: String,
    /// 规范化文档。
    pub document: CanonicalLyricDocument,
}

impl FetchedLyrics {
    fn from_decoded(song_id: &str, decoded: DecodedLyrics) -> Self {
        Self {
            lyrics_type: decoded.lyrics_type(),
            provider: decoded.provider,
            song_id: song_id.to_string(),
            field: decoded.field,
            strategy: decoded.strategy,
            text: decoded.text,
            document: decoded.document,
        }
    }

    /// 渲染为 LRC 文本。
    #[must_use]
    pub fn to_lrc(&self) -> String {
        self.document.to_lrc()
    }
}

/// 顶层歌词获取客户端：请求 → 传输 → 解码 → 规范化。
///
/// 这是与本库交互的主要入口点。
pub struct LyricsFetcher {
    codec: LyricsCodec,
    providers: Vec<Box<dyn LyricsProvider>>,
}

impl std::fmt::Debug for LyricsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyricsFetcher")
            .field("codec", &self.codec)
            .field("providers", &self.provider_ids())
            .finish()
    }
}

impl LyricsFetcher {
    /// 使用基于 `reqwest` 的传输与配置中的会话缓存创建。
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        let sessions = Arc::new(CachedSessionProvider::from_config(&config));
        Ok(Self::with_transport(&config, transport, sessions))
    }

    /// 使用注入的传输与会话提供者创建。
    pub fn with_transport(
        config: &FetcherConfig,
        transport: Arc<dyn Transport>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        let mut providers: Vec<Box<dyn LyricsProvider>> = Vec::new();
        for id in &config.providers {
            match id {
                ProviderId::Qq => providers.push(Box::new(QQMusic::new(Arc::clone(&transport)))),
                ProviderId::Kugou => {
                    providers.push(Box::new(KugouClient::new(Arc::clone(&transport))));
                }
                ProviderId::Netease => providers.push(Box::new(NeteaseClient::new(
                    Arc::clone(&transport),
                    Arc::clone(&sessions),
                ))),
                ProviderId::Qmc1 => debug!("QMC1 没有远端接口，已跳过"),
            }
        }
        info!("已启用 {} 个歌词提供商", providers.len());

        Self {
            codec: LyricsCodec::new(),
            providers,
        }
    }

    /// 已启用的提供商，按配置顺序排列。
    #[must_use]
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// 共享的编解码器。
    #[must_use]
    pub fn codec(&self) -> &LyricsCodec {
        &self.codec
    }

    /// 从指定提供商获取歌词。
    ///
    /// 远端没有歌词，或者所有字段都无法解码时返回 `Ok(None)`。
    ///
    /// # 错误
    ///
    /// * 提供商未启用时返回 [`LyricsCodecError::ProviderNotSupported`]；
    /// * 传输错误与业务错误原样返回。
    #[instrument(skip(self, query), fields(song_id = %query.song_id))]
    pub async fn fetch(
        &self,
        provider: ProviderId,
        query: &LyricsQuery,
    ) -> Result<Option<FetchedLyrics>> {
        let Some(client) = self.providers.iter().find(|p| p.id() == provider) else {
            return Err(LyricsCodecError::ProviderNotSupported(provider));
        };

        let fields = client.fetch_lyric_fields(query).await?;
        if fields.is_empty() {
            info!("{provider} 没有返回歌词");
            return Ok(None);
        }

        match self.codec.decode_lyric_fields(provider, &fields) {
            Ok(decoded) if !decoded.document.is_empty() => {
                info!(
                    field = %decoded.field,
                    strategy = %decoded.strategy,
                    "获取歌词成功！共 {} 行。",
                    decoded.document.lines().len()
                );
                Ok(Some(FetchedLyrics::from_decoded(&query.song_id, decoded)))
            }
            Ok(_) => {
                info!("{provider} 的歌词解码后为空");
                Ok(None)
            }
            Err(e) => {
                debug!("{provider} 的歌词无法解码: {e}");
                Ok(None)
            }
        }
    }

    /// 在所有已启用的提供商中并发搜索歌曲。
    ///
    /// 结果按提供商的配置顺序拼接，同一提供商内保持远端返回的顺序，
    /// 重复的 `(提供商, 歌曲标识)` 只保留第一次出现。搜索失败的提供商会被忽略。
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Vec<SearchResult> {
        let search_futures = self
            .providers
            .iter()
            .map(|provider| provider.search_songs(keyword));
        let results_from_all_providers = future::join_all(search_futures).await;

        let mut seen_keys = HashSet::new();
        let mut combined_results = Vec::new();
        for (provider, result) in self.providers.iter().zip(results_from_all_providers) {
            match result {
                Ok(provider_results) => {
                    debug!("{} 返回 {} 条结果", provider.id(), provider_results.len());
                    combined_results.extend(
                        provider_results
                            .into_iter()
                            .filter(|r| seen_keys.insert((r.provider, r.song_id.clone()))),
                    );
                }
                Err(e) => warn!("{} 的搜索失败，将忽略此提供商的结果: {e}", provider.id()),
            }
        }

        info!("搜索完毕，收集到 {} 条结果", combined_results.len());
        combined_results
    }

    /// 按歌名与歌手自动搜索并获取歌词。
    ///
    /// 以 `"歌手 歌名"` 为关键词搜索，按提供商的配置顺序，取每个提供商的第一条结果获取歌词。
    /// 逐字歌词立即返回；否则返回第一个成功获取到的歌词。
    #[instrument(skip(self, query), fields(title = %query.title, artist = %query.artist))]
    pub async fn auto_fetch(&self, query: &LyricsQuery) -> Option<FetchedLyrics> {
        let keyword = format!("{} {}", query.artist, query.title);
        let results = self.search(keyword.trim()).await;

        let mut fallback = None;
        for provider in self.provider_ids() {
            let Some(best) = results.iter().find(|r| r.provider == provider) else {
                continue;
            };

            match self.fetch(provider, &best.to_query()).await {
                Ok(Some(lyrics)) if lyrics.lyrics_type == LyricsType::Verbatim => {
                    info!("{provider} 提供了逐字歌词，停止尝试");
                    return Some(lyrics);
                }
                Ok(Some(lyrics)) => {
                    debug!("{provider} 提供了 {} 歌词，继续寻找逐字歌词", lyrics.lyrics_type);
                    if fallback.is_none() {
                        fallback = Some(lyrics);
                    }
                }
                Ok(None) => debug!("{provider} 没有可用的歌词"),
                Err(e) => warn!("从 {provider} 获取歌词失败: {e}"),
            }
        }

        if fallback.is_none() {
            info!("所有提供商都没有可用的歌词");
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::providers::kugou::signature::signature_params;

    #[test]
    fn test_sign_request_per_provider() {
        let codec = LyricsCodec::new();
        let params = json!({"appid": 3116, "hash": "ABC"});

        let SignedRequest::Query(query) = codec.sign_request(ProviderId::Kugou, &params).unwrap()
        else {
            panic!("酷狗应返回查询参数");
        };
        assert_eq!(
            query.last().unwrap().1,
            signature_params(&flatten_params(&params), "", KugouSalt::Lite)
        );

        let SignedRequest::EapiForm { params: form } =
            codec.sign_request(ProviderId::Netease, &params).unwrap()
        else {
            panic!("网易云应返回 eapi 表单");
        };
        let (path, json) = eapi::open_request(&form).unwrap();
        assert_eq!(path, LYRIC_API_PATH);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), params);

        let SignedRequest::JsonBody(body) = codec.sign_request(ProviderId::Qq, &params).unwrap()
        else {
            panic!("QQ 音乐应返回 JSON 请求体");
        };
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["request"]["param"], params);

        assert!(matches!(
            codec.sign_request(ProviderId::Qmc1, &params),
            Err(LyricsCodecError::ProviderNotSupported(ProviderId::Qmc1))
        ));
    }

    #[test]
    fn test_decrypt_response_checks_codes() {
        let codec = LyricsCodec::new();

        let ok = codec
            .decrypt_response(ProviderId::Kugou, br#"{"status":200,"candidates":[]}"#)
            .unwrap();
        assert_eq!(ok["status"], 200);

        assert!(matches!(
            codec.decrypt_response(ProviderId::Qq, br#"{"code":2000}"#),
            Err(LyricsCodecError::ProviderApplication { code: 2000, .. })
        ));
        assert!(matches!(
            codec.decrypt_response(ProviderId::Qq, b"<html>"),
            Err(LyricsCodecError::DecodeFailure(_))
        ));
        assert!(codec
            .decrypt_response(ProviderId::Netease, br#"{"code":-460}"#)
            .unwrap_err()
            .is_session_expired());
    }
}
