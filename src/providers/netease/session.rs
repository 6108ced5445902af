//! 网易云音乐的会话状态。
//!
//! 会话包含设备标识与 eapi 请求头字段，生成后带有效期缓存，可选地持久化到磁盘。
//! 续期时整体替换，已经取出的快照不受影响。

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::{
    config::{self, FetcherConfig},
    error::Result,
};

/// 默认的会话有效期（小时）。
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// 桌面客户端版本。
pub const DESKTOP_APP_VERSION: &str = "3.1.3.203419";

/// eapi 请求头中除设备标识与请求 ID 之外的字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EapiSigningFields {
    /// 操作系统标识，桌面端为 `pc`。
    pub os: String,
    /// 客户端版本。
    pub appver: String,
    /// 客户端版本号。
    pub versioncode: String,
    /// 操作系统版本。
    pub osver: String,
    /// 设备型号。
    pub mobilename: String,
    /// 构建时间戳。
    pub buildver: String,
    /// 屏幕分辨率。
    pub resolution: String,
    /// 渠道。
    pub channel: String,
    /// CSRF 令牌，匿名会话为空。
    pub csrf: String,
    /// 登录令牌，匿名会话为空。
    pub music_u: String,
}

impl EapiSigningFields {
    /// 匿名桌面客户端的字段。
    #[must_use]
    pub fn desktop(now: DateTime<Utc>) -> Self {
        Self {
            os: "pc".to_string(),
            appver: DESKTOP_APP_VERSION.to_string(),
            versioncode: "140".to_string(),
            osver: String::new(),
            mobilename: String::new(),
            buildver: now.timestamp().to_string(),
            resolution: "1920x1080".to_string(),
            channel: "netease".to_string(),
            csrf: String::new(),
            music_u: String::new(),
        }
    }
}

/// 网易云的会话快照。
///
/// 只有网易云的请求编解码器会读取其中的字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    /// 设备标识。
    pub device_id: String,
    /// eapi 请求头字段。
    pub signing: EapiSigningFields,
    /// 生成时间。
    #[serde(with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    /// 过期时间。
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    /// 登录用户 ID，匿名会话为 `None`。
    pub user_id: Option<u64>,
}

impl ProviderSession {
    /// 生成一个新的匿名会话。
    ///
    /// 时间戳截断到秒，以便持久化后无损还原。
    #[must_use]
    pub fn generate(now: DateTime<Utc>, ttl: Duration) -> Self {
        let issued_at = now.trunc_subsecs(0);
        Self {
            device_id: uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
            signing: EapiSigningFields::desktop(issued_at),
            issued_at,
            expires_at: issued_at + ttl,
            user_id: None,
        }
    }

    /// 在给定时刻是否已过期。
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 构造 eapi 请求头对象。
    #[must_use]
    pub fn eapi_header(&self, request_id: &str) -> Map<String, Value> {
        let signing = &self.signing;
        let header = json!({
            "os": signing.os,
            "appver": signing.appver,
            "versioncode": signing.versioncode,
            "osver": signing.osver,
            "deviceId": self.device_id,
            "mobilename": signing.mobilename,
            "buildver": signing.buildver,
            "resolution": signing.resolution,
            "channel": signing.channel,
            "requestId": request_id,
            "__csrf": signing.csrf,
            "MUSIC_U": signing.music_u,
        });
        match header {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// 由请求头生成 Cookie，空值会被跳过。
    #[must_use]
    pub fn cookie(&self, request_id: &str) -> String {
        self.eapi_header(request_id)
            .iter()
            .filter_map(|(k, v)| {
                v.as_str()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("{k}={s}"))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// 提供网易云会话的能力。
///
/// 调用方在每次请求开始时取一次快照，之后只使用这个快照。
pub trait SessionProvider: Send + Sync {
    /// 当前有效的会话，不存在或已过期时会自动生成。
    fn current(&self) -> Result<Arc<ProviderSession>>;

    /// 丢弃当前会话并生成新的会话。
    fn renew(&self) -> Result<Arc<ProviderSession>>;
}

/// 带有效期缓存、可选持久化的会话提供者。
#[derive(Debug)]
pub struct CachedSessionProvider {
    session: ArcSwapOption<ProviderSession>,
    ttl: Duration,
    persist_path: Option<PathBuf>,
}

impl Default for CachedSessionProvider {
    fn default() -> Self {
        Self::in_memory(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}

impl CachedSessionProvider {
    /// 只在内存中保存会话。
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            session: ArcSwapOption::empty(),
            ttl,
            persist_path: None,
        }
    }

    /// 使用指定的缓存文件，文件中的会话未过期时直接载入。
    #[must_use]
    pub fn with_persistence(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let loaded = load_unexpired(&path, Utc::now());
        Self {
            session: ArcSwapOption::new(loaded),
            ttl,
            persist_path: Some(path),
        }
    }

    /// 按配置创建。缓存文件路径不可用时退回到内存模式。
    #[must_use]
    pub fn from_config(config: &FetcherConfig) -> Self {
        let ttl = config.session_ttl();
        let Some(filename) = config.session_cache_file.as_deref() else {
            return Self::in_memory(ttl);
        };
        match config::get_config_file_path(filename) {
            Ok(path) => Self::with_persistence(path, ttl),
            Err(e) => {
                warn!("无法确定会话缓存路径，会话将不会持久化: {e}");
                Self::in_memory(ttl)
            }
        }
    }

    /// 当前保存的会话，不做过期检查。
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<ProviderSession>> {
        self.session.load_full()
    }

    fn persist(&self, session: &ProviderSession) {
        let Some(path) = &self.persist_path else {
            return;
        };
        if let Err(e) = config::save_cached_config_to(path, session) {
            warn!("保存网易云会话失败: {e}");
        }
    }
}

fn load_unexpired(path: &Path, now: DateTime<Utc>) -> Option<Arc<ProviderSession>> {
    if !path.exists() {
        return None;
    }
    match config::load_cached_config_from::<ProviderSession>(path) {
        Ok(cached) if !cached.data.is_expired_at(now) => {
            info!("已载入缓存的网易云会话，过期时间 {}", cached.data.expires_at);
            Some(Arc::new(cached.data))
        }
        Ok(_) => {
            debug!("缓存的网易云会话已过期");
            None
        }
        Err(e) => {
            warn!("读取网易云会话缓存失败: {e}");
            None
        }
    }
}

impl SessionProvider for CachedSessionProvider {
    fn current(&self) -> Result<Arc<ProviderSession>> {
        if let Some(session) = self.session.load_full()
            && !session.is_expired_at(Utc::now())
        {
            return Ok(session);
        }
        self.renew()
    }

    fn renew(&self) -> Result<Arc<ProviderSession>> {
        let session = Arc::new(ProviderSession::generate(Utc::now(), self.ttl));
        debug!(device_id = %session.device_id, "已生成新的网易云会话");
        self.persist(&session);
        self.session.store(Some(Arc::clone(&session)));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("lyrics-codec-test-{}", uuid::Uuid::new_v4()))
            .join("netease_session.json")
    }

    #[test]
    fn test_session_round_trip_is_lossless() {
        let session = ProviderSession::generate(Utc::now(), Duration::hours(24));
        let json = serde_json::to_string(&session).unwrap();
        let restored: ProviderSession = serde_json::from_str(&json).unwrap();
        assert_eq!(session, restored);
        assert_eq!(restored.expires_at - restored.issued_at, Duration::hours(24));
    }

    #[test]
    fn test_persisted_session_is_reloaded() {
        let path = temp_session_path();

        let first = CachedSessionProvider::with_persistence(&path, Duration::hours(24));
        assert!(first.snapshot().is_none());
        let session = first.current().unwrap();
        assert!(path.exists(), "会话应已写入缓存文件");

        let second = CachedSessionProvider::with_persistence(&path, Duration::hours(24));
        assert_eq!(second.snapshot().as_deref(), Some(session.as_ref()));
        assert_eq!(second.current().unwrap(), session);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_expired_session_is_regenerated() {
        let path = temp_session_path();
        let expired = ProviderSession::generate(
            Utc::now() - Duration::hours(48),
            Duration::hours(24),
        );
        config::save_cached_config_to(&path, &expired).unwrap();

        let provider = CachedSessionProvider::with_persistence(&path, Duration::hours(24));
        assert!(provider.snapshot().is_none(), "过期会话不应被载入");

        let fresh = provider.current().unwrap();
        assert_ne!(fresh.device_id, expired.device_id);
        assert!(!fresh.is_expired_at(Utc::now()));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_renew_swaps_without_touching_snapshots() {
        let provider = CachedSessionProvider::default();
        let held = provider.current().unwrap();
        let held_copy = (*held).clone();

        let renewed = provider.renew().unwrap();

        assert_eq!(*held, held_copy, "已取出的快照不应被修改");
        assert_ne!(held.device_id, renewed.device_id);
        assert_eq!(provider.current().unwrap(), renewed);
    }

    #[test]
    fn test_cookie_skips_empty_values() {
        let session = ProviderSession::generate(Utc::now(), Duration::hours(1));
        let cookie = session.cookie("1_0001");

        assert!(cookie.contains("os=pc"));
        assert!(cookie.contains(&format!("appver={DESKTOP_APP_VERSION}")));
        assert!(cookie.contains(&format!("deviceId={}", session.device_id)));
        assert!(!cookie.contains("MUSIC_U"));
        assert!(!cookie.contains("__csrf"));
    }
}
