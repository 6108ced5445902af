//! 负责处理库的持久化配置与缓存文件。

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::{error::Result, model::provider::ProviderId};

/// 配置目录名。
pub const CONFIG_DIR_NAME: &str = "lyrics-codec";

/// 带保存时间的缓存配置。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CachedConfig<T> {
    /// 实际保存的数据。
    pub data: T,
    /// 保存时间。
    pub saved_at: DateTime<Utc>,
}

/// 获取应用配置目录下指定文件的完整路径。
///
/// # 参数
/// * `filename` - 目标配置文件的名称，例如 "netease_session.json"。
pub fn get_config_file_path(filename: &str) -> std::io::Result<PathBuf> {
    if let Some(mut config_dir) = dirs::config_dir() {
        config_dir.push(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir)?;
        config_dir.push(filename);
        Ok(config_dir)
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "无法找到用户配置目录",
        ))
    }
}

/// 从配置目录加载缓存配置。
pub fn load_cached_config<T: DeserializeOwned>(filename: &str) -> Result<CachedConfig<T>> {
    load_cached_config_from(&get_config_file_path(filename)?)
}

/// 从指定路径加载缓存配置。
pub fn load_cached_config_from<T: DeserializeOwned>(path: &Path) -> Result<CachedConfig<T>> {
    let content = fs::read_to_string(path)?;
    let config: CachedConfig<T> = serde_json::from_str(&content)?;
    debug!("已从 {} 加载缓存 (保存于 {})", path.display(), config.saved_at);
    Ok(config)
}

/// 将数据保存到配置目录。
pub fn save_cached_config<T: Serialize>(filename: &str, data: &T) -> Result<()> {
    save_cached_config_to(&get_config_file_path(filename)?, data)
}

/// 将数据保存到指定路径，父目录不存在时会自动创建。
pub fn save_cached_config_to<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let cached = CachedConfig {
        data,
        saved_at: Utc::now(),
    };
    let content = serde_json::to_string_pretty(&cached)?;
    fs::write(path, content)?;
    info!("缓存已保存到 {}。", path.display());
    Ok(())
}

/// `LyricsFetcher` 的配置。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FetcherConfig {
    /// 按优先级排列的启用的提供商。
    pub providers: Vec<ProviderId>,
    /// 单个 HTTP 请求的超时时间（秒）。
    pub request_timeout_secs: u64,
    /// 网易云会话的有效期（小时）。
    pub session_ttl_hours: i64,
    /// 网易云会话缓存文件名，为 `None` 时不持久化。
    pub session_cache_file: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            providers: vec![ProviderId::Qq, ProviderId::Kugou, ProviderId::Netease],
            request_timeout_secs: 10,
            session_ttl_hours: 24,
            session_cache_file: Some("netease_session.json".to_string()),
        }
    }
}

impl FetcherConfig {
    /// 从 JSON 文本解析配置，缺失的字段使用默认值。
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 请求超时。
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 会话有效期。
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_config_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("lyrics-codec-test-{}", uuid::Uuid::new_v4()))
            .join("cache.json");

        save_cached_config_to(&path, &vec!["a".to_string(), "b".to_string()])
            .expect("保存缓存失败");
        let loaded: CachedConfig<Vec<String>> =
            load_cached_config_from(&path).expect("加载缓存失败");

        assert_eq!(loaded.data, vec!["a".to_string(), "b".to_string()]);
        assert!(loaded.saved_at <= Utc::now());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("lyrics-codec-does-not-exist.json");
        let result = load_cached_config_from::<String>(&path);
        assert!(matches!(result, Err(crate::error::LyricsCodecError::Io(_))));
    }

    #[test]
    fn test_fetcher_config_defaults() {
        let config = FetcherConfig::from_json(r#"{"providers":["netease","kugou"]}"#).unwrap();
        assert_eq!(config.providers, vec![ProviderId::Netease, ProviderId::Kugou]);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.session_ttl(), chrono::Duration::hours(24));
    }
}
