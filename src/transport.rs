//! HTTP 传输能力。
//!
//! 核心逻辑只依赖 [`Transport`] 这一“发送字节、取回状态与字节”的抽象，
//! 测试中可以用内存实现替换；[`ReqwestTransport`] 是基于 `reqwest` 的默认实现。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, instrument};

use crate::error::{LyricsCodecError, Result};

/// HTTP 方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

/// 一个待发送的请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// 请求方法。
    pub method: HttpMethod,
    /// 不含查询字符串的 URL。
    pub url: String,
    /// 查询参数，按顺序追加。
    pub query: Vec<(String, String)>,
    /// 请求头。
    pub headers: Vec<(String, String)>,
    /// 请求体。
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// 创建一个 GET 请求。
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// 创建一个 POST 请求。
    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// 追加一个请求头。
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 追加查询参数。
    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    /// 查询参数中某个键的值。
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 拼接后的完整 URL（查询参数经过百分号编码）。
    #[must_use]
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }
}

/// 传输层返回的响应。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP 状态码。
    pub status: u16,
    /// 响应体。
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 非 2xx 状态码视为传输错误。
    pub fn error_for_status(self) -> Result<Self> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(LyricsCodecError::Transport(format!(
                "HTTP 状态码 {}",
                self.status
            )))
        }
    }
}

/// “发送请求，取回状态与字节”的能力。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发送一个请求。
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// 基于 `reqwest` 的传输实现。
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// 使用给定的超时创建。
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }

    /// 使用已有的 `reqwest::Client`。
    #[must_use]
    pub fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self
            .http_client
            .request(method, &request.url)
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(status, len = body.len(), "收到响应");

        Ok(HttpResponse { status, body })
    }
}
