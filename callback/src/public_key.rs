use auto_impl::auto_impl;
use http::Uri;
use log::{debug, warn};
use oss_appserver_utils::base64;
use std::{
    error::Error as StdError,
    fmt::Debug,
    io::{Error as IoError, Read},
    time::Duration,
};
use thiserror::Error;
use ureq::{Agent, AgentBuilder, Error as UreqError};

/// 回调公钥获取接口
///
/// 根据 URL 获取 PEM 格式的 RSA 公钥，应用服务器可以实现该接口以接入自己的 HTTP 客户端
#[auto_impl(&, &mut, Box, Arc)]
pub trait PublicKeyFetcher: Debug + Send + Sync {
    /// 获取公钥内容
    fn fetch(&self, url: &str) -> KeyFetchResult<Vec<u8>>;
}

/// 公钥响应体的默认最大长度，单位为字节
pub const DEFAULT_MAX_KEY_SIZE: u64 = 64 * 1024;

/// 基于 Ureq 的回调公钥获取器
///
/// 阻塞发送 GET 请求，不重试，不缓存。
/// 响应体超过最大长度时立即停止读取。
#[derive(Debug, Clone)]
pub struct UreqPublicKeyFetcher {
    agent: Agent,
    max_key_size: u64,
}

impl UreqPublicKeyFetcher {
    /// 创建回调公钥获取器构建器
    #[inline]
    pub fn builder() -> UreqPublicKeyFetcherBuilder {
        Default::default()
    }
}

impl Default for UreqPublicKeyFetcher {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<Agent> for UreqPublicKeyFetcher {
    #[inline]
    fn from(agent: Agent) -> Self {
        Self {
            agent,
            max_key_size: DEFAULT_MAX_KEY_SIZE,
        }
    }
}

impl PublicKeyFetcher for UreqPublicKeyFetcher {
    fn fetch(&self, url: &str) -> KeyFetchResult<Vec<u8>> {
        let response = self.agent.get(url).call().map_err(|err| match err {
            UreqError::Status(status, _) => KeyFetchError::Status {
                url: url.to_owned(),
                status,
            },
            UreqError::Transport(transport) => KeyFetchError::Fetch {
                url: url.to_owned(),
                source: Box::new(transport),
            },
        })?;
        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.max_key_size.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|err| KeyFetchError::Read {
                url: url.to_owned(),
                source: err,
            })?;
        if body.len() as u64 > self.max_key_size {
            return Err(KeyFetchError::TooLarge {
                url: url.to_owned(),
                limit: self.max_key_size,
            });
        }
        Ok(body)
    }
}

/// 基于 Ureq 的回调公钥获取器构建器
///
/// 默认不设置任何超时，响应体最大长度为 [`DEFAULT_MAX_KEY_SIZE`]
#[derive(Debug, Clone, Default)]
pub struct UreqPublicKeyFetcherBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_key_size: Option<u64>,
}

impl UreqPublicKeyFetcherBuilder {
    /// 设置整体超时时长
    #[inline]
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// 设置连接超时时长
    #[inline]
    pub fn connect_timeout(&mut self, connect_timeout: Duration) -> &mut Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    /// 设置公钥响应体的最大长度，单位为字节
    #[inline]
    pub fn max_key_size(&mut self, max_key_size: u64) -> &mut Self {
        self.max_key_size = Some(max_key_size);
        self
    }

    /// 构建回调公钥获取器
    pub fn build(&self) -> UreqPublicKeyFetcher {
        let mut builder = AgentBuilder::new();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.timeout_connect(connect_timeout);
        }
        UreqPublicKeyFetcher {
            agent: builder.build(),
            max_key_size: self.max_key_size.unwrap_or(DEFAULT_MAX_KEY_SIZE),
        }
    }
}

/// 解码 Base64 编码的公钥 URL
///
/// URL 必须是 UTF-8 编码的 HTTP 或 HTTPS 绝对地址
pub fn decode_public_key_url(encoded_url: &[u8]) -> KeyFetchResult<String> {
    let url = String::from_utf8(base64::decode(encoded_url)?)
        .map_err(|err| KeyFetchError::InvalidUrl(String::from_utf8_lossy(err.as_bytes()).into_owned()))?;
    let uri: Uri = url.parse().map_err(|_| KeyFetchError::InvalidUrl(url.to_owned()))?;
    match (uri.scheme_str(), uri.authority()) {
        (Some("http" | "https"), Some(_)) => Ok(url),
        _ => Err(KeyFetchError::InvalidUrl(url)),
    }
}

/// 根据 Base64 编码的公钥 URL 获取公钥内容
pub fn fetch_public_key<F: PublicKeyFetcher + ?Sized>(fetcher: &F, encoded_url: &[u8]) -> KeyFetchResult<Vec<u8>> {
    let url = decode_public_key_url(encoded_url)?;
    fetch_decoded_public_key(fetcher, &url)
}

pub(super) fn fetch_decoded_public_key<F: PublicKeyFetcher + ?Sized>(fetcher: &F, url: &str) -> KeyFetchResult<Vec<u8>> {
    debug!("Fetch callback public key from {}", url);
    fetcher.fetch(url).map_err(|err| {
        warn!("Failed to fetch callback public key: {}", err);
        err
    })
}

/// 回调公钥获取错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KeyFetchError {
    /// 公钥 URL 不是合法的 Base64 编码
    #[error("Failed to decode public key url: {0}")]
    Decode(#[from] base64::DecodeError),

    /// 公钥 URL 不是合法的 HTTP 地址
    #[error("Invalid public key url: {0:?}")]
    InvalidUrl(String),

    /// 公钥 URL 不在信任列表中
    #[error("Untrusted public key url: {0:?}")]
    UntrustedUrl(String),

    /// 请求公钥失败
    #[error("Failed to fetch public key from {url}: {source}")]
    Fetch {
        /// 公钥 URL
        url: String,
        /// 底层错误
        source: Box<dyn StdError + Send + Sync>,
    },

    /// 获取公钥的响应状态码不是 2xx
    #[error("Failed to fetch public key from {url}: status code {status}")]
    Status {
        /// 公钥 URL
        url: String,
        /// 状态码
        status: u16,
    },

    /// 公钥响应体超过最大长度
    #[error("Public key from {url} exceeds {limit} bytes")]
    TooLarge {
        /// 公钥 URL
        url: String,
        /// 最大长度
        limit: u64,
    },

    /// 读取公钥响应体失败
    #[error("Failed to read public key from {url}: {source}")]
    Read {
        /// 公钥 URL
        url: String,
        /// 底层错误
        source: IoError,
    },
}

/// 回调公钥获取结果
pub type KeyFetchResult<T> = Result<T, KeyFetchError>;
