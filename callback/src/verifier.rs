use super::{
    auth_string::{auth_digest, MalformedPathError},
    public_key::{decode_public_key_url, fetch_decoded_public_key, KeyFetchError, PublicKeyFetcher},
    CallbackBody, UreqPublicKeyFetcher,
};
use http::{header::AUTHORIZATION, Request};
use log::{debug, warn};
use md5::Md5;
use oss_appserver_utils::base64;
use rsa::{
    pkcs1::ALGORITHM_OID as RSA_ALGORITHM_OID,
    pkcs8::spki::{Error as SpkiError, SubjectPublicKeyInfoRef},
    Pkcs1v15Sign, RsaPublicKey,
};
use std::io::{Error as IoError, Read};
use thiserror::Error;

/// 回调公钥 URL 请求头
pub const PUB_KEY_URL_HEADER: &str = "X-Oss-Pub-Key-Url";

/// 上传回调验证器
///
/// 从 `X-Oss-Pub-Key-Url` 请求头指向的地址获取 RSA 公钥，
/// 校验 `Authorization` 请求头中的签名，签名正确才会解析回调请求体。
///
/// 验证器不保存任何请求相关的状态，可以在多个线程之间共享。
///
/// ```no_run
/// use oss_appserver_callback::{http::Request, CallbackVerifier, UreqPublicKeyFetcher};
/// use std::time::Duration;
///
/// # fn main() -> anyhow::Result<()> {
/// let verifier = CallbackVerifier::builder(
///     UreqPublicKeyFetcher::builder()
///         .timeout(Duration::from_secs(5))
///         .build(),
/// )
/// .allow_public_key_url_prefix("https://gosspublic.alicdn.com/")
/// .build();
/// let request = Request::post("/oss/callback")
///     .header("X-Oss-Pub-Key-Url", "aHR0cHM6Ly9nb3NzcHVibGljLmFsaWNkbi5jb20vY2FsbGJhY2tfcHViX2tleV92MS5wZW0=")
///     .header("Authorization", "your-signature")
///     .body(br#"{"bucket":"bucket-name"}"#.to_vec())?;
/// let body = verifier.verify(&request)?;
/// println!("{} uploaded", body.object());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CallbackVerifier<F = UreqPublicKeyFetcher> {
    fetcher: F,
    public_key_url_prefixes: Vec<String>,
}

impl Default for CallbackVerifier {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<F: PublicKeyFetcher> CallbackVerifier<F> {
    /// 创建上传回调验证器，接受任意公钥 URL
    #[inline]
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            public_key_url_prefixes: Vec::new(),
        }
    }

    /// 创建上传回调验证器构建器
    #[inline]
    pub fn builder(fetcher: F) -> CallbackVerifierBuilder<F> {
        CallbackVerifierBuilder::new(fetcher)
    }

    /// 回调公钥获取器
    #[inline]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// 验证上传回调请求，成功则返回解析后的回调请求体
    pub fn verify<B: AsRef<[u8]>>(&self, request: &Request<B>) -> VerifyResult<CallbackBody> {
        self.verify_parts(request, request.body().as_ref())
            .map_err(|err| {
                warn!("Rejected callback request to {}: {}", request.uri().path(), err);
                err
            })
    }

    /// 读取请求体后验证上传回调请求
    pub fn verify_reader<R: Read>(&self, request: Request<R>) -> VerifyResult<CallbackBody> {
        let (parts, mut reader) = request.into_parts();
        let mut body = Vec::new();
        if let Err(err) = reader.read_to_end(&mut body) {
            warn!("Failed to read callback request body: {}", err);
            return Err(err.into());
        }
        self.verify(&Request::from_parts(parts, body))
    }

    fn verify_parts<B>(&self, request: &Request<B>, body: &[u8]) -> VerifyResult<CallbackBody> {
        let uri = request.uri();
        let digest = auth_digest(uri.path(), uri.query().unwrap_or_default(), body)?;
        let public_key = self.fetch_public_key(request)?;
        let signature = authorization(request)?;
        verify_signature(&public_key, &digest, &signature)?;
        let callback_body = serde_json::from_slice(body).map_err(VerifyError::MalformedBody)?;
        debug!("Verified callback request to {}", uri.path());
        Ok(callback_body)
    }

    fn fetch_public_key<B>(&self, request: &Request<B>) -> Result<Vec<u8>, KeyFetchError> {
        let encoded_url = request
            .headers()
            .get(PUB_KEY_URL_HEADER)
            .map(|value| value.as_bytes())
            .unwrap_or_default();
        let url = decode_public_key_url(encoded_url)?;
        if !self.public_key_url_prefixes.is_empty()
            && !self
                .public_key_url_prefixes
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str()))
        {
            return Err(KeyFetchError::UntrustedUrl(url));
        }
        fetch_decoded_public_key(&self.fetcher, &url)
    }
}

fn authorization<B>(request: &Request<B>) -> VerifyResult<Vec<u8>> {
    match request.headers().get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => {
            base64::decode(value.as_bytes()).map_err(VerifyError::MalformedAuthorization)
        }
        _ => Err(VerifyError::MissingAuthorization),
    }
}

/// 上传回调验证器构建器
#[derive(Debug, Clone)]
pub struct CallbackVerifierBuilder<F = UreqPublicKeyFetcher> {
    inner: CallbackVerifier<F>,
}

impl<F: PublicKeyFetcher> CallbackVerifierBuilder<F> {
    /// 创建上传回调验证器构建器
    #[inline]
    pub fn new(fetcher: F) -> Self {
        Self {
            inner: CallbackVerifier::new(fetcher),
        }
    }

    /// 添加受信任的公钥 URL 前缀
    ///
    /// 一旦添加，不匹配任何前缀的公钥 URL 将被拒绝，且不会发起请求
    #[inline]
    pub fn allow_public_key_url_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.inner.public_key_url_prefixes.push(prefix.into());
        self
    }
}

impl<F: PublicKeyFetcher + Clone> CallbackVerifierBuilder<F> {
    /// 构建上传回调验证器
    #[inline]
    pub fn build(&self) -> CallbackVerifier<F> {
        self.inner.to_owned()
    }
}

/// 使用 PEM 格式的 RSA 公钥验证 MD5 摘要的 PKCS#1 v1.5 签名
pub fn verify_signature(public_key_pem: &[u8], digest: &[u8], signature: &[u8]) -> VerifyResult<()> {
    let pem = pem::parse(public_key_pem)?;
    let spki = SubjectPublicKeyInfoRef::try_from(pem.contents())
        .map_err(|err| VerifyError::InvalidPublicKey(err.into()))?;
    if spki.algorithm.oid != RSA_ALGORITHM_OID {
        return Err(VerifyError::UnsupportedKeyType(spki.algorithm.oid.to_string()));
    }
    let public_key = RsaPublicKey::try_from(spki).map_err(VerifyError::InvalidPublicKey)?;
    public_key
        .verify(Pkcs1v15Sign::new::<Md5>(), digest, signature)
        .map_err(VerifyError::SignatureInvalid)
}

/// 上传回调验证错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VerifyError {
    /// 请求路径中存在非法的百分号转义
    #[error("{0}")]
    MalformedPath(#[from] MalformedPathError),

    /// 获取回调公钥失败
    #[error("{0}")]
    KeyFetch(#[from] KeyFetchError),

    /// 缺少 `Authorization` 请求头
    #[error("Missing authorization header")]
    MissingAuthorization,

    /// `Authorization` 请求头不是合法的 Base64 编码
    #[error("Failed to decode authorization header: {0}")]
    MalformedAuthorization(#[source] base64::DecodeError),

    /// 公钥内容中不存在 PEM 块
    #[error("Failed to parse PEM block containing the public key: {0}")]
    PemParse(#[from] pem::PemError),

    /// 公钥不是合法的 PKIX 公钥
    #[error("Invalid PKIX public key: {0}")]
    InvalidPublicKey(#[source] SpkiError),

    /// 公钥不是 RSA 公钥
    #[error("Unsupported public key algorithm: {0}")]
    UnsupportedKeyType(String),

    /// 签名验证失败
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(#[source] rsa::Error),

    /// 回调请求体不是合法的 JSON
    #[error("Failed to parse callback body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// 读取回调请求体失败
    #[error("Failed to read callback body: {0}")]
    ReadBody(#[from] IoError),
}

/// 上传回调验证结果
pub type VerifyResult<T> = Result<T, VerifyError>;
