#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    missing_debug_implementations,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes
)]

//! # oss-appserver-callback
//!
//! ## OSS 上传回调验证库
//!
//! OSS 在上传完成后会向应用服务器发送回调请求，请求头 `X-Oss-Pub-Key-Url` 中携带 Base64 编码的公钥地址，
//! `Authorization` 中携带 Base64 编码的签名。
//!
//! 验证过程如下：
//!
//! 1. 将请求路径逐段进行百分号解码（转义的斜杠保持原样），如果有查询字符串，以 `?` 连接原始查询字符串，再以 `\n` 连接请求体，计算 MD5 摘要
//! 2. 从公钥地址获取 PEM 格式的 RSA 公钥
//! 3. 使用公钥以 PKCS#1 v1.5 方式验证 MD5 摘要的签名
//! 4. 签名验证通过后，将请求体解析为 [`CallbackBody`]
//!
//! 公钥通过 [`PublicKeyFetcher`] 获取，默认实现 [`UreqPublicKeyFetcher`] 基于 Ureq 阻塞请求，不缓存公钥，公钥响应体最大长度默认为 [`DEFAULT_MAX_KEY_SIZE`]。
//!
//! ### 代码示例
//!
//! ```no_run
//! use oss_appserver_callback::{http::Request, CallbackVerifier};
//!
//! # fn main() -> anyhow::Result<()> {
//! # let request = Request::post("/oss/callback").body(Vec::new())?;
//! let verifier = CallbackVerifier::default();
//! match verifier.verify(&request) {
//!     Ok(body) => println!("{} uploaded to {}", body.object(), body.bucket()),
//!     Err(err) => eprintln!("rejected: {}", err),
//! }
//! # Ok(())
//! # }
//! ```

mod auth_string;
mod body;
mod public_key;
mod verifier;

pub use auth_string::{auth_digest, auth_string, unescape_path, MalformedPathError, AUTH_DIGEST_LEN};
pub use body::{CallbackBody, ImageInfo};
pub use http;
pub use public_key::{
    decode_public_key_url, fetch_public_key, KeyFetchError, KeyFetchResult, PublicKeyFetcher, UreqPublicKeyFetcher,
    UreqPublicKeyFetcherBuilder, DEFAULT_MAX_KEY_SIZE,
};
pub use verifier::{
    verify_signature, CallbackVerifier, CallbackVerifierBuilder, VerifyError, VerifyResult, PUB_KEY_URL_HEADER,
};
