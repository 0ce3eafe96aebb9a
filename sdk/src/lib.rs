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
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]

//! # oss-appserver
//!
//! ## OSS 应用服务器 SDK
//!
//! 为客户端直传 OSS 提供签名凭证生成和上传回调验证，按功能重新导出各个子库：
//!
//! - `upload-token` : 上传策略与签名凭证
//! - `callback` : 上传回调验证
//! - `credential` : 认证信息与 HMAC-SHA1 签名
//! - `utils` : Base64 工具

#[cfg(feature = "utils")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "utils")))]
pub use oss_appserver_utils as utils;

#[cfg(feature = "credential")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "credential")))]
pub use oss_appserver_credential as credential;

#[cfg(feature = "upload-token")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "upload-token")))]
pub use oss_appserver_upload_token as upload_token;

#[cfg(feature = "callback")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "callback")))]
pub use oss_appserver_callback as callback;
