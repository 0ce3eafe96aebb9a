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

//! # oss-appserver-upload-token
//!
//! ## OSS PostObject 上传策略 / 签名凭证 库
//!
//! 负责为客户端直传 OSS 构建上传策略，并使用 AccessKey Secret 对上传策略签名，生成返回给客户端的签名凭证。
//!
//! - [`Config`] : 签名凭证配置，包含认证信息，上传目标地址，默认目录前缀，有效期和回调参数
//! - [`PolicyBuilder`] : 按顺序追加上传条件，生成 [`Policy`]
//! - [`Callback`] : 上传回调参数
//! - [`TokenGenerator`] : 根据上传策略和回调参数生成 [`SignatureToken`]
//!
//! ### 代码示例
//!
//! ```
//! use oss_appserver_upload_token::{serde_json, Config, Policy, TokenGenerator};
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder(
//!     "your-access-key-id",
//!     "your-access-key-secret",
//!     "https://bucket-name.oss-cn-hangzhou.aliyuncs.com",
//! )
//! .callback_url("http://domain.com/oss/callback")
//! .build();
//! let generator = TokenGenerator::new(config)?;
//! let policy = Policy::builder()
//!     .expire_after(Duration::from_secs(3600))
//!     .directory("user-dir-prefix/")
//!     .content_length_range(1, 10 * 1024 * 1024)
//!     .build();
//! let token = generator.generate(Some(&policy), None)?;
//! println!("{}", serde_json::to_string(&token)?);
//! # Ok(())
//! # }
//! ```

mod callback;
mod config;
mod policy;
mod token;

pub use callback::{Callback, InvalidCallback, DEFAULT_CALLBACK_BODY};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use oss_appserver_credential::{self as credential, Credential};
pub use policy::{Condition, Policy, PolicyBuilder, DEFAULT_EXPIRE_SECOND};
pub use serde_json;
pub use token::{GenerateError, GenerateResult, SignatureToken, TokenGenerator};
