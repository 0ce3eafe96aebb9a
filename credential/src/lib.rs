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

//! # oss-appserver-credential
//!
//! ## OSS 认证信息库
//!
//! 负责存储 OSS 的 AccessKey ID 和 AccessKey Secret，并使用 HMAC-SHA1 算法对上传策略进行签名。
//!
//! ### 代码示例
//!
//! ```
//! use oss_appserver_credential::Credential;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let credential = Credential::new("your-access-key-id", "your-access-key-secret");
//! let (encoded_policy, signature) = credential.sign_with_data(br#"{"expiration":"2025-01-01T00:00:00Z"}"#)?;
//! println!("policy={} signature={}", encoded_policy, signature);
//! # Ok(())
//! # }
//! ```

mod key;
pub use key::{AccessKeyId, AccessKeySecret};

use hmac::{digest::InvalidLength, Hmac, Mac};
use oss_appserver_utils::base64;
use sha1::Sha1;
use std::fmt;
use thiserror::Error;

/// 认证信息
///
/// 包含 AccessKey ID 和 AccessKey Secret，一旦创建则不可修改
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: AccessKeyId,
    access_key_secret: AccessKeySecret,
}

impl Credential {
    /// 创建认证信息
    #[inline]
    pub fn new(access_key_id: impl Into<AccessKeyId>, access_key_secret: impl Into<AccessKeySecret>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    /// 获取认证信息的 AccessKey ID
    #[inline]
    pub fn access_key_id(&self) -> &AccessKeyId {
        &self.access_key_id
    }

    /// 获取认证信息的 AccessKey Secret
    #[inline]
    pub fn access_key_secret(&self) -> &AccessKeySecret {
        &self.access_key_secret
    }

    /// 同时返回认证信息的 AccessKey ID 和 AccessKey Secret
    #[inline]
    pub fn split(self) -> (AccessKeyId, AccessKeySecret) {
        (self.access_key_id, self.access_key_secret)
    }

    /// 使用 HMAC-SHA1 算法对数据进行签名，返回 Base64 编码后的签名
    ///
    /// 参考 [PostObject 签名文档](https://help.aliyun.com/zh/oss/developer-reference/signature-version-1)
    pub fn sign(&self, data: &[u8]) -> SignResult<String> {
        base64ed_hmac_digest(self.access_key_secret.as_str(), data)
    }

    /// 先将数据进行 Base64 编码，再对编码结果进行签名
    ///
    /// 返回的第一个元素为 Base64 编码后的数据，第二个元素为签名，即 PostObject 表单中的 `policy` 和 `signature` 字段
    pub fn sign_with_data(&self, data: &[u8]) -> SignResult<(String, String)> {
        let encoded_data = base64::standard(data);
        let signature = self.sign(encoded_data.as_bytes())?;
        Ok((encoded_data, signature))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &self.access_key_secret)
            .finish()
    }
}

fn base64ed_hmac_digest(secret_key: &str, data: &[u8]) -> SignResult<String> {
    let mut hmac = Hmac::<Sha1>::new_from_slice(secret_key.as_bytes())?;
    hmac.update(data);
    Ok(base64::standard(&hmac.finalize().into_bytes()))
}

/// 签名错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SignError {
    /// HMAC 密钥初始化失败
    #[error("Failed to initialize HMAC-SHA1 with the access key secret: {0}")]
    InvalidKey(#[from] InvalidLength),
}

/// 签名结果
pub type SignResult<T> = Result<T, SignError>;
