use super::DEFAULT_EXPIRE_SECOND;
use oss_appserver_credential::{AccessKeyId, AccessKeySecret, Credential};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// 签名凭证配置
///
/// 由嵌入本库的服务在进程内提供，一旦构建完毕不会再被修改。
/// 可以通过 [`Config::builder`] 构建，也可以通过任意 serde 格式反序列化得到，字段名与下面的 JSON 一致：
///
/// ```
/// use oss_appserver_upload_token::{serde_json, Config};
///
/// # fn main() -> anyhow::Result<()> {
/// let config: Config = serde_json::from_str(
///     r#"{
///         "access_key_id": "your-access-key-id",
///         "access_key_secret": "your-access-key-secret",
///         "host": "https://bucket-name.oss-cn-hangzhou.aliyuncs.com",
///         "directory": "user-dir-prefix/",
///         "expire_second": 600,
///         "callback_url": "http://domain.com/oss/callback"
///     }"#,
/// )?;
/// config.validate()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    access_key_id: AccessKeyId,
    access_key_secret: AccessKeySecret,
    host: String,

    callback_url: String,
    callback_body: String,
    callback_body_type: String,

    directory: String,
    expire_second: u64,
}

impl Config {
    /// 创建签名凭证配置构建器
    ///
    /// AccessKey ID，AccessKey Secret 和 `host` 为必填项
    #[inline]
    pub fn builder(
        access_key_id: impl Into<AccessKeyId>,
        access_key_secret: impl Into<AccessKeySecret>,
        host: impl Into<String>,
    ) -> ConfigBuilder {
        ConfigBuilder::new(access_key_id, access_key_secret, host)
    }

    /// AccessKey ID
    #[inline]
    pub fn access_key_id(&self) -> &AccessKeyId {
        &self.access_key_id
    }

    /// AccessKey Secret
    #[inline]
    pub fn access_key_secret(&self) -> &AccessKeySecret {
        &self.access_key_secret
    }

    /// 由 AccessKey ID 和 AccessKey Secret 组成的认证信息
    #[inline]
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_key_id.to_owned(), self.access_key_secret.to_owned())
    }

    /// 上传目标地址，原样返回给客户端
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 上传回调地址，为空表示不使用回调
    #[inline]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// 上传回调请求体模版
    #[inline]
    pub fn callback_body(&self) -> &str {
        &self.callback_body
    }

    /// 上传回调请求体的 `Content-Type`
    #[inline]
    pub fn callback_body_type(&self) -> &str {
        &self.callback_body_type
    }

    /// 默认上传目录前缀
    #[inline]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// 签名凭证有效期，单位为秒，为 0 表示使用默认值
    #[inline]
    pub fn expire_second(&self) -> u64 {
        self.expire_second
    }

    /// 签名凭证有效期
    ///
    /// 如果没有配置，则为 [`DEFAULT_EXPIRE_SECOND`] 秒
    pub fn token_lifetime(&self) -> Duration {
        match self.expire_second {
            0 => Duration::from_secs(DEFAULT_EXPIRE_SECOND),
            secs => Duration::from_secs(secs),
        }
    }

    /// 检查必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key_id.is_empty() {
            return Err(ConfigError::MissingAccessKeyId);
        }
        if self.access_key_secret.is_empty() {
            return Err(ConfigError::MissingAccessKeySecret);
        }
        if self.host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        Ok(())
    }
}

/// 签名凭证配置构建器
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// 创建签名凭证配置构建器
    pub fn new(
        access_key_id: impl Into<AccessKeyId>,
        access_key_secret: impl Into<AccessKeySecret>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            inner: Config {
                access_key_id: access_key_id.into(),
                access_key_secret: access_key_secret.into(),
                host: host.into(),
                ..Default::default()
            },
        }
    }

    /// 指定默认上传目录前缀
    #[inline]
    pub fn directory(&mut self, directory: impl Into<String>) -> &mut Self {
        self.inner.directory = directory.into();
        self
    }

    /// 指定签名凭证有效期，单位为秒
    #[inline]
    pub fn expire_second(&mut self, expire_second: u64) -> &mut Self {
        self.inner.expire_second = expire_second;
        self
    }

    /// 指定上传回调地址
    #[inline]
    pub fn callback_url(&mut self, callback_url: impl Into<String>) -> &mut Self {
        self.inner.callback_url = callback_url.into();
        self
    }

    /// 指定上传回调请求体模版
    ///
    /// 不指定则使用 [`crate::DEFAULT_CALLBACK_BODY`]
    #[inline]
    pub fn callback_body(&mut self, callback_body: impl Into<String>) -> &mut Self {
        self.inner.callback_body = callback_body.into();
        self
    }

    /// 指定上传回调请求体的 `Content-Type`
    ///
    /// 不指定则使用 `application/json`
    #[inline]
    pub fn callback_body_type(&mut self, callback_body_type: impl Into<String>) -> &mut Self {
        self.inner.callback_body_type = callback_body_type.into();
        self
    }

    /// 生成签名凭证配置
    #[inline]
    pub fn build(&self) -> Config {
        self.inner.to_owned()
    }
}

/// 签名凭证配置错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// 缺少 AccessKey ID
    #[error("missing required config access_key_id")]
    MissingAccessKeyId,

    /// 缺少 AccessKey Secret
    #[error("missing required config access_key_secret")]
    MissingAccessKeySecret,

    /// 缺少上传目标地址
    #[error("missing required config host")]
    MissingHost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::from_str as from_json_str;

    #[test]
    fn test_build_config() {
        let config = Config::builder("ak", "sk", "https://b.example.com")
            .directory("user-dir-prefix/")
            .expire_second(30)
            .callback_url("http://domain.com/oss/callback")
            .build();
        assert_eq!(config.access_key_id().as_str(), "ak");
        assert_eq!(config.access_key_secret().as_str(), "sk");
        assert_eq!(config.host(), "https://b.example.com");
        assert_eq!(config.directory(), "user-dir-prefix/");
        assert_eq!(config.token_lifetime(), Duration::from_secs(30));
        assert_eq!(config.callback_url(), "http://domain.com/oss/callback");
        assert!(config.callback_body().is_empty());
        assert!(config.callback_body_type().is_empty());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_deserialize_config() -> anyhow::Result<()> {
        let config: Config = from_json_str(
            r#"{"access_key_id":"ak","access_key_secret":"sk","host":"https://b.example.com","callback_body_type":"application/x-www-form-urlencoded"}"#,
        )?;
        assert_eq!(config.access_key_id().as_str(), "ak");
        assert_eq!(config.credential().access_key_secret().as_str(), "sk");
        assert_eq!(config.callback_body_type(), "application/x-www-form-urlencoded");
        assert_eq!(config.expire_second(), 0);
        assert_eq!(config.token_lifetime(), Duration::from_secs(DEFAULT_EXPIRE_SECOND));
        assert_eq!(config.validate(), Ok(()));
        Ok(())
    }

    #[test]
    fn test_validate_config() -> anyhow::Result<()> {
        let config: Config = from_json_str(r#"{"access_key_secret":"sk","host":"h"}"#)?;
        assert_eq!(config.validate(), Err(ConfigError::MissingAccessKeyId));
        let config: Config = from_json_str(r#"{"access_key_id":"ak","host":"h"}"#)?;
        assert_eq!(config.validate(), Err(ConfigError::MissingAccessKeySecret));
        let config = Config::builder("ak", "sk", "").build();
        assert_eq!(config.validate(), Err(ConfigError::MissingHost));
        assert_eq!(
            ConfigError::MissingHost.to_string(),
            "missing required config host"
        );
        Ok(())
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = Config::builder("ak", "super-secret", "h").build();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
