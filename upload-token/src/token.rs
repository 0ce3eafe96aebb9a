use super::{Callback, Config, ConfigError, Policy};
use log::{debug, warn};
use oss_appserver_credential::{Credential, SignError};
use oss_appserver_utils::base64;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// 签名凭证
///
/// 返回给客户端，客户端凭此直接向 OSS 发起 PostObject 上传。
/// 序列化后的字段顺序固定为 `OSSAccessKeyId`，`policy`，`callback`，`signature`，`host`，`expire`，`directory`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureToken {
    #[serde(rename = "OSSAccessKeyId")]
    access_key_id: String,
    policy: String,
    callback: String,
    signature: String,
    host: String,
    expire: i64,
    directory: String,
}

impl SignatureToken {
    /// AccessKey ID
    #[inline]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Base64 编码后的上传策略
    #[inline]
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Base64 编码后的上传回调参数，没有回调则为空字符串
    #[inline]
    pub fn callback(&self) -> &str {
        &self.callback
    }

    /// 上传策略的签名
    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// 上传目标地址
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 过期时间的 UNIX 时间戳，精确到秒
    #[inline]
    pub fn expire(&self) -> i64 {
        self.expire
    }

    /// 上传目录前缀
    #[inline]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// 解码并解析签名凭证中的上传策略
    pub fn decode_policy(&self) -> GenerateResult<Policy> {
        let policy = base64::decode(self.policy.as_bytes())?;
        Ok(Policy::from_json(policy)?)
    }
}

/// 签名凭证生成器
///
/// 生成器本身不可修改，每次生成所需的上传策略和回调参数都通过参数传入，因此可以在多个线程之间共享。
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use oss_appserver_upload_token::{Config, Policy, TokenGenerator};
///
/// # fn main() -> anyhow::Result<()> {
/// let generator = TokenGenerator::new(Config::builder("AK", "SECRET", "https://b.example.com").build())?;
/// let policy = Policy::builder()
///     .expire_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
///     .build();
/// let token = generator.generate(Some(&policy), None)?;
/// assert_eq!(token.signature(), "/NtU6p8M4gtNpTZhuK3QIPfvn+0=");
/// assert_eq!(token.callback(), "");
/// assert_eq!(token.directory(), "");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct TokenGenerator {
    credential: Credential,
    config: Config,
    default_callback: Option<Callback>,
}

impl TokenGenerator {
    /// 创建签名凭证生成器
    ///
    /// 如果配置缺少必填项，返回 [`GenerateError::InvalidConfig`]
    pub fn new(config: Config) -> GenerateResult<Self> {
        config.validate()?;
        Ok(Self {
            credential: config.credential(),
            default_callback: Callback::from_config(&config),
            config,
        })
    }

    /// 签名凭证配置
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 生成签名凭证
    ///
    /// 未传入上传策略时，使用 [`Policy::from_config`] 生成的默认策略；
    /// 未传入回调参数时，使用配置中的回调参数。
    /// 不完整的回调参数会被忽略，签名凭证中的 `callback` 字段此时为空字符串。
    pub fn generate(&self, policy: Option<&Policy>, callback: Option<&Callback>) -> GenerateResult<SignatureToken> {
        let policy = policy.map_or_else(|| Cow::Owned(Policy::from_config(&self.config)), Cow::Borrowed);
        let (encoded_policy, signature) = self.credential.sign_with_data(&serde_json::to_vec(policy.as_ref())?)?;
        let callback = match callback.or(self.default_callback.as_ref()) {
            Some(callback) => match callback.validate() {
                Ok(()) => base64::standard(&serde_json::to_vec(callback)?),
                Err(err) => {
                    warn!("Omit invalid callback {:?}: {}", callback.callback_url(), err);
                    String::new()
                }
            },
            None => String::new(),
        };
        let token = SignatureToken {
            access_key_id: self.credential.access_key_id().to_string(),
            policy: encoded_policy,
            callback,
            signature,
            host: self.config.host().to_owned(),
            expire: policy.expire(),
            directory: policy.directory().to_owned(),
        };
        debug!(
            "Generated signature token: expire={} directory={:?} callback={}",
            token.expire,
            token.directory,
            !token.callback.is_empty()
        );
        Ok(token)
    }
}

/// 签名凭证生成错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GenerateError {
    /// 配置缺少必填项
    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// JSON 序列化或解析失败
    #[error("JSON serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 签名失败
    #[error("Sign error: {0}")]
    Sign(#[from] SignError),

    /// Base64 解码失败
    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// 签名凭证生成结果
pub type GenerateResult<T> = Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::{sync::Arc, thread};

    const HOST: &str = "https://bucket-name.oss-cn-hangzhou.aliyuncs.com";

    #[test]
    fn test_generate_without_conditions() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let generator = TokenGenerator::new(Config::builder("yourAccessKeyId", "yourAccessKeySecret", HOST).build())?;
        let policy = Policy::builder().expire_at(new_year()).build();
        let token = generator.generate(Some(&policy), None)?;
        assert_eq!(
            serde_json::to_string(&token)?,
            concat!(
                r#"{"OSSAccessKeyId":"yourAccessKeyId","#,
                r#""policy":"eyJleHBpcmF0aW9uIjoiMjAyNS0wMS0wMVQwMDowMDowMFoiLCJjb25kaXRpb25zIjpudWxsfQ==","#,
                r#""callback":"","signature":"S7QSuk+DEd0QdMRZFhwv3yjuE6g=","#,
                r#""host":"https://bucket-name.oss-cn-hangzhou.aliyuncs.com","expire":1735689600,"directory":""}"#,
            )
        );
        Ok(())
    }

    #[test]
    fn test_generate_with_directory() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let generator = TokenGenerator::new(Config::builder("yourAccessKeyId", "yourAccessKeySecret", HOST).build())?;
        let policy = Policy::builder()
            .expire_at(new_year())
            .directory("user-dir-prefix/")
            .build();
        let token = generator.generate(Some(&policy), None)?;
        assert_eq!(
            token.policy(),
            "eyJleHBpcmF0aW9uIjoiMjAyNS0wMS0wMVQwMDowMDowMFoiLCJjb25kaXRpb25zIjpbWyJzdGFydHMtd2l0aCIsIiRrZXkiLCJ1c2VyLWRpci1wcmVmaXgvIl1dfQ=="
        );
        assert_eq!(token.signature(), "uXL82wU5IGCd7vcZKX9gua5TUJs=");
        assert_eq!(token.directory(), "user-dir-prefix/");
        assert_eq!(token.expire(), 1_735_689_600);
        Ok(())
    }

    #[test]
    fn test_generate_with_all_conditions() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let generator = TokenGenerator::new(Config::builder("yourAccessKeyId", "yourAccessKeySecret", HOST).build())?;
        let policy = Policy::builder()
            .expire_at(new_year())
            .directory("user-dir-prefix/")
            .bucket("bucket-name")
            .content_length_range(1, 10 * 1024 * 1024)
            .content_types(["image/jpeg", "image/png"])
            .build();
        let token = generator.generate(Some(&policy), None)?;
        assert_eq!(
            token.policy(),
            "eyJleHBpcmF0aW9uIjoiMjAyNS0wMS0wMVQwMDowMDowMFoiLCJjb25kaXRpb25zIjpbWyJzdGFydHMtd2l0aCIsIiRrZXkiLCJ1c2VyLWRpci1wcmVmaXgvIl0seyJidWNrZXQiOiJidWNrZXQtbmFtZSJ9LFsiY29udGVudC1sZW5ndGgtcmFuZ2UiLDEsMTA0ODU3NjBdLFsiaW4iLCIkY29udGVudC10eXBlIixbImltYWdlL2pwZWciLCJpbWFnZS9wbmciXV1dfQ=="
        );
        assert_eq!(token.signature(), "wQZPtbuNzqTOol/oXZHIv7SLhc0=");
        assert_eq!(token.decode_policy()?, policy);
        Ok(())
    }

    #[test]
    fn test_generate_end_to_end() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let config = Config::builder("AK", "SECRET", "https://b.example.com")
            .expire_second(600)
            .build();
        let generator = TokenGenerator::new(config)?;
        let policy = Policy::builder().expire_at(new_year()).build();
        let token = generator.generate(Some(&policy), None)?;
        assert_eq!(token.access_key_id(), "AK");
        assert_eq!(token.host(), "https://b.example.com");
        assert_eq!(token.signature(), "/NtU6p8M4gtNpTZhuK3QIPfvn+0=");
        assert_eq!(token.callback(), "");
        assert_eq!(token.directory(), "");
        assert_eq!(token.expire(), 1_735_689_600);
        Ok(())
    }

    #[test]
    fn test_condition_order_changes_signature() -> anyhow::Result<()> {
        let generator = TokenGenerator::new(Config::builder("AK", "SECRET", "https://b.example.com").build())?;
        let bucket_first = Policy::builder()
            .expire_at(new_year())
            .bucket("bucket-name")
            .directory("user-dir-prefix/")
            .build();
        let directory_first = Policy::builder()
            .expire_at(new_year())
            .directory("user-dir-prefix/")
            .bucket("bucket-name")
            .build();

        let token = generator.generate(Some(&bucket_first), None)?;
        assert_eq!(
            token.policy(),
            "eyJleHBpcmF0aW9uIjoiMjAyNS0wMS0wMVQwMDowMDowMFoiLCJjb25kaXRpb25zIjpbeyJidWNrZXQiOiJidWNrZXQtbmFtZSJ9LFsic3RhcnRzLXdpdGgiLCIka2V5IiwidXNlci1kaXItcHJlZml4LyJdXX0="
        );
        assert_eq!(token.signature(), "ys0onwR71VYxzxe4CZuiDfK0Pn0=");

        let token = generator.generate(Some(&directory_first), None)?;
        assert_eq!(
            token.policy(),
            "eyJleHBpcmF0aW9uIjoiMjAyNS0wMS0wMVQwMDowMDowMFoiLCJjb25kaXRpb25zIjpbWyJzdGFydHMtd2l0aCIsIiRrZXkiLCJ1c2VyLWRpci1wcmVmaXgvIl0seyJidWNrZXQiOiJidWNrZXQtbmFtZSJ9XX0="
        );
        assert_eq!(token.signature(), "BkaPZMW52wg/nKgCkVRPdW2sgMA=");
        Ok(())
    }

    #[test]
    fn test_generate_with_config_callback() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let config = Config::builder("yourAccessKeyId", "yourAccessKeySecret", HOST)
            .callback_url("http://domain.com/oss/callback")
            .build();
        let generator = TokenGenerator::new(config)?;
        let policy = Policy::builder().expire_at(new_year()).build();
        let token = generator.generate(Some(&policy), None)?;
        assert_eq!(
            token.callback(),
            concat!(
                "eyJjYWxsYmFja1VybCI6Imh0dHA6Ly9kb21haW4uY29tL29zcy9jYWxsYmFjayIsImNhbGxiYWNrQm9keSI6IntcImJ1Y2tldFwiOiR7YnVja2V0fSxcIm9iamVjdFwiOiR7b2JqZWN0fSxcImV0YWdcIjoke2V0YWd9LFwic2l6ZVwiOiR7c2l6ZX0sXCJtaW1lVHlwZVwiOiR7bWltZVR5cGV9LFwiaW1hZ2VJbmZvXCI6e1wiaGVpZ2h0XCI6JHtpbWFnZUluZm8uaGVpZ2h0fSxcIndpZHRoXCI6JHtpbWFnZUluZm8ud2lkdGh9LFwiZm9ybWF0XCI6JHtpbWFnZUluZm8uZm9ybWF0fX0sXCJjcmM2NFwiOiR7Y3JjNjR9LFwiY29udGVudE1kNVwiOiR7Y29udGVudE1kNX0sXCJ2cGNJZFwiOiR7dnBjSWR9LFwiY2xpZW50SXBcIjoke2NsaWVudElwfSxcInJlcUlkXCI6JHtyZXFJZH0sXCJvcGVyYXRpb25cIjoke29wZXJhdGlvbn19IiwiY2FsbGJhY2tCb2R5VHlwZSI6ImFwcGxpY2F0aW9uL2pzb24ifQ==",
            )
        );
        // 回调参数不参与签名
        assert_eq!(token.signature(), "S7QSuk+DEd0QdMRZFhwv3yjuE6g=");
        Ok(())
    }

    #[test]
    fn test_explicit_callback_overrides_config() -> anyhow::Result<()> {
        let config = Config::builder("AK", "SECRET", "https://b.example.com")
            .callback_url("http://domain.com/oss/callback")
            .build();
        let generator = TokenGenerator::new(config)?;
        let callback = Callback::new("http://other.example.com/cb", "object=${object}")
            .with_body_type("application/x-www-form-urlencoded");
        let token = generator.generate(None, Some(&callback))?;
        let decoded: Callback = serde_json::from_slice(&base64::decode(token.callback().as_bytes())?)?;
        assert_eq!(decoded, callback);
        Ok(())
    }

    #[test]
    fn test_invalid_callback_is_omitted() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let generator = TokenGenerator::new(Config::builder("AK", "SECRET", "https://b.example.com").build())?;
        let policy = Policy::builder().expire_at(new_year()).build();
        let token = generator.generate(Some(&policy), Some(&Callback::new("http://domain.com/oss/callback", "")))?;
        assert_eq!(token.callback(), "");
        assert_eq!(token.signature(), "/NtU6p8M4gtNpTZhuK3QIPfvn+0=");
        Ok(())
    }

    #[test]
    fn test_generate_default_policy_from_config() -> anyhow::Result<()> {
        let config = Config::builder("AK", "SECRET", "https://b.example.com")
            .directory("user-dir-prefix/")
            .expire_second(30)
            .build();
        let generator = TokenGenerator::new(config)?;
        let before = Utc::now().timestamp();
        let token = generator.generate(None, None)?;
        let after = Utc::now().timestamp();
        assert!(token.expire() >= before + 30 && token.expire() <= after + 30);
        assert_eq!(token.directory(), "user-dir-prefix/");
        let policy = token.decode_policy()?;
        assert_eq!(policy.directory(), "user-dir-prefix/");
        assert_eq!(policy.expire(), token.expire());
        Ok(())
    }

    #[test]
    fn test_token_round_trip() -> anyhow::Result<()> {
        let generator = TokenGenerator::new(Config::builder("AK", "SECRET", "https://b.example.com").build())?;
        let policy = Policy::builder()
            .expire_at(new_year())
            .directory("a/")
            .content_length_range(0, 1024)
            .build();
        let token = generator.generate(Some(&policy), None)?;
        let parsed: SignatureToken = serde_json::from_str(&serde_json::to_string(&token)?)?;
        assert_eq!(parsed, token);
        assert_eq!(parsed.decode_policy()?, policy);

        let policy = Policy::builder().directory("b/").build();
        let token = generator.generate(Some(&policy), None)?;
        assert_eq!(token.decode_policy()?, policy);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            TokenGenerator::new(Config::builder("AK", "", "https://b.example.com").build()),
            Err(GenerateError::InvalidConfig(ConfigError::MissingAccessKeySecret))
        ));
    }

    #[test]
    fn test_generate_concurrently() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let generator = Arc::new(TokenGenerator::new(
            Config::builder("AK", "SECRET", "https://b.example.com").build(),
        )?);
        let threads = (0..10)
            .map(|i| {
                let generator = generator.to_owned();
                thread::spawn(move || {
                    let directory = format!("user-{}/", i);
                    let policy = Policy::builder().expire_at(new_year()).directory(&directory).build();
                    let token = generator.generate(Some(&policy), None).unwrap();
                    assert_eq!(token.directory(), directory);
                    assert_eq!(token.decode_policy().unwrap().directory(), directory);
                })
            })
            .collect::<Vec<_>>();
        threads.into_iter().for_each(|thread| thread.join().unwrap());
        Ok(())
    }

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }
}
