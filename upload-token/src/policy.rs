use super::Config;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{
    de::{Deserializer, Error as DeserializeError},
    ser::{SerializeMap, SerializeStruct, Serializer},
    Deserialize, Serialize,
};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// 未指定过期时间时，签名凭证的默认有效期，单位为秒
pub const DEFAULT_EXPIRE_SECOND: u64 = 600;

const EXPIRATION_KEY: &str = "expiration";
const CONDITIONS_KEY: &str = "conditions";
const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const STARTS_WITH: &str = "starts-with";
const CONTENT_LENGTH_RANGE: &str = "content-length-range";
const IN: &str = "in";

const KEY_FIELD: &str = "$key";
const BUCKET_FIELD: &str = "bucket";
const CONTENT_TYPE_FIELD: &str = "$content-type";

/// 上传策略
///
/// 可以阅读 <https://help.aliyun.com/zh/oss/developer-reference/signature-version-1> 了解 OSS PostObject 的 Policy 格式。
///
/// 上传策略序列化后的字节会直接参与签名，因此条件的顺序与添加顺序严格一致。
///
/// ### 限制上传目录，存储空间，文件大小和文件类型
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use oss_appserver_upload_token::Policy;
///
/// # fn main() -> anyhow::Result<()> {
/// let policy = Policy::builder()
///     .expire_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
///     .directory("user-dir-prefix/")
///     .bucket("bucket-name")
///     .content_length_range(1, 10 * 1024 * 1024)
///     .content_types(["image/jpeg", "image/png"])
///     .build();
/// assert_eq!(policy.expire(), 1735689600);
/// assert_eq!(policy.directory(), "user-dir-prefix/");
/// assert_eq!(
///     policy.to_json()?,
///     r#"{"expiration":"2025-01-01T00:00:00Z","conditions":[["starts-with","$key","user-dir-prefix/"],{"bucket":"bucket-name"},["content-length-range",1,10485760],["in","$content-type",["image/jpeg","image/png"]]]}"#,
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    expiration: DateTime<Utc>,
    directory: Option<String>,
    conditions: Vec<Condition>,
}

impl Policy {
    /// 创建上传策略构建器
    #[inline]
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    /// 根据签名凭证配置生成默认的上传策略
    ///
    /// 过期时间为当前时间加上配置的有效期，如果配置了上传目录前缀，则追加目录前缀条件
    pub fn from_config(config: &Config) -> Self {
        let mut builder = PolicyBuilder::new();
        builder.expire_after(config.token_lifetime());
        if !config.directory().is_empty() {
            builder.directory(config.directory());
        }
        builder.build()
    }

    /// 过期时间
    #[inline]
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// 过期时间的 UNIX 时间戳，精确到秒
    #[inline]
    pub fn expire(&self) -> i64 {
        self.expiration.timestamp()
    }

    /// 上传目录前缀，未设置则返回空字符串
    #[inline]
    pub fn directory(&self) -> &str {
        self.directory.as_deref().unwrap_or_default()
    }

    /// 上传条件，顺序与添加顺序一致
    #[inline]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// 获取 JSON 格式的上传策略
    #[inline]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 解析 JSON 格式的上传策略
    #[inline]
    pub fn from_json(json: impl AsRef<[u8]>) -> serde_json::Result<Self> {
        serde_json::from_slice(json.as_ref())
    }
}

impl Serialize for Policy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Policy", 2)?;
        s.serialize_field(EXPIRATION_KEY, &self.expiration.format(EXPIRATION_FORMAT).to_string())?;
        // 没有条件时输出 null
        let conditions = (!self.conditions.is_empty()).then_some(self.conditions.as_slice());
        s.serialize_field(CONDITIONS_KEY, &conditions)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawPolicy {
            expiration: String,
            #[serde(default)]
            conditions: Option<Vec<Condition>>,
        }

        let raw = RawPolicy::deserialize(deserializer)?;
        let expiration = DateTime::parse_from_rfc3339(&raw.expiration)
            .map_err(|err| D::Error::custom(format!("invalid policy expiration {:?}: {}", raw.expiration, err)))?
            .with_timezone(&Utc);
        let conditions = raw.conditions.unwrap_or_default();
        let directory = conditions
            .iter()
            .rev()
            .find_map(Condition::key_prefix)
            .map(ToOwned::to_owned);
        Ok(Self {
            expiration,
            directory,
            conditions,
        })
    }
}

/// 上传策略构建器
///
/// 用于生成上传策略，一旦生成完毕，上传策略将无法被修改。
/// 每次添加条件都会追加到条件列表末尾，重复调用不会覆盖之前添加的条件。
#[derive(Clone, Debug, Default)]
pub struct PolicyBuilder {
    expiration: Option<DateTime<Utc>>,
    directory: Option<String>,
    conditions: Vec<Condition>,
}

impl From<Policy> for PolicyBuilder {
    #[inline]
    fn from(policy: Policy) -> Self {
        Self {
            expiration: Some(policy.expiration),
            directory: policy.directory,
            conditions: policy.conditions,
        }
    }
}

impl PolicyBuilder {
    /// 创建上传策略构建器
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// 指定过期时间
    ///
    /// 签名凭证中的 `expire` 字段与这里给出的时间一致，不足一秒的部分将被舍去
    #[inline]
    pub fn expire_at(&mut self, expiration: impl Into<DateTime<Utc>>) -> &mut Self {
        self.expiration = Some(expiration.into().trunc_subsecs(0));
        self
    }

    /// 指定有效期，过期时间为当前时间加上有效期
    #[inline]
    pub fn expire_after(&mut self, lifetime: Duration) -> &mut Self {
        self.expiration = Some(expiration_after(lifetime));
        self
    }

    /// 限制对象名称必须以指定的目录前缀开头
    ///
    /// 签名凭证中的 `directory` 字段为最后一次指定的目录前缀
    pub fn directory(&mut self, prefix: impl Into<String>) -> &mut Self {
        let prefix = prefix.into();
        self.directory = Some(prefix.to_owned());
        self.condition(Condition::key_starts_with(prefix))
    }

    /// 限制存储空间名称
    #[inline]
    pub fn bucket(&mut self, bucket: impl Into<String>) -> &mut Self {
        self.condition(Condition::bucket(bucket))
    }

    /// 限制上传文件尺寸的范围，单位为字节，两端都包含在内
    #[inline]
    pub fn content_length_range(&mut self, min: u64, max: u64) -> &mut Self {
        self.condition(Condition::content_length_range(min, max))
    }

    /// 限制上传文件的 MIME 类型
    #[inline]
    pub fn content_types<T: Into<String>>(&mut self, content_types: impl IntoIterator<Item = T>) -> &mut Self {
        self.condition(Condition::content_type_in(content_types))
    }

    /// 追加任意条件
    #[inline]
    pub fn condition(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    /// 生成上传策略
    ///
    /// 如果没有指定过期时间，则过期时间为当前时间加上 [`DEFAULT_EXPIRE_SECOND`] 秒
    pub fn build(&self) -> Policy {
        Policy {
            expiration: self
                .expiration
                .unwrap_or_else(|| expiration_after(Duration::from_secs(DEFAULT_EXPIRE_SECOND))),
            directory: self.directory.to_owned(),
            conditions: self.conditions.to_owned(),
        }
    }
}

fn expiration_after(lifetime: Duration) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(0);
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| DateTime::<Utc>::MAX_UTC.trunc_subsecs(0))
}

/// 上传条件
///
/// 每种条件都有固定的 JSON 形态：
///
/// - [`Condition::StartsWith`]：`["starts-with", "$key", "prefix"]`
/// - [`Condition::Exact`]：`{"bucket": "name"}`
/// - [`Condition::ContentLengthRange`]：`["content-length-range", 1, 10485760]`
/// - [`Condition::In`]：`["in", "$content-type", ["image/jpeg", "image/png"]]`
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Condition {
    /// 表单字段必须以指定前缀开头
    StartsWith {
        /// 表单字段，例如 `$key`
        field: String,
        /// 前缀
        prefix: String,
    },

    /// 表单字段必须与指定值完全一致
    Exact {
        /// 表单字段，例如 `bucket`
        field: String,
        /// 值
        value: String,
    },

    /// 上传文件尺寸范围，两端都包含在内
    ContentLengthRange {
        /// 最小尺寸
        min: u64,
        /// 最大尺寸
        max: u64,
    },

    /// 表单字段必须是指定值之一
    In {
        /// 表单字段，例如 `$content-type`
        field: String,
        /// 允许的值
        values: Vec<String>,
    },
}

impl Condition {
    /// 对象名称前缀条件
    #[inline]
    pub fn key_starts_with(prefix: impl Into<String>) -> Self {
        Self::StartsWith {
            field: KEY_FIELD.to_owned(),
            prefix: prefix.into(),
        }
    }

    /// 存储空间名称条件
    #[inline]
    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self::Exact {
            field: BUCKET_FIELD.to_owned(),
            value: bucket.into(),
        }
    }

    /// 上传文件尺寸范围条件
    #[inline]
    pub fn content_length_range(min: u64, max: u64) -> Self {
        Self::ContentLengthRange { min, max }
    }

    /// 上传文件 MIME 类型条件
    #[inline]
    pub fn content_type_in<T: Into<String>>(content_types: impl IntoIterator<Item = T>) -> Self {
        Self::In {
            field: CONTENT_TYPE_FIELD.to_owned(),
            values: content_types.into_iter().map(Into::into).collect(),
        }
    }

    /// 如果是对象名称前缀条件，返回前缀
    pub fn key_prefix(&self) -> Option<&str> {
        match self {
            Self::StartsWith { field, prefix } if field == KEY_FIELD => Some(prefix),
            _ => None,
        }
    }

    fn from_json_array(items: &[JsonValue]) -> Option<Self> {
        match items {
            [JsonValue::String(op), JsonValue::String(field), JsonValue::String(prefix)] if op == STARTS_WITH => {
                Some(Self::StartsWith {
                    field: field.to_owned(),
                    prefix: prefix.to_owned(),
                })
            }
            [JsonValue::String(op), min, max] if op == CONTENT_LENGTH_RANGE => Some(Self::ContentLengthRange {
                min: min.as_u64()?,
                max: max.as_u64()?,
            }),
            [JsonValue::String(op), JsonValue::String(field), JsonValue::Array(values)] if op == IN => {
                Some(Self::In {
                    field: field.to_owned(),
                    values: values
                        .iter()
                        .map(|value| value.as_str().map(ToOwned::to_owned))
                        .collect::<Option<_>>()?,
                })
            }
            _ => None,
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::StartsWith { field, prefix } => (STARTS_WITH, field, prefix).serialize(serializer),
            Self::Exact { field, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(field, value)?;
                map.end()
            }
            Self::ContentLengthRange { min, max } => (CONTENT_LENGTH_RANGE, min, max).serialize(serializer),
            Self::In { field, values } => (IN, field, values).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        let condition = match &value {
            JsonValue::Object(map) if map.len() == 1 => map.iter().next().and_then(|(field, value)| {
                value.as_str().map(|value| Self::Exact {
                    field: field.to_owned(),
                    value: value.to_owned(),
                })
            }),
            JsonValue::Array(items) => Self::from_json_array(items),
            _ => None,
        };
        condition.ok_or_else(|| D::Error::custom(format!("unrecognized policy condition: {}", value)))
    }
}
