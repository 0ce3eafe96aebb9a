use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt, ops::Deref};

/// OSS AccessKey ID
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessKeyId {
    inner: String,
}

/// OSS AccessKey Secret
///
/// 格式化输出时不会暴露内容
#[derive(Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct AccessKeySecret {
    inner: String,
}

macro_rules! impl_key_string {
    ($name:ident) => {
        impl $name {
            /// 获取字符串
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.inner
            }

            /// 转换为字符串
            #[inline]
            pub fn into_string(self) -> String {
                self.inner
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(inner: String) -> Self {
                Self { inner }
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(s: &str) -> Self {
                Self { inner: s.to_owned() }
            }
        }

        impl Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.inner
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.inner
            }
        }
    };
}

impl_key_string!(AccessKeyId);
impl_key_string!(AccessKeySecret);

impl fmt::Debug for AccessKeyId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for AccessKeyId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for AccessKeySecret {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CENSORED")
    }
}
