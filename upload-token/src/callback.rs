use super::Config;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 默认上传回调请求体模版
///
/// 包含 OSS 上传回调支持的全部系统变量，由 OSS 在回调时展开
pub const DEFAULT_CALLBACK_BODY: &str = r#"{"bucket":${bucket},"object":${object},"etag":${etag},"size":${size},"mimeType":${mimeType},"imageInfo":{"height":${imageInfo.height},"width":${imageInfo.width},"format":${imageInfo.format}},"crc64":${crc64},"contentMd5":${contentMd5},"vpcId":${vpcId},"clientIp":${clientIp},"reqId":${reqId},"operation":${operation}}"#;

/// 上传回调参数
///
/// 序列化为 `{"callbackUrl":...,"callbackBody":...,"callbackBodyType":...}` 后，
/// 经 Base64 编码放入签名凭证的 `callback` 字段
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Callback {
    callback_url: String,
    callback_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    callback_body_type: String,
}

impl Callback {
    /// 创建上传回调参数，请求体类型为 `application/json`
    pub fn new(callback_url: impl Into<String>, callback_body: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
            callback_body: callback_body.into(),
            callback_body_type: mime::APPLICATION_JSON.to_string(),
        }
    }

    /// 指定上传回调请求体的 `Content-Type`
    #[inline]
    #[must_use]
    pub fn with_body_type(mut self, callback_body_type: impl Into<String>) -> Self {
        self.callback_body_type = callback_body_type.into();
        self
    }

    /// 根据签名凭证配置生成上传回调参数
    ///
    /// 仅当配置了回调地址时返回。
    /// 未配置的请求体模版使用 [`DEFAULT_CALLBACK_BODY`]，未配置的请求体类型使用 `application/json`。
    pub fn from_config(config: &Config) -> Option<Self> {
        if config.callback_url().is_empty() {
            return None;
        }
        let callback_body = match config.callback_body() {
            "" => DEFAULT_CALLBACK_BODY,
            body => body,
        };
        let callback = Self::new(config.callback_url(), callback_body);
        Some(match config.callback_body_type() {
            "" => callback,
            body_type => callback.with_body_type(body_type),
        })
    }

    /// 回调地址
    #[inline]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// 回调请求体模版
    #[inline]
    pub fn callback_body(&self) -> &str {
        &self.callback_body
    }

    /// 回调请求体的 `Content-Type`
    #[inline]
    pub fn callback_body_type(&self) -> &str {
        &self.callback_body_type
    }

    /// 检查回调参数是否完整
    pub fn validate(&self) -> Result<(), InvalidCallback> {
        if self.callback_url.is_empty() {
            Err(InvalidCallback::MissingUrl)
        } else if self.callback_body.is_empty() {
            Err(InvalidCallback::MissingBody)
        } else {
            Ok(())
        }
    }
}

/// 不完整的上传回调参数
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidCallback {
    /// 缺少回调地址
    #[error("callback url is empty")]
    MissingUrl,
    /// 缺少回调请求体模版
    #[error("callback body is empty")]
    MissingBody,
}
