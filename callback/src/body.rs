use serde::{
    de::{Deserializer, Error as DeserializeError},
    Deserialize, Serialize,
};
use serde_json::Value as JsonValue;

/// 上传回调请求体
///
/// OSS 在上传完成后回调应用服务器时携带的对象信息，与默认回调请求体模版中的字段一一对应。
///
/// 数值字段兼容 JSON 数字，数字字符串，空字符串和 `null` 三种形态，后两者解析为 [`None`]；
/// 字符串字段遇到 `null` 时解析为空字符串。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackBody {
    #[serde(default, deserialize_with = "null_as_default")]
    bucket: String,
    #[serde(default, deserialize_with = "null_as_default")]
    object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    etag: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    mime_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    image_info: ImageInfo,
    #[serde(default, deserialize_with = "lenient_u64")]
    crc64: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    content_md5: String,
    #[serde(default)]
    vpc_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    client_ip: String,
    #[serde(default, deserialize_with = "null_as_default")]
    req_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    operation: String,
}

impl CallbackBody {
    /// 存储空间名称
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// 对象名称
    #[inline]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// 对象的 ETag
    #[inline]
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// 对象大小，单位为字节
    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// 对象的 MIME 类型
    #[inline]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// 图片信息，对于非图片对象所有字段均为空
    #[inline]
    pub fn image_info(&self) -> &ImageInfo {
        &self.image_info
    }

    /// 对象的 CRC64 校验值，与 `x-oss-hash-crc64ecma` 响应头一致
    #[inline]
    pub fn crc64(&self) -> Option<u64> {
        self.crc64
    }

    /// 对象的 Content-MD5，仅 PutObject 和 PostObject 上传时存在
    #[inline]
    pub fn content_md5(&self) -> &str {
        &self.content_md5
    }

    /// 客户端所在的 VPC ID，不是通过 VPC 发起的请求则为 [`None`]
    #[inline]
    pub fn vpc_id(&self) -> Option<&str> {
        self.vpc_id.as_deref()
    }

    /// 客户端 IP 地址
    #[inline]
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    /// 请求 ID
    #[inline]
    pub fn req_id(&self) -> &str {
        &self.req_id
    }

    /// 发起上传的接口名称，例如 `PutObject`，`PostObject`
    #[inline]
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

/// 图片信息
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default, deserialize_with = "lenient_u64")]
    height: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    width: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    format: String,
}

impl ImageInfo {
    /// 图片高度
    #[inline]
    pub fn height(&self) -> Option<u64> {
        self.height
    }

    /// 图片宽度
    #[inline]
    pub fn width(&self) -> Option<u64> {
        self.width
    }

    /// 图片格式，例如 `jpg`，`png`
    #[inline]
    pub fn format(&self) -> &str {
        &self.format
    }
}

fn null_as_default<'de, D: Deserializer<'de>, T: Default + Deserialize<'de>>(deserializer: D) -> Result<T, D::Error> {
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(None),
        JsonValue::Number(number) => number
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {}", number))),
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| D::Error::custom(format!("invalid unsigned integer {:?}: {}", s, err))),
        other => Err(D::Error::custom(format!("expected unsigned integer, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_body() -> anyhow::Result<()> {
        let body: CallbackBody = serde_json::from_str(include_str!("../testdata/callback_body.json"))?;
        assert_eq!(body.bucket(), "bucket-name");
        assert_eq!(body.object(), "user-dir-prefix/photo.jpg");
        assert_eq!(body.etag(), "D8E8FCA2DC0F896FD7CB4CB0031BA249");
        assert_eq!(body.size(), Some(1024));
        assert_eq!(body.mime_type(), "image/jpeg");
        assert_eq!(body.image_info().height(), Some(480));
        assert_eq!(body.image_info().width(), Some(640));
        assert_eq!(body.image_info().format(), "jpg");
        assert_eq!(body.crc64(), Some(14_615_347_467_451_166_287));
        assert_eq!(body.content_md5(), "2Oj8otwPiW/Xy0ywAxuiSQ==");
        assert_eq!(body.vpc_id(), None);
        assert_eq!(body.client_ip(), "192.0.2.1");
        assert_eq!(body.req_id(), "5F2A9B3C8D7E6F1A2B3C4D5E");
        assert_eq!(body.operation(), "PutObject");
        Ok(())
    }

    #[test]
    fn test_parse_non_image_callback_body() -> anyhow::Result<()> {
        let body: CallbackBody = serde_json::from_str(
            r#"{"bucket":"b","object":"a.txt","etag":"E","size":"12","mimeType":"text/plain","imageInfo":{"height":"","width":"","format":""},"crc64":"","contentMd5":null,"vpcId":"vpc-1","clientIp":"192.0.2.1","reqId":"R","operation":"PostObject"}"#,
        )?;
        assert_eq!(body.size(), Some(12));
        assert_eq!(body.image_info(), &ImageInfo::default());
        assert_eq!(body.crc64(), None);
        assert_eq!(body.content_md5(), "");
        assert_eq!(body.vpc_id(), Some("vpc-1"));
        Ok(())
    }

    #[test]
    fn test_parse_sparse_callback_body() -> anyhow::Result<()> {
        let body: CallbackBody = serde_json::from_str(r#"{"bucket":"b","object":"o","imageInfo":null}"#)?;
        assert_eq!(body.bucket(), "b");
        assert_eq!(body.size(), None);
        assert_eq!(body.image_info().format(), "");
        Ok(())
    }

    #[test]
    fn test_reject_malformed_numbers() {
        assert!(serde_json::from_str::<CallbackBody>(r#"{"size":-1}"#).is_err());
        assert!(serde_json::from_str::<CallbackBody>(r#"{"size":"ten"}"#).is_err());
        assert!(serde_json::from_str::<CallbackBody>(r#"{"size":[1]}"#).is_err());
        assert!(serde_json::from_str::<CallbackBody>(r#"{"size":1.5}"#).is_err());
    }
}
