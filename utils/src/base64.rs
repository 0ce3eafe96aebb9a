//! Base64 计算库
//!
//! OSS 的 PostObject 表单与回调请求头都使用标准字母表（带填充）的 Base64 编码

pub use base64::DecodeError;
use std::result::Result;

/// 使用标准字母表，将指定的二进制数据编码为 Base64 字符串
pub fn standard(data: &[u8]) -> String {
    base64::encode_config(data, base64::STANDARD)
}

/// 使用标准字母表，将指定的 Base64 字符串解码为二进制数据
pub fn decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    base64::decode_config(data, base64::STANDARD)
}
