use md5::{Digest, Md5};
use thiserror::Error;

/// MD5 摘要长度
pub const AUTH_DIGEST_LEN: usize = 16;

/// 对请求路径进行百分号解码
///
/// 每个 `/` 分隔的路径段独立解码，转义的斜杠 `%2F` / `%2f` 保持原样，
/// 因此解码结果不会产生新的路径段。`+` 不会被解码为空格。
pub fn unescape_path(path: &str) -> Result<Vec<u8>, MalformedPathError> {
    let bytes = path.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            decoded.push(bytes[i]);
            i += 1;
            continue;
        }
        let byte = bytes
            .get(i + 1..i + 3)
            .and_then(|hex| Some((hex_value(hex[0])? << 4) | hex_value(hex[1])?))
            .ok_or_else(|| MalformedPathError {
                path: path.to_owned(),
                position: i,
            })?;
        if byte == b'/' {
            decoded.extend_from_slice(&bytes[i..i + 3]);
        } else {
            decoded.push(byte);
        }
        i += 3;
    }
    Ok(decoded)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// 构造待签名字符串
///
/// 查询字符串为空时为 `解码后的路径 + "\n" + 请求体`，
/// 否则为 `解码后的路径 + "?" + 原始查询字符串 + "\n" + 请求体`，查询字符串不做解码。
pub fn auth_string(path: &str, query: &str, body: &[u8]) -> Result<Vec<u8>, MalformedPathError> {
    let mut auth = unescape_path(path)?;
    if !query.is_empty() {
        auth.push(b'?');
        auth.extend_from_slice(query.as_bytes());
    }
    auth.push(b'\n');
    auth.extend_from_slice(body);
    Ok(auth)
}

/// 计算待签名字符串的 MD5 摘要
pub fn auth_digest(path: &str, query: &str, body: &[u8]) -> Result<[u8; AUTH_DIGEST_LEN], MalformedPathError> {
    let mut digest = [0u8; AUTH_DIGEST_LEN];
    digest.copy_from_slice(&Md5::digest(auth_string(path, query, body)?));
    Ok(digest)
}

/// 请求路径中存在非法的百分号转义
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed percent-encoding at byte {position} of path {path:?}")]
pub struct MalformedPathError {
    path: String,
    position: usize,
}

impl MalformedPathError {
    /// 原始请求路径
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 非法转义在路径中的字节偏移
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}
