//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 敏感信息脱敏工具
//!
//! 防止 API 密钥等凭据泄露到日志和调试输出中

use secrecy::{ExposeSecret, SecretString};

/// 脱敏敏感信息
///
/// # 参数
/// * `value` - 需要脱敏的值
/// * `visible_chars` - 保留的可见字符数
///
/// # 返回值
/// 返回脱敏后的字符串，格式为：`****{last_chars}`
///
/// # 示例
/// ```
/// use savesync::utils::redaction::redact_value;
/// let masked = redact_value("password123", 3);
/// assert_eq!(masked, "****123");
/// ```
pub fn redact_value(value: &str, visible_chars: usize) -> String {
    let len = value.chars().count();
    if len <= visible_chars {
        // 如果值太短，完全隐藏
        "*".repeat(len)
    } else {
        let tail: String = value.chars().skip(len - visible_chars).collect();
        format!("{}{}", "*".repeat(4), tail)
    }
}

/// 脱敏凭据
///
/// 只保留最后 4 个字符，用于区分不同的 API 密钥
pub fn redact_secret(secret: &SecretString) -> String {
    redact_value(secret.expose_secret(), 4)
}
