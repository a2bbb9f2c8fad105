use std::fmt;

use serde::{Deserialize, Serialize};

// =========================================================
// 错误状态枚举
// =========================================================

/// 错误状态枚举
/// 包含错误对应的语义（状态码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LunaErrorStatus {
    /// 0: 请求未到达后端 (fetch 失败、离线)
    Network,
    /// 500: 后端返回了非 2xx 响应
    Backend,
    /// 401: 会话无效或已过期
    Unauthorized,
    /// 404: 资源未找到
    NotFound,
    /// 422: 响应体解析失败
    Serialization,
    /// 400: 调用参数不合法
    InvalidInput,
}

impl LunaErrorStatus {
    pub fn status_code(&self) -> u16 {
        match self {
            LunaErrorStatus::Network => 0,
            LunaErrorStatus::InvalidInput => 400,
            LunaErrorStatus::Unauthorized => 401,
            LunaErrorStatus::NotFound => 404,
            LunaErrorStatus::Serialization => 422,
            LunaErrorStatus::Backend => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LunaErrorStatus::Network => "NETWORK_ERROR",
            LunaErrorStatus::Backend => "BACKEND_ERROR",
            LunaErrorStatus::Unauthorized => "UNAUTHORIZED",
            LunaErrorStatus::NotFound => "RESOURCE_NOT_FOUND",
            LunaErrorStatus::Serialization => "JSON_PARSE_ERROR",
            LunaErrorStatus::InvalidInput => "INVALID_INPUT",
        }
    }

    /// 根据后端返回的 HTTP 状态码归类
    pub fn from_http(status: u16) -> Self {
        match status {
            401 | 403 => LunaErrorStatus::Unauthorized,
            404 => LunaErrorStatus::NotFound,
            400 | 422 => LunaErrorStatus::InvalidInput,
            _ => LunaErrorStatus::Backend,
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSpan {
    /// 操作名称，如 "roles.fetch", "auth.sign_in"
    pub operation: String,
    /// 额外的细节信息，如 identity id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 客户端统一错误类型
///
/// - status: 错误类型/语义
/// - message: 错误消息
/// - source: 原始错误（可选，用于错误链）
/// - spans: 结构化的调用追踪栈
#[derive(Debug)]
pub struct LunaError {
    pub status: LunaErrorStatus,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl LunaError {
    pub fn new(status: LunaErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LunaErrorStatus::Network, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(LunaErrorStatus::Backend, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(LunaErrorStatus::Serialization, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(LunaErrorStatus::InvalidInput, message)
    }

    /// 由非 2xx 响应构造，body 若是后端错误 JSON 则提取其 message
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<BackendErrorBody>(body)
            .ok()
            .and_then(|b| b.best_message())
            .unwrap_or_else(|| format!("HTTP {}", status));
        Self::new(LunaErrorStatus::from_http(status), message)
    }

    // --- Context builders (Builder Pattern) ---

    /// 添加操作追踪（无额外细节）
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    /// 添加操作追踪（带额外细节）
    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    /// 设置原始错误源
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // --- Accessors ---

    pub fn status_code(&self) -> u16 {
        self.status.status_code()
    }

    pub fn error_code(&self) -> &'static str {
        self.status.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }
}

impl fmt::Display for LunaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for LunaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for LunaError {
    fn from(e: serde_json::Error) -> Self {
        LunaError::serialization(e.to_string()).with_source(e)
    }
}

pub type LunaResult<T> = std::result::Result<T, LunaError>;

// =========================================================
// 后端错误响应体
// =========================================================

/// REST / Auth 端点返回的错误 JSON
///
/// 数据接口使用 `message`，认证接口使用 `error_description` 或 `msg`。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl BackendErrorBody {
    fn best_message(self) -> Option<String> {
        self.message.or(self.error_description).or(self.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_trace() {
        let err = LunaError::backend("boom")
            .in_op("roles.fetch")
            .in_op_with("roles.resolve", "u-1");
        assert_eq!(
            err.to_string(),
            "[BACKEND_ERROR] boom | trace: roles.fetch -> roles.resolve(u-1)"
        );
        assert_eq!(err.spans().len(), 2);
    }

    #[test]
    fn test_from_response_uses_backend_message() {
        let body = r#"{"message":"JWT expired","code":"PGRST301"}"#;
        let err = LunaError::from_response(401, body);
        assert_eq!(err.status, LunaErrorStatus::Unauthorized);
        assert_eq!(err.message(), "JWT expired");
    }

    #[test]
    fn test_from_response_auth_error_shape() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        let err = LunaError::from_response(400, body);
        assert_eq!(err.status, LunaErrorStatus::InvalidInput);
        assert_eq!(err.message(), "Invalid login credentials");
    }

    #[test]
    fn test_from_response_non_json_body() {
        let err = LunaError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.status, LunaErrorStatus::Backend);
        assert_eq!(err.message(), "HTTP 502");
        assert_eq!(err.status_code(), 500);
    }
}
