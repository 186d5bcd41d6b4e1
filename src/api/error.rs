//! Errors surfaced by resource fetchers.

use thiserror::Error;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 300;

/// Failure of a single resource fetch.
///
/// Cloneable so one failure can be recorded on the cache slot and handed to
/// every caller that joined the same in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  /// The request never completed (offline, timeout, DNS, aborted task).
  #[error("network error: {0}")]
  Network(String),

  /// The request completed with a non-success status or an unusable payload.
  #[error("upstream error {status}: {}", .message.as_deref().unwrap_or("no message"))]
  Upstream {
    status: u16,
    message: Option<String>,
  },
}

impl FetchError {
  pub fn upstream(status: u16, message: impl Into<String>) -> Self {
    FetchError::Upstream {
      status,
      message: Some(message.into()),
    }
  }

  /// Build an upstream error from a non-success response.
  ///
  /// Prefers a `message` or `error` field from a JSON body, falling back to
  /// the (truncated) raw body.
  pub fn from_status(status: u16, body: &str) -> Self {
    let message = serde_json::from_str::<serde_json::Value>(body)
      .ok()
      .and_then(|v| {
        v.get("message")
          .or_else(|| v.get("error"))
          .and_then(|m| m.as_str())
          .map(String::from)
      })
      .or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| truncate_body(trimmed))
      });

    FetchError::Upstream { status, message }
  }

  /// HTTP status for upstream failures.
  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::Upstream { status, .. } => Some(*status),
      FetchError::Network(_) => None,
    }
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(e: reqwest::Error) -> Self {
    match e.status() {
      Some(status) => FetchError::Upstream {
        status: status.as_u16(),
        message: Some(e.to_string()),
      },
      None => FetchError::Network(e.to_string()),
    }
  }
}

fn truncate_body(body: &str) -> String {
  if body.len() <= MAX_ERROR_BODY_LENGTH {
    return body.to_string();
  }
  let mut end = MAX_ERROR_BODY_LENGTH;
  while !body.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}... ({} bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_status_uses_json_message() {
    let err = FetchError::from_status(403, r#"{"message":"plan requires gold tier"}"#);
    assert_eq!(
      err,
      FetchError::upstream(403, "plan requires gold tier")
    );
    assert_eq!(err.status(), Some(403));
  }

  #[test]
  fn test_from_status_falls_back_to_error_field() {
    let err = FetchError::from_status(500, r#"{"error":"boom"}"#);
    assert_eq!(err, FetchError::upstream(500, "boom"));
  }

  #[test]
  fn test_from_status_plain_body_is_truncated() {
    let body = "x".repeat(1000);
    let FetchError::Upstream { status, message } = FetchError::from_status(502, &body) else {
      panic!("expected upstream error");
    };
    assert_eq!(status, 502);
    let message = message.unwrap();
    assert!(message.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
    assert!(message.ends_with("(1000 bytes)"));
  }

  #[test]
  fn test_from_status_empty_body() {
    let err = FetchError::from_status(404, "  ");
    assert_eq!(
      err,
      FetchError::Upstream {
        status: 404,
        message: None
      }
    );
    assert_eq!(err.to_string(), "upstream error 404: no message");
  }

  #[test]
  fn test_network_error_has_no_status() {
    assert_eq!(FetchError::Network("timed out".into()).status(), None);
  }
}
