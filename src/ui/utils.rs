use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Human-readable age of a fetch, e.g. "just now", "4m ago", "2h ago"
pub fn format_age(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let minutes = (now - fetched_at).num_minutes();
  if minutes < 1 {
    // Also covers clock skew
    "just now".to_string()
  } else if minutes < 60 {
    format!("{}m ago", minutes)
  } else if minutes < 1440 {
    format!("{}h ago", minutes / 60)
  } else {
    format!("{}d ago", minutes / 1440)
  }
}

/// Get the display color for a subscription billing status
pub fn subscription_status_color(status: &str) -> Color {
  match status {
    "active" | "trialing" => Color::Green,
    "past_due" | "unpaid" => Color::Yellow,
    "canceled" | "incomplete_expired" => Color::Red,
    _ => Color::White,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("héllo wörld", 8), "héllo...");
  }

  #[test]
  fn test_format_age() {
    let now = Utc::now();
    assert_eq!(format_age(now, now), "just now");
    assert_eq!(format_age(now + Duration::minutes(2), now), "just now");
    assert_eq!(format_age(now - Duration::minutes(4), now), "4m ago");
    assert_eq!(format_age(now - Duration::minutes(130), now), "2h ago");
    assert_eq!(format_age(now - Duration::days(3), now), "3d ago");
  }

  #[test]
  fn test_subscription_status_color() {
    assert_eq!(subscription_status_color("active"), Color::Green);
    assert_eq!(subscription_status_color("past_due"), Color::Yellow);
    assert_eq!(subscription_status_color("canceled"), Color::Red);
    assert_eq!(subscription_status_color("paused"), Color::White);
  }
}
