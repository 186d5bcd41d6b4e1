//! Wire and domain types for the tracked session resources.
//!
//! Wire types mirror the backend JSON; domain types are what the cache
//! stores. Conversion is where payload shape is checked, so nothing
//! half-valid reaches the cache.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::FetchError;

// ============================================================================
// Domain types
// ============================================================================

/// The user's profile picture, if one was uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfilePicture {
  pub url: Option<String>,
}

/// Subscription tier data for the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
  /// Backend answered `{ "type": null }`
  None,
  Active(SubscriptionDetails),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDetails {
  /// Tier name, e.g. "gold"
  pub tier: String,
  /// Billing status, e.g. "active", "trialing", "past_due"
  pub status: String,
  pub current_period_end: Option<DateTime<Utc>>,
  pub product_name: Option<String>,
}

impl Subscription {
  pub fn tier(&self) -> Option<&str> {
    match self {
      Subscription::None => None,
      Subscription::Active(details) => Some(&details.tier),
    }
  }

  /// Whether the subscription currently grants access.
  pub fn is_in_good_standing(&self) -> bool {
    match self {
      Subscription::None => false,
      Subscription::Active(details) => matches!(details.status.as_str(), "active" | "trialing"),
    }
  }
}

/// Ordered list of plan identifiers the user is enrolled in.
pub type ActivePlans = Vec<String>;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProfilePicture {
  pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSubscription {
  #[serde(rename = "type")]
  pub tier: Option<String>,
  pub status: Option<String>,
  #[serde(rename = "currentPeriodEnd", default, with = "chrono::serde::ts_seconds_option")]
  pub current_period_end: Option<DateTime<Utc>>,
  #[serde(rename = "productName")]
  pub product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPlans {
  pub plans: Vec<String>,
}

// ============================================================================
// Validation at the fetch boundary
// ============================================================================

/// Status attached to schema errors when the HTTP layer itself succeeded.
const SCHEMA_ERROR_STATUS: u16 = 200;

fn schema_error(what: &str, detail: impl std::fmt::Display) -> FetchError {
  FetchError::upstream(SCHEMA_ERROR_STATUS, format!("unexpected {} payload: {}", what, detail))
}

impl TryFrom<ApiProfilePicture> for ProfilePicture {
  type Error = FetchError;

  fn try_from(api: ApiProfilePicture) -> Result<Self, Self::Error> {
    match api.url {
      None => Ok(ProfilePicture { url: None }),
      Some(raw) if raw.trim().is_empty() => Ok(ProfilePicture { url: None }),
      Some(raw) => {
        let parsed = url::Url::parse(&raw).map_err(|e| schema_error("profile picture", e))?;
        Ok(ProfilePicture {
          url: Some(parsed.to_string()),
        })
      }
    }
  }
}

impl TryFrom<ApiSubscription> for Subscription {
  type Error = FetchError;

  fn try_from(api: ApiSubscription) -> Result<Self, Self::Error> {
    let Some(tier) = api.tier else {
      return Ok(Subscription::None);
    };
    let status = api
      .status
      .ok_or_else(|| schema_error("subscription", format!("tier {} has no status", tier)))?;

    Ok(Subscription::Active(SubscriptionDetails {
      tier,
      status,
      current_period_end: api.current_period_end,
      product_name: api.product_name,
    }))
  }
}

impl TryFrom<ApiPlans> for ActivePlans {
  type Error = FetchError;

  fn try_from(api: ApiPlans) -> Result<Self, Self::Error> {
    if api.plans.iter().any(|p| p.trim().is_empty()) {
      return Err(schema_error("plans", "empty plan identifier"));
    }
    Ok(api.plans)
  }
}

/// Decode a JSON body into a wire type and convert it to its domain type.
pub fn decode<W, D>(what: &str, body: &[u8]) -> Result<D, FetchError>
where
  W: serde::de::DeserializeOwned,
  D: TryFrom<W, Error = FetchError>,
{
  let wire: W = serde_json::from_slice(body).map_err(|e| schema_error(what, e))?;
  D::try_from(wire)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_subscription() {
    let body = br#"{"type":"gold","status":"active","currentPeriodEnd":1767225600,"productName":"Gold Care"}"#;
    let sub: Subscription = decode::<ApiSubscription, _>("subscription", body).unwrap();

    let Subscription::Active(details) = &sub else {
      panic!("expected active subscription");
    };
    assert_eq!(details.tier, "gold");
    assert_eq!(details.product_name.as_deref(), Some("Gold Care"));
    assert_eq!(
      details.current_period_end.map(|t| t.timestamp()),
      Some(1_767_225_600)
    );
    assert!(sub.is_in_good_standing());
  }

  #[test]
  fn test_decode_null_subscription() {
    let sub: Subscription = decode::<ApiSubscription, _>("subscription", br#"{"type":null}"#).unwrap();
    assert_eq!(sub, Subscription::None);
    assert_eq!(sub.tier(), None);
    assert!(!sub.is_in_good_standing());
  }

  #[test]
  fn test_subscription_without_status_is_rejected() {
    let err = decode::<ApiSubscription, Subscription>("subscription", br#"{"type":"gold"}"#)
      .unwrap_err();
    assert_eq!(err.status(), Some(SCHEMA_ERROR_STATUS));
  }

  #[test]
  fn test_past_due_is_not_in_good_standing() {
    let sub: Subscription = decode::<ApiSubscription, _>(
      "subscription",
      br#"{"type":"silver","status":"past_due"}"#,
    )
    .unwrap();
    assert!(!sub.is_in_good_standing());
  }

  #[test]
  fn test_decode_plans_keeps_order() {
    let plans: ActivePlans =
      decode::<ApiPlans, _>("plans", br#"{"plans":["plan-2","plan-1"]}"#).unwrap();
    assert_eq!(plans, vec!["plan-2".to_string(), "plan-1".to_string()]);
  }

  #[test]
  fn test_plans_with_blank_id_are_rejected() {
    assert!(decode::<ApiPlans, ActivePlans>("plans", br#"{"plans":["plan-1",""]}"#).is_err());
  }

  #[test]
  fn test_malformed_json_is_upstream_error() {
    let err = decode::<ApiPlans, ActivePlans>("plans", b"<html>").unwrap_err();
    assert!(matches!(err, FetchError::Upstream { .. }));
  }

  #[test]
  fn test_profile_picture_url_is_validated() {
    let pic: ProfilePicture = decode::<ApiProfilePicture, _>(
      "profile picture",
      br#"{"url":"https://cdn.example.com/u/1.png"}"#,
    )
    .unwrap();
    assert_eq!(pic.url.as_deref(), Some("https://cdn.example.com/u/1.png"));

    let empty: ProfilePicture =
      decode::<ApiProfilePicture, _>("profile picture", br#"{"url":null}"#).unwrap();
    assert_eq!(empty, ProfilePicture::default());

    assert!(
      decode::<ApiProfilePicture, ProfilePicture>("profile picture", br#"{"url":"not a url"}"#)
        .is_err()
    );
  }
}
