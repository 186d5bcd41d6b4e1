use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{header, Client, Method};
use serde::Serialize;
use tracing::debug;

use crate::cache::{DataSource, PlanEnrollment};
use crate::config::Config;

use super::error::FetchError;
use super::types::{
  decode, ActivePlans, ApiPlans, ApiProfilePicture, ApiSubscription, ProfilePicture, Subscription,
};

/// HTTP client for the MediCure user-data endpoints.
/// Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base_url: url::Url,
  user_id: String,
  token: String,
}

#[derive(Serialize)]
struct EnrollRequest<'a> {
  #[serde(rename = "planId")]
  plan_id: &'a str,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_access_token()?;

    let client = Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let base_url = url::Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid API url {}: cannot hold a path", config.api.url));
    }

    Ok(Self {
      client,
      base_url,
      user_id: config.api.user_id.clone(),
      token,
    })
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  /// `{base}/users/{user_id}/{resource}`, with the user id escaped as one segment.
  fn endpoint(&self, resource: &str) -> Result<url::Url, FetchError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| FetchError::Network(format!("invalid endpoint for {}", resource)))?
      .pop_if_empty()
      .extend(["users", self.user_id.as_str(), resource]);
    Ok(url)
  }

  /// Send a request and return the body of a successful response.
  async fn send(
    &self,
    method: Method,
    resource: &str,
    body: Option<serde_json::Value>,
  ) -> Result<Vec<u8>, FetchError> {
    let url = self.endpoint(resource)?;
    debug!(%method, %url, "api request");

    let mut request = self
      .client
      .request(method, url)
      .bearer_auth(&self.token)
      .header(header::ACCEPT, "application/json");
    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
      return Err(FetchError::from_status(
        status.as_u16(),
        &String::from_utf8_lossy(&bytes),
      ));
    }

    Ok(bytes.to_vec())
  }

  pub async fn get_profile_picture(&self) -> Result<ProfilePicture, FetchError> {
    let body = self.send(Method::GET, "profile-picture", None).await?;
    decode::<ApiProfilePicture, _>("profile picture", &body)
  }

  pub async fn get_subscription(&self) -> Result<Subscription, FetchError> {
    let body = self.send(Method::GET, "subscription", None).await?;
    decode::<ApiSubscription, _>("subscription", &body)
  }

  pub async fn get_active_plans(&self) -> Result<ActivePlans, FetchError> {
    let body = self.send(Method::GET, "plans", None).await?;
    decode::<ApiPlans, _>("plans", &body)
  }

  /// Enroll the user in a plan. Returns the updated list of active plans.
  pub async fn enroll_in_plan(&self, plan_id: &str) -> Result<ActivePlans, FetchError> {
    let payload = serde_json::to_value(EnrollRequest { plan_id })
      .map_err(|e| FetchError::Network(format!("failed to encode enrollment: {}", e)))?;
    let body = self.send(Method::POST, "plans", Some(payload)).await?;
    decode::<ApiPlans, _>("plans", &body)
  }
}

impl DataSource for ApiClient {
  fn profile_picture(&self) -> BoxFuture<'static, Result<ProfilePicture, FetchError>> {
    let api = self.clone();
    async move { api.get_profile_picture().await }.boxed()
  }

  fn subscription(&self) -> BoxFuture<'static, Result<Subscription, FetchError>> {
    let api = self.clone();
    async move { api.get_subscription().await }.boxed()
  }

  fn active_plans(&self) -> BoxFuture<'static, Result<ActivePlans, FetchError>> {
    let api = self.clone();
    async move { api.get_active_plans().await }.boxed()
  }
}

impl PlanEnrollment for ApiClient {
  fn enroll(&self, plan_id: &str) -> BoxFuture<'static, Result<ActivePlans, FetchError>> {
    let api = self.clone();
    let plan_id = plan_id.to_string();
    async move { api.enroll_in_plan(&plan_id).await }.boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(url: &str) -> ApiClient {
    client_for(url, "u-42")
  }

  fn client_for(url: &str, user_id: &str) -> ApiClient {
    ApiClient {
      client: Client::new(),
      base_url: url::Url::parse(url).unwrap(),
      user_id: user_id.to_string(),
      token: "token".to_string(),
    }
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let api = client("https://api.medicure.example/v1");
    assert_eq!(
      api.endpoint("subscription").unwrap().as_str(),
      "https://api.medicure.example/v1/users/u-42/subscription"
    );
  }

  #[test]
  fn test_endpoint_with_trailing_slash() {
    let api = client("https://api.medicure.example/v1/");
    assert_eq!(
      api.endpoint("plans").unwrap().as_str(),
      "https://api.medicure.example/v1/users/u-42/plans"
    );
  }

  #[test]
  fn test_endpoint_escapes_user_id() {
    let api = client_for("https://api.medicure.example/v1", "a/b?c#d");
    assert_eq!(
      api.endpoint("plans").unwrap().as_str(),
      "https://api.medicure.example/v1/users/a%2Fb%3Fc%23d/plans"
    );
  }

  #[tokio::test]
  async fn test_unreachable_host_is_network_error() {
    // Port 9 on localhost (discard) is closed in test environments
    let api = client("http://127.0.0.1:9");
    let err = api.get_active_plans().await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
  }
}
