//! Core traits and types for the caching system.

use std::fmt;

use futures::future::BoxFuture;

use crate::api::{ActivePlans, FetchError, ProfilePicture, Subscription};

/// Resources tracked by the session cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
  ProfilePicture,
  Subscription,
  ActivePlans,
}

impl Resource {
  pub const ALL: [Resource; 3] = [
    Resource::ProfilePicture,
    Resource::Subscription,
    Resource::ActivePlans,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Resource::ProfilePicture => "profilePicture",
      Resource::Subscription => "subscription",
      Resource::ActivePlans => "activePlans",
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Source of fresh values for each tracked resource.
///
/// Each method returns an owned future so the fetch can run on its own task.
/// Implementations must be idempotent and safe to call repeatedly, and must
/// fail with `FetchError` on non-success responses or transport errors.
pub trait DataSource: Send + Sync {
  fn profile_picture(&self) -> BoxFuture<'static, Result<ProfilePicture, FetchError>>;

  fn subscription(&self) -> BoxFuture<'static, Result<Subscription, FetchError>>;

  fn active_plans(&self) -> BoxFuture<'static, Result<ActivePlans, FetchError>>;
}

/// Plan enrollment. The response is the user's new plan list, authoritative
/// enough to be cached without a refetch.
pub trait PlanEnrollment: Send + Sync {
  fn enroll(&self, plan_id: &str) -> BoxFuture<'static, Result<ActivePlans, FetchError>>;
}

/// Outcome of a refresh request against one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
  /// Cached value was still within its ttl; nothing fetched
  Fresh,
  /// Fetch succeeded and the cached value was replaced
  Updated,
  /// Fetch failed; the previous value is still served
  Failed(FetchError),
  /// Fetch completed after a newer write landed; its result was dropped
  Discarded,
  /// Cache has been torn down
  Inactive,
}

impl Refresh {
  pub fn is_failed(&self) -> bool {
    matches!(self, Refresh::Failed(_))
  }
}

/// In-flight flags for one resource.
///
/// Both flags come from the same state read so they are never set together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchState {
  /// First fetch of a resource that has never been populated
  pub is_loading: bool,
  /// Revalidation of a resource that already holds a value
  pub is_refreshing: bool,
}

impl FetchState {
  pub fn is_busy(&self) -> bool {
    self.is_loading || self.is_refreshing
  }
}
