//! Signed-in session: owns the data cache and its background refreshes.

use std::sync::Arc;

use color_eyre::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::activity::ActivitySignal;
use crate::api::{ApiClient, FetchError};
use crate::cache::{DataCache, DataSource, PlanEnrollment, Refresh, Resource};
use crate::config::Config;

/// A user session.
///
/// `start` initialises the cache and begins watching host activity; `end`
/// tears the cache down. Consumers get the cache through `cache()` rather
/// than any global.
pub struct Session<S: DataSource + ?Sized + 'static = ApiClient> {
  cache: Arc<DataCache>,
  source: Arc<S>,
  watcher: JoinHandle<()>,
}

impl Session<ApiClient> {
  /// Open a session against the configured API.
  pub fn connect(config: &Config, activity: &ActivitySignal) -> Result<Self> {
    let api = ApiClient::new(config)?;
    info!(user = api.user_id(), "starting session");
    let cache = Arc::new(DataCache::new(config.cache.ttl()));
    Ok(Self::start(cache, Arc::new(api), activity))
  }
}

impl<S: DataSource + PlanEnrollment + ?Sized + 'static> Session<S> {
  /// Enroll in a plan and store the returned plan list without refetching.
  ///
  /// Returns whether the plan list was cached; it is not once the session
  /// has ended, even though the enrollment itself went through.
  pub async fn enroll(&self, plan_id: &str) -> Result<bool, FetchError> {
    let plans = self.source.enroll(plan_id).await?;
    info!(plan = plan_id, total = plans.len(), "enrolled in plan");
    let cached = self.cache.active_plans().apply_local_update(plans);
    if !cached {
      warn!(plan = plan_id, "session already ended, plan list not cached");
    }
    Ok(cached)
  }
}

impl<S: DataSource + ?Sized + 'static> Session<S> {
  pub fn start(cache: Arc<DataCache>, source: Arc<S>, activity: &ActivitySignal) -> Self {
    cache.init();
    let watcher = cache.watch_foreground(activity.subscribe(), Arc::clone(&source));
    Self {
      cache,
      source,
      watcher,
    }
  }

  pub fn cache(&self) -> &Arc<DataCache> {
    &self.cache
  }

  pub fn source(&self) -> &Arc<S> {
    &self.source
  }

  /// Fetch every resource at once; used on session start and manual refresh.
  pub async fn refresh_all(&self) -> Vec<(Resource, Refresh)> {
    let outcomes = self
      .cache
      .refresh_all(self.source.as_ref(), &Resource::ALL)
      .await;
    for (resource, outcome) in &outcomes {
      if let Refresh::Failed(e) = outcome {
        warn!(%resource, error = %e, "refresh failed");
      }
    }
    outcomes
  }

  /// End the session. Fetches still running land on a torn-down cache.
  pub fn end(&self) {
    self.watcher.abort();
    self.cache.teardown();
    info!("session ended");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{ActivePlans, ProfilePicture, Subscription};
  use futures::future::BoxFuture;
  use futures::FutureExt;
  use tokio::sync::Notify;

  /// Source whose plans fetch waits for a notification.
  struct SlowSource {
    release: Arc<Notify>,
  }

  impl DataSource for SlowSource {
    fn profile_picture(&self) -> BoxFuture<'static, Result<ProfilePicture, FetchError>> {
      async { Ok(ProfilePicture::default()) }.boxed()
    }

    fn subscription(&self) -> BoxFuture<'static, Result<Subscription, FetchError>> {
      async { Ok(Subscription::None) }.boxed()
    }

    fn active_plans(&self) -> BoxFuture<'static, Result<ActivePlans, FetchError>> {
      let release = Arc::clone(&self.release);
      async move {
        release.notified().await;
        Ok(vec!["plan-1".to_string()])
      }
      .boxed()
    }
  }

  impl PlanEnrollment for SlowSource {
    fn enroll(&self, plan_id: &str) -> BoxFuture<'static, Result<ActivePlans, FetchError>> {
      let plans = vec!["plan-1".to_string(), plan_id.to_string()];
      async move { Ok(plans) }.boxed()
    }
  }

  fn session() -> Session<SlowSource> {
    let activity = ActivitySignal::new(true);
    Session::start(
      Arc::new(DataCache::new(chrono::Duration::minutes(5))),
      Arc::new(SlowSource {
        release: Arc::new(Notify::new()),
      }),
      &activity,
    )
  }

  #[tokio::test]
  async fn test_enroll_caches_returned_plans() {
    let session = session();

    assert_eq!(session.enroll("plan-7").await, Ok(true));

    let plans = session.cache().active_plans();
    assert_eq!(
      plans.value(),
      Some(vec!["plan-1".to_string(), "plan-7".to_string()])
    );
    assert!(!plans.is_stale());
    assert!(!plans.fetch_state().is_busy());
    session.end();
  }

  #[tokio::test]
  async fn test_enroll_after_end_reports_not_cached() {
    let session = session();
    session.end();

    assert_eq!(session.enroll("plan-7").await, Ok(false));
    assert_eq!(session.cache().active_plans().value(), None);
  }

  #[tokio::test]
  async fn test_late_fetch_after_end_is_dropped() {
    let release = Arc::new(Notify::new());
    let activity = ActivitySignal::new(true);
    let cache = Arc::new(DataCache::new(chrono::Duration::minutes(5)));
    let session = Session::start(
      Arc::clone(&cache),
      Arc::new(SlowSource {
        release: Arc::clone(&release),
      }),
      &activity,
    );

    let pending = tokio::spawn({
      let cache = Arc::clone(&cache);
      let source = Arc::clone(session.source());
      async move { cache.force_refresh(Resource::ActivePlans, source.as_ref()).await }
    });
    while !cache.fetch_state(Resource::ActivePlans).is_busy() {
      tokio::task::yield_now().await;
    }

    session.end();
    release.notify_one();

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Refresh::Inactive | Refresh::Discarded));
    assert_eq!(cache.active_plans().value(), None);
    assert!(!cache.is_active());
  }

  #[tokio::test]
  async fn test_refresh_all_populates_cache() {
    let release = Arc::new(Notify::new());
    release.notify_one();
    let activity = ActivitySignal::new(true);
    let session = Session::start(
      Arc::new(DataCache::new(chrono::Duration::minutes(5))),
      Arc::new(SlowSource { release }),
      &activity,
    );

    let outcomes = session.refresh_all().await;

    assert!(outcomes.iter().all(|(_, r)| *r == Refresh::Updated));
    assert_eq!(session.cache().subscription().value(), Some(Subscription::None));
    assert_eq!(
      session.cache().active_plans().value(),
      Some(vec!["plan-1".to_string()])
    );
    session.end();
  }
}
