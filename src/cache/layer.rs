//! Session cache that ties the resource slots to a data source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use crate::activity::Activity;
use super::slot::Slot;
use super::traits::{DataSource, FetchState, Refresh, Resource};
use crate::api::{ActivePlans, FetchError, ProfilePicture, Subscription};

/// Default validity window for cached resources, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Freshness-gated cache for the signed-in user's session data.
///
/// Created inactive; `init()` when the session starts and `teardown()` when
/// it ends. Each resource is tracked independently, so one can be stale
/// while another is fresh.
pub struct DataCache {
  profile_picture: Slot<ProfilePicture>,
  subscription: Slot<Subscription>,
  active_plans: Slot<ActivePlans>,
  active: Arc<AtomicBool>,
  ttl: Duration,
}

impl DataCache {
  pub fn new(ttl: Duration) -> Self {
    Self::with_clock(ttl, Arc::new(SystemClock))
  }

  pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
    let active = Arc::new(AtomicBool::new(false));
    Self {
      profile_picture: Slot::new(
        Resource::ProfilePicture.as_str(),
        ttl,
        Arc::clone(&clock),
        Arc::clone(&active),
      ),
      subscription: Slot::new(
        Resource::Subscription.as_str(),
        ttl,
        Arc::clone(&clock),
        Arc::clone(&active),
      ),
      active_plans: Slot::new(Resource::ActivePlans.as_str(), ttl, clock, Arc::clone(&active)),
      active,
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Start serving a session.
  pub fn init(&self) {
    self.active.store(true, Ordering::Release);
    info!(ttl_secs = self.ttl.num_seconds(), "session cache initialised");
  }

  /// Stop serving: later fetch results are dropped and everything is cleared.
  pub fn teardown(&self) {
    self.active.store(false, Ordering::Release);
    self.invalidate_all();
    info!("session cache torn down");
  }

  pub fn is_active(&self) -> bool {
    self.active.load(Ordering::Acquire)
  }

  pub fn profile_picture(&self) -> &Slot<ProfilePicture> {
    &self.profile_picture
  }

  pub fn subscription(&self) -> &Slot<Subscription> {
    &self.subscription
  }

  pub fn active_plans(&self) -> &Slot<ActivePlans> {
    &self.active_plans
  }

  pub fn is_stale(&self, resource: Resource) -> bool {
    match resource {
      Resource::ProfilePicture => self.profile_picture.is_stale(),
      Resource::Subscription => self.subscription.is_stale(),
      Resource::ActivePlans => self.active_plans.is_stale(),
    }
  }

  pub fn fetch_state(&self, resource: Resource) -> FetchState {
    match resource {
      Resource::ProfilePicture => self.profile_picture.fetch_state(),
      Resource::Subscription => self.subscription.fetch_state(),
      Resource::ActivePlans => self.active_plans.fetch_state(),
    }
  }

  pub fn last_error(&self, resource: Resource) -> Option<FetchError> {
    match resource {
      Resource::ProfilePicture => self.profile_picture.last_error(),
      Resource::Subscription => self.subscription.last_error(),
      Resource::ActivePlans => self.active_plans.last_error(),
    }
  }

  pub fn stale_resources(&self) -> Vec<Resource> {
    Resource::ALL
      .into_iter()
      .filter(|r| self.is_stale(*r))
      .collect()
  }

  /// Fetch `resource` from `source` if its cached value is missing or stale.
  pub async fn ensure_fresh<S>(&self, resource: Resource, source: &S) -> Refresh
  where
    S: DataSource + ?Sized,
  {
    match resource {
      Resource::ProfilePicture => {
        self
          .profile_picture
          .ensure_fresh(|| source.profile_picture())
          .await
      }
      Resource::Subscription => self.subscription.ensure_fresh(|| source.subscription()).await,
      Resource::ActivePlans => self.active_plans.ensure_fresh(|| source.active_plans()).await,
    }
  }

  /// Fetch `resource` from `source` regardless of freshness.
  pub async fn force_refresh<S>(&self, resource: Resource, source: &S) -> Refresh
  where
    S: DataSource + ?Sized,
  {
    match resource {
      Resource::ProfilePicture => {
        self
          .profile_picture
          .force_refresh(|| source.profile_picture())
          .await
      }
      Resource::Subscription => self.subscription.force_refresh(|| source.subscription()).await,
      Resource::ActivePlans => self.active_plans.force_refresh(|| source.active_plans()).await,
    }
  }

  /// Force-refresh every listed resource concurrently and wait for all of them.
  pub async fn refresh_all<S>(&self, source: &S, resources: &[Resource]) -> Vec<(Resource, Refresh)>
  where
    S: DataSource + ?Sized,
  {
    let refreshes = resources
      .iter()
      .map(|&resource| async move { (resource, self.force_refresh(resource, source).await) });
    let outcomes = join_all(refreshes).await;

    let failed = outcomes.iter().filter(|(_, r)| r.is_failed()).count();
    debug!(requested = resources.len(), failed, "refresh_all settled");
    outcomes
  }

  /// Passively revalidate every stale resource, leaving fresh ones alone.
  pub async fn revalidate_stale<S>(&self, source: &S) -> Vec<(Resource, Refresh)>
  where
    S: DataSource + ?Sized,
  {
    let stale = self.stale_resources();
    let refreshes = stale
      .into_iter()
      .map(|resource| async move { (resource, self.ensure_fresh(resource, source).await) });
    join_all(refreshes).await
  }

  /// Reset every resource to its never-fetched state.
  pub fn invalidate_all(&self) {
    self.profile_picture.invalidate();
    self.subscription.invalidate();
    self.active_plans.invalidate();
    debug!("all cached resources invalidated");
  }

  /// Revalidate stale resources whenever the host comes back to the foreground.
  ///
  /// Every return counts, including ones the watcher only sees after the
  /// host has flipped again. The task ends when the signal's sender is dropped.
  pub fn watch_foreground<S>(
    self: &Arc<Self>,
    mut signal: watch::Receiver<Activity>,
    source: Arc<S>,
  ) -> JoinHandle<()>
  where
    S: DataSource + ?Sized + 'static,
  {
    let cache = Arc::clone(self);
    // Read before spawning so a return that happens before the task first
    // runs is not taken as the baseline
    let mut returns = signal.borrow_and_update().returns;
    tokio::spawn(async move {

      while signal.changed().await.is_ok() {
        let activity = *signal.borrow_and_update();
        if activity.returns != returns && cache.is_active() {
          let stale = cache.stale_resources();
          if !stale.is_empty() {
            info!(?stale, "back in foreground, revalidating stale resources");
            cache.revalidate_stale(source.as_ref()).await;
          }
        }
        returns = activity.returns;
      }

      debug!("activity signal closed, foreground watcher exiting");
    })
  }
}
