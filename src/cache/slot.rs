//! In-memory cache slot for a single resource.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use super::clock::Clock;
use super::traits::{FetchState, Refresh};
use crate::api::FetchError;

/// Everything a view needs to render one resource, read in one go.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
  pub value: Option<T>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub error: Option<FetchError>,
  pub fetch_state: FetchState,
  pub is_stale: bool,
}

struct InFlight {
  ticket: u64,
  result: Shared<BoxFuture<'static, Refresh>>,
}

struct SlotState<T> {
  value: Option<T>,
  fetched_at: Option<DateTime<Utc>>,
  error: Option<FetchError>,
  in_flight: Option<InFlight>,
  /// Last ticket handed out to a fetch, local update or reset
  next_ticket: u64,
  /// Ticket of the write currently reflected in `value`
  landed: u64,
}

impl<T> Default for SlotState<T> {
  fn default() -> Self {
    Self {
      value: None,
      fetched_at: None,
      error: None,
      in_flight: None,
      next_ticket: 0,
      landed: 0,
    }
  }
}

impl<T> SlotState<T> {
  fn take_ticket(&mut self) -> u64 {
    self.next_ticket += 1;
    self.next_ticket
  }
}

/// One cached resource with ttl-based freshness and fetch deduplication.
///
/// At most one fetch runs per slot; callers arriving while it runs await the
/// same result instead of starting another. Fetches run on their own task so
/// they land even if every caller stops waiting.
///
/// Writes are ordered by ticket: a fetch result is applied only if no write
/// with a newer ticket (local update, later fetch, reset) has landed first.
pub struct Slot<T> {
  name: &'static str,
  ttl: Duration,
  clock: Arc<dyn Clock>,
  active: Arc<AtomicBool>,
  state: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for Slot<T> {
  fn clone(&self) -> Self {
    Self {
      name: self.name,
      ttl: self.ttl,
      clock: Arc::clone(&self.clock),
      active: Arc::clone(&self.active),
      state: Arc::clone(&self.state),
    }
  }
}

impl<T> Slot<T>
where
  T: Clone + Send + 'static,
{
  pub fn new(
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    active: Arc<AtomicBool>,
  ) -> Self {
    Self {
      name,
      ttl,
      clock,
      active,
      state: Arc::new(Mutex::new(SlotState::default())),
    }
  }

  fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
    // Critical sections never panic midway, so a poisoned state is still whole
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_active(&self) -> bool {
    self.active.load(Ordering::Acquire)
  }

  fn stale_at(&self, state: &SlotState<T>, now: DateTime<Utc>) -> bool {
    match state.fetched_at {
      None => true,
      Some(at) => now - at >= self.ttl,
    }
  }

  fn fetch_state_of(state: &SlotState<T>) -> FetchState {
    // A superseded fetch can no longer change what is shown
    let in_flight = state
      .in_flight
      .as_ref()
      .is_some_and(|f| f.ticket > state.landed);
    FetchState {
      is_loading: in_flight && state.fetched_at.is_none(),
      is_refreshing: in_flight && state.fetched_at.is_some(),
    }
  }

  /// Current cached value; never touches the network.
  pub fn value(&self) -> Option<T> {
    self.lock().value.clone()
  }

  pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
    self.lock().fetched_at
  }

  pub fn last_error(&self) -> Option<FetchError> {
    self.lock().error.clone()
  }

  pub fn is_stale(&self) -> bool {
    let state = self.lock();
    self.stale_at(&state, self.clock.now())
  }

  pub fn fetch_state(&self) -> FetchState {
    Self::fetch_state_of(&self.lock())
  }

  pub fn snapshot(&self) -> Snapshot<T> {
    let state = self.lock();
    Snapshot {
      value: state.value.clone(),
      fetched_at: state.fetched_at,
      error: state.error.clone(),
      fetch_state: Self::fetch_state_of(&state),
      is_stale: self.stale_at(&state, self.clock.now()),
    }
  }

  /// Fetch only if the cached value is missing or older than the ttl.
  ///
  /// Joins a running fetch instead of starting a second one. `fetcher` is
  /// called with the slot locked and must not touch the slot itself.
  pub async fn ensure_fresh<F, Fut>(&self, fetcher: F) -> Refresh
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    self.fetch(fetcher, true).await
  }

  /// Fetch regardless of freshness, joining a running fetch if there is one.
  pub async fn force_refresh<F, Fut>(&self, fetcher: F) -> Refresh
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    self.fetch(fetcher, false).await
  }

  async fn fetch<F, Fut>(&self, fetcher: F, only_if_stale: bool) -> Refresh
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let mut fetcher = Some(fetcher);
    loop {
      let (pending, superseded) = {
        let mut state = self.lock();
        if !self.is_active() {
          return Refresh::Inactive;
        }
        if only_if_stale && !self.stale_at(&state, self.clock.now()) {
          return Refresh::Fresh;
        }
        match &state.in_flight {
          Some(in_flight) => (in_flight.result.clone(), in_flight.ticket <= state.landed),
          None => match fetcher.take() {
            Some(fetcher) => (self.start(&mut state, fetcher()), false),
            None => return Refresh::Discarded,
          },
        }
      };

      let outcome = pending.await;
      if !superseded {
        return outcome;
      }
      // The running fetch will be discarded; wait it out before starting ours
      debug!(resource = self.name, "waited out superseded fetch");
    }
  }

  /// Replace the value with one already known to be authoritative.
  ///
  /// Counts as a fresh fetch. Any fetch started earlier is discarded when
  /// it completes. Returns false if the cache has been torn down.
  pub fn apply_local_update(&self, value: T) -> bool {
    let mut state = self.lock();
    if !self.is_active() {
      return false;
    }
    let ticket = state.take_ticket();
    state.value = Some(value);
    state.fetched_at = Some(self.clock.now());
    state.error = None;
    state.landed = ticket;
    debug!(resource = self.name, ticket, "applied local update");
    true
  }

  /// Reset to the never-fetched state.
  ///
  /// A fetch already running stays registered until it settles, so no second
  /// request starts alongside it, but its result is discarded.
  pub fn invalidate(&self) {
    let mut state = self.lock();
    let ticket = state.take_ticket();
    state.value = None;
    state.fetched_at = None;
    state.error = None;
    state.landed = ticket;
  }

  fn start<Fut>(
    &self,
    state: &mut SlotState<T>,
    fetch: Fut,
  ) -> Shared<BoxFuture<'static, Refresh>>
  where
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let ticket = state.take_ticket();
    debug!(resource = self.name, ticket, "fetch started");

    let slot = self.clone();
    let task = tokio::spawn(async move {
      let result = fetch.await;
      slot.settle(ticket, result)
    });

    let slot = self.clone();
    let result = async move {
      match task.await {
        Ok(outcome) => outcome,
        Err(e) => slot.settle(ticket, Err(FetchError::Network(format!("fetch task failed: {}", e)))),
      }
    }
    .boxed()
    .shared();

    state.in_flight = Some(InFlight {
      ticket,
      result: result.clone(),
    });
    result
  }

  fn settle(&self, ticket: u64, result: Result<T, FetchError>) -> Refresh {
    let mut state = self.lock();
    if state.in_flight.as_ref().is_some_and(|f| f.ticket == ticket) {
      state.in_flight = None;
    }

    if !self.is_active() {
      debug!(resource = self.name, ticket, "cache torn down, dropping fetch result");
      return Refresh::Inactive;
    }
    if ticket <= state.landed {
      debug!(
        resource = self.name,
        ticket,
        landed = state.landed,
        "newer write already landed, discarding fetch result"
      );
      return Refresh::Discarded;
    }

    match result {
      Ok(value) => {
        state.value = Some(value);
        state.fetched_at = Some(self.clock.now());
        state.error = None;
        state.landed = ticket;
        debug!(resource = self.name, ticket, "fetch applied");
        Refresh::Updated
      }
      Err(err) => {
        warn!(resource = self.name, error = %err, "fetch failed, keeping cached value");
        state.error = Some(err.clone());
        Refresh::Failed(err)
      }
    }
  }
}
