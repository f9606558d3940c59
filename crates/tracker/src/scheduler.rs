//! Fixed-cadence vehicle polling.
//!
//! One scheduler task owns the [`ViewStore`] and therefore the only mutable
//! view state. Each tick spawns a fetch task which owns the fetch future and
//! its loader timer, and reports back over a channel:
//! - `LoaderDue` when the fetch outlives the loader delay
//! - `Settled` exactly once, on every exit path
//!
//! Per-fetch events arrive in order, so a loader can never be shown after its
//! own fetch settled.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use feed::{FetchError, FetchOpts, VehicleApi, VehicleQuery, VehiclesResponse};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::map::VehicleMap;
use crate::metrics::{duration_millis, TickMetrics};
use crate::render::Loader;
use crate::state::{ViewState, ViewStatePatch, ViewStore};

/// Identifies one fetch, in tick order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchId(pub u64);

#[derive(Debug)]
enum FetchEventKind {
    LoaderDue,
    Settled(Result<VehiclesResponse, FetchError>),
}

#[derive(Debug)]
struct FetchEvent {
    id: FetchId,
    kind: FetchEventKind,
}

#[derive(Debug)]
enum Command {
    SetFetchOpts(FetchOpts),
    Shutdown,
}

/// Control surface for a running [`PollScheduler`].
///
/// Dropping every handle does not stop polling; only [`shutdown`](Self::shutdown) does.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    published: watch::Receiver<ViewState>,
}

impl SchedulerHandle {
    /// Replace the query parameters used from the next tick on.
    ///
    /// Returns `false` if the scheduler has already stopped.
    pub fn set_fetch_opts(&self, fetch_opts: FetchOpts) -> bool {
        self.commands
            .send(Command::SetFetchOpts(fetch_opts))
            .is_ok()
    }

    /// Stop the poll timer and cancel in-flight fetches.
    pub fn shutdown(&self) -> bool {
        self.commands.send(Command::Shutdown).is_ok()
    }

    /// The state as of the most recent merge.
    pub fn snapshot(&self) -> ViewState {
        self.published.borrow().clone()
    }

    /// Receiver that is notified after every merge.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.published.clone()
    }
}

/// Final state handed back by [`PollScheduler::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerReport {
    pub state: ViewState,
    pub metrics: TickMetrics,
}

struct InFlight {
    started: Instant,
    task: JoinHandle<()>,
}

pub struct PollScheduler<M, L> {
    config: PollConfig,
    api: Arc<dyn VehicleApi>,
    store: ViewStore<M, L>,
    metrics: TickMetrics,
    in_flight: BTreeMap<FetchId, InFlight>,
    next_id: u64,
    events_tx: mpsc::UnboundedSender<FetchEvent>,
    events_rx: mpsc::UnboundedReceiver<FetchEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    published: watch::Sender<ViewState>,
}

impl<M: VehicleMap, L: Loader> PollScheduler<M, L> {
    pub fn new(
        config: PollConfig,
        api: Arc<dyn VehicleApi>,
        store: ViewStore<M, L>,
    ) -> (Self, SchedulerHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (published, published_rx) = watch::channel(store.state().clone());
        let scheduler = Self {
            config,
            api,
            store,
            metrics: TickMetrics::new(),
            in_flight: BTreeMap::new(),
            next_id: 0,
            events_tx,
            events_rx,
            commands,
            published,
        };
        (
            scheduler,
            SchedulerHandle {
                commands: commands_tx,
                published: published_rx,
            },
        )
    }

    pub fn state(&self) -> &ViewState {
        self.store.state()
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// Poll until [`SchedulerHandle::shutdown`] is called.
    ///
    /// The first tick fires immediately.
    pub async fn run(mut self) -> SchedulerReport {
        let period = self.config.update_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        info!(
            interval_ms = duration_millis(period),
            loader_delay_ms = duration_millis(self.config.loader_delay),
            max_in_flight = self.config.max_in_flight,
            multipliers = %self.config.multipliers,
            "vehicle poller started"
        );

        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(Command::SetFetchOpts(fetch_opts)) => {
                        debug!(?fetch_opts, "fetch options updated");
                        self.merge(ViewStatePatch::fetch_opts(fetch_opts));
                    }
                    Some(Command::Shutdown) => break,
                    None => commands_open = false,
                },
                Some(event) = self.events_rx.recv() => self.on_event(event),
                _ = ticker.tick() => self.on_tick(),
            }
        }

        self.cancel_in_flight();
        info!(
            ticks = self.metrics.ticks,
            started = self.metrics.fetches_started(),
            ok = self.metrics.fetches_ok,
            failed = self.metrics.fetches_failed,
            "vehicle poller stopped"
        );

        let state = self.store.into_state();
        SchedulerReport {
            state,
            metrics: self.metrics,
        }
    }

    /// Merge, render, then publish the new state to handles.
    fn merge(&mut self, patch: ViewStatePatch) {
        self.store.merge_and_render(patch);
        self.published.send_replace(self.store.state().clone());
    }

    fn on_tick(&mut self) {
        self.metrics.ticks += 1;
        let max_in_flight = self.config.max_in_flight.max(1);
        if self.in_flight.len() >= max_in_flight {
            self.metrics.coalesced_ticks += 1;
            warn!(
                in_flight = self.in_flight.len(),
                "previous fetches still pending, skipping tick"
            );
            return;
        }

        let map = self.store.map();
        let zoom = map.zoom();
        let multiplier = self.config.multipliers.resolve(zoom);
        let corners = map.bounds(multiplier);
        let query = VehicleQuery::new(&self.store.state().fetch_opts, &corners);

        let id = FetchId(self.next_id);
        self.next_id += 1;
        debug!(fetch = id.0, zoom, multiplier, bounds = ?query.bounds, "fetching vehicles");

        let task = tokio::spawn(run_fetch(
            id,
            Arc::clone(&self.api),
            query,
            self.config.loader_delay,
            self.config.fetch_timeout,
            self.events_tx.clone(),
        ));
        self.in_flight.insert(
            id,
            InFlight {
                started: Instant::now(),
                task,
            },
        );
        self.metrics.record_in_flight(self.in_flight.len());
    }

    fn on_event(&mut self, event: FetchEvent) {
        match event.kind {
            FetchEventKind::LoaderDue => {
                if !self.in_flight.contains_key(&event.id) {
                    return;
                }
                debug!(fetch = event.id.0, "fetch is slow, showing loader");
                self.metrics.loader_shown += 1;
                self.merge(ViewStatePatch::loading(true));
            }
            FetchEventKind::Settled(outcome) => {
                let Some(entry) = self.in_flight.remove(&event.id) else {
                    debug!(fetch = event.id.0, "ignoring late settle");
                    return;
                };
                self.settle(event.id, entry, outcome);
            }
        }
    }

    /// Shared finalization for every way a fetch can end.
    fn settle(
        &mut self,
        id: FetchId,
        entry: InFlight,
        outcome: Result<VehiclesResponse, FetchError>,
    ) {
        match outcome {
            Ok(response) => {
                self.metrics.fetches_ok += 1;
                self.metrics.record_latency(entry.started.elapsed());
                debug!(
                    fetch = id.0,
                    vehicles = response.vehicles.len(),
                    "vehicles fetched"
                );
                self.merge(ViewStatePatch::fetched(response));
            }
            Err(FetchError::Cancelled) => {
                self.metrics.fetches_cancelled += 1;
                debug!(fetch = id.0, "fetch cancelled");
            }
            Err(err) => {
                self.metrics.fetches_failed += 1;
                self.metrics.record_latency(entry.started.elapsed());
                warn!(fetch = id.0, "vehicle fetch failed: {err}");
                self.merge(ViewStatePatch::failed(err.to_string()));
            }
        }
        self.merge(ViewStatePatch::loading(false));
    }

    fn cancel_in_flight(&mut self) {
        let pending = std::mem::take(&mut self.in_flight);
        for (id, entry) in pending {
            entry.task.abort();
            self.settle(id, entry, Err(FetchError::Cancelled));
        }
    }
}

/// Reports `Settled(Cancelled)` if the fetch task ends without settling,
/// e.g. when it is aborted or the API implementation panics.
struct SettleGuard {
    id: FetchId,
    events: mpsc::UnboundedSender<FetchEvent>,
    settled: bool,
}

impl SettleGuard {
    fn settle(mut self, outcome: Result<VehiclesResponse, FetchError>) {
        self.settled = true;
        let _ = self.events.send(FetchEvent {
            id: self.id,
            kind: FetchEventKind::Settled(outcome),
        });
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.events.send(FetchEvent {
                id: self.id,
                kind: FetchEventKind::Settled(Err(FetchError::Cancelled)),
            });
        }
    }
}

async fn run_fetch(
    id: FetchId,
    api: Arc<dyn VehicleApi>,
    query: VehicleQuery,
    loader_delay: Duration,
    fetch_timeout: Duration,
    events: mpsc::UnboundedSender<FetchEvent>,
) {
    let guard = SettleGuard {
        id,
        events: events.clone(),
        settled: false,
    };

    let fetch = tokio::time::timeout(fetch_timeout, api.get_vehicles(&query));
    tokio::pin!(fetch);
    let loader = tokio::time::sleep(loader_delay);
    tokio::pin!(loader);
    let mut loader_armed = true;

    // A fetch that is ready at the same instant as the loader wins.
    let outcome = loop {
        tokio::select! {
            biased;
            res = &mut fetch => {
                break res.unwrap_or(Err(FetchError::Timeout(fetch_timeout)));
            }
            _ = &mut loader, if loader_armed => {
                loader_armed = false;
                let _ = events.send(FetchEvent {
                    id,
                    kind: FetchEventKind::LoaderDue,
                });
            }
        }
    };

    guard.settle(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed::BoxFuture;

    struct DelayedApi {
        delay: Duration,
        outcome: Result<VehiclesResponse, FetchError>,
    }

    impl VehicleApi for DelayedApi {
        fn get_vehicles<'a>(
            &'a self,
            _query: &'a VehicleQuery,
        ) -> BoxFuture<'a, Result<VehiclesResponse, FetchError>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.outcome.clone()
            })
        }
    }

    fn api(delay_ms: u64, outcome: Result<VehiclesResponse, FetchError>) -> Arc<dyn VehicleApi> {
        Arc::new(DelayedApi {
            delay: Duration::from_millis(delay_ms),
            outcome,
        })
    }

    async fn collect(
        api: Arc<dyn VehicleApi>,
        loader_ms: u64,
        timeout_ms: u64,
    ) -> Vec<FetchEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        run_fetch(
            FetchId(7),
            api,
            VehicleQuery::default(),
            Duration::from_millis(loader_ms),
            Duration::from_millis(timeout_ms),
            tx,
        )
        .await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[FetchEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match &e.kind {
                FetchEventKind::LoaderDue => "loader",
                FetchEventKind::Settled(Ok(_)) => "ok",
                FetchEventKind::Settled(Err(_)) => "err",
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn fast_fetch_never_arms_loader() {
        let events = collect(api(500, Ok(VehiclesResponse::default())), 2000, 30_000).await;
        assert_eq!(kinds(&events), vec!["ok"]);
        assert!(events.iter().all(|e| e.id == FetchId(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_reports_loader_before_settle() {
        let events = collect(api(3000, Ok(VehiclesResponse::default())), 2000, 30_000).await;
        assert_eq!(kinds(&events), vec!["loader", "ok"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_ready_at_loader_deadline_wins() {
        let events = collect(api(2000, Ok(VehiclesResponse::default())), 2000, 30_000).await;
        assert_eq!(kinds(&events), vec!["ok"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_settles_as_failure() {
        let events = collect(api(60_000, Ok(VehiclesResponse::default())), 2000, 5000).await;
        assert_eq!(kinds(&events), vec!["loader", "err"]);
        match &events[1].kind {
            FetchEventKind::Settled(Err(err)) => {
                assert_eq!(*err, FetchError::Timeout(Duration::from_millis(5000)))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_fetch_still_settles() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_fetch(
            FetchId(1),
            api(60_000, Ok(VehiclesResponse::default())),
            VehicleQuery::default(),
            Duration::from_millis(2000),
            Duration::from_millis(30_000),
            tx,
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();
        let _ = task.await;

        let event = rx.recv().await.expect("settle event");
        assert_eq!(event.id, FetchId(1));
        assert!(matches!(
            event.kind,
            FetchEventKind::Settled(Err(FetchError::Cancelled))
        ));
    }
}
