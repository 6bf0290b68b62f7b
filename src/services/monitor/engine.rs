use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::modules::monitor::model::{Monitor, MonitorId, ProbeRecord};
use crate::modules::monitor::store::MonitorStore;
use crate::services::metrics::MonitorMetrics;
use crate::services::monitor::executor::Prober;
use crate::services::monitor::guard::{self, Transition};
use crate::services::webhook::{status_message, NotificationDispatcher, StatusTag};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a single probe task needs, cheap to clone into each task
#[derive(Clone)]
pub struct CheckContext {
    pub store: Arc<dyn MonitorStore>,
    pub prober: Arc<dyn Prober>,
    pub dispatcher: NotificationDispatcher,
    pub metrics: Arc<MonitorMetrics>,
}

#[derive(Debug, Default)]
struct Slots {
    running: HashSet<MonitorId>,
    /// When each monitor's last probe finished, pruned once no listing can predate it
    released: HashMap<MonitorId, Instant>,
}

/// Result of trying to claim a monitor for a new probe
#[derive(Debug)]
pub enum Claim {
    Acquired(InFlightGuard),
    /// A probe for this monitor is still running
    Running,
    /// A probe finished after the monitor list was read, so the listed row is outdated
    Stale,
}

/// Monitor ids with a probe currently running
#[derive(Debug, Default)]
pub struct InFlight {
    slots: Mutex<Slots>,
}

impl InFlight {
    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `None` when the monitor already has a probe in flight
    pub fn try_acquire(self: &Arc<Self>, id: MonitorId) -> Option<InFlightGuard> {
        if !self.slots().running.insert(id) {
            return None;
        }

        Some(self.guard(id))
    }

    /// Claim `id` for a probe based on a monitor row read at `listed_at`
    pub fn claim(self: &Arc<Self>, id: MonitorId, listed_at: Instant) -> Claim {
        let mut slots = self.slots();

        if slots.running.contains(&id) {
            return Claim::Running;
        }
        if slots.released.get(&id).is_some_and(|released| *released > listed_at) {
            return Claim::Stale;
        }

        slots.running.insert(id);
        drop(slots);
        Claim::Acquired(self.guard(id))
    }

    /// Forget release times older than `listed_at`
    pub fn prune_released(&self, listed_at: Instant) {
        self.slots().released.retain(|_, released| *released > listed_at);
    }

    fn guard(self: &Arc<Self>, id: MonitorId) -> InFlightGuard {
        InFlightGuard {
            set: Arc::clone(self),
            id,
        }
    }

    pub fn contains(&self, id: MonitorId) -> bool {
        self.slots().running.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.slots().running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().running.is_empty()
    }
}

/// Releases the monitor id on drop, including when the probe task panics
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<InFlight>,
    id: MonitorId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut slots = self.set.slots();
        slots.running.remove(&self.id);
        slots.released.insert(self.id, Instant::now());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub launched: usize,
    pub skipped_in_flight: usize,
    pub skipped_stale: usize,
}

/// Tick-driven scheduler. Each tick re-derives the due set from persisted
/// `last_checked`, so nothing is queued between ticks.
pub struct MonitorEngine {
    ctx: CheckContext,
    in_flight: Arc<InFlight>,
    tick_interval: Duration,
}

impl MonitorEngine {
    pub fn new(ctx: CheckContext, tick_interval: Duration) -> Self {
        Self {
            ctx,
            in_flight: Arc::new(InFlight::default()),
            tick_interval,
        }
    }

    pub fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }

    /// Start the background polling loop. Returns once `shutdown` flips to
    /// `true` (or its sender is dropped) and every in-flight probe finished.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("🚀 Monitoring engine started (tick every {:?})", self.tick_interval);

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    reap_finished(&mut tasks);
                    let report = self.tick(Utc::now(), &mut tasks).await;
                    if report.due > 0 {
                        tracing::debug!(
                            due = report.due,
                            launched = report.launched,
                            skipped = report.skipped_in_flight,
                            stale = report.skipped_stale,
                            "Tick"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(in_flight = tasks.len(), "Stopping monitoring engine, waiting for in-flight probes");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Probe task panicked");
            }
        }
        tracing::info!("Monitoring engine stopped");
    }

    /// Launch a probe for every monitor due at `now` that has none in flight
    pub async fn tick(&self, now: DateTime<Utc>, tasks: &mut JoinSet<()>) -> TickReport {
        let mut report = TickReport::default();

        let listed_at = Instant::now();
        let monitors = match self.ctx.store.list_monitors().await {
            Ok(monitors) => monitors,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch monitors");
                self.ctx
                    .metrics
                    .persistence_errors_total
                    .with_label_values(&["list_monitors"])
                    .inc();
                return report;
            }
        };

        for monitor in monitors.into_iter().filter(|m| m.is_due(now)) {
            report.due += 1;

            let guard = match self.in_flight.claim(monitor.id, listed_at) {
                Claim::Acquired(guard) => guard,
                Claim::Running => {
                    tracing::debug!(monitor_id = monitor.id, "Previous probe still running, skipping");
                    self.ctx.metrics.probes_skipped_total.inc();
                    report.skipped_in_flight += 1;
                    continue;
                }
                Claim::Stale => {
                    // Picked up again by the next tick with the fresh row
                    tracing::debug!(monitor_id = monitor.id, "Probe finished during listing, skipping");
                    self.ctx.metrics.probes_skipped_total.inc();
                    report.skipped_stale += 1;
                    continue;
                }
            };

            report.launched += 1;
            tasks.spawn(run_check(self.ctx.clone(), monitor, guard));
        }

        self.in_flight.prune_released(listed_at);
        self.ctx.metrics.probes_in_flight.set(self.in_flight.len() as f64);

        report
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Probe task panicked");
        }
    }
}

/// One check cycle: probe, filter, persist, notify, append the heartbeat
pub async fn run_check(ctx: CheckContext, monitor: Monitor, _guard: InFlightGuard) {
    let started = Instant::now();
    let result = ctx.prober.probe(&monitor).await;

    ctx.metrics
        .probe_duration_seconds
        .observe(started.elapsed().as_secs_f64());
    ctx.metrics
        .probes_total
        .with_label_values(&[result.verdict.as_str()])
        .inc();

    let outcome = guard::evaluate(
        monitor.status,
        monitor.consecutive_fails,
        monitor.failure_threshold,
        result.verdict,
    );

    tracing::debug!(
        monitor_id = monitor.id,
        verdict = %result.verdict,
        status = %outcome.status,
        consecutive_fails = outcome.consecutive_fails,
        latency_ms = result.latency_ms,
        status_code = ?result.status_code,
        error = ?result.error,
        "Probe finished"
    );

    let record = ProbeRecord {
        monitor_id: monitor.id,
        status: outcome.status,
        response_time_ms: result.latency_ms,
        consecutive_fails: outcome.consecutive_fails,
    };

    let recorded = match ctx.store.record_probe_result(&record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                monitor_id = monitor.id,
                attempted_status = %record.status,
                consecutive_fails = record.consecutive_fails,
                error = %e,
                "Failed to record probe result"
            );
            ctx.metrics
                .persistence_errors_total
                .with_label_values(&["record_probe_result"])
                .inc();
            false
        }
    };

    // An unrecorded transition is re-evaluated by the next probe
    if let Some(transition) = outcome.transition.filter(|_| recorded) {
        let tag = match transition {
            Transition::Down => StatusTag::Down,
            Transition::Recovered => StatusTag::Up,
        };
        tracing::info!(
            monitor_id = monitor.id,
            transition = transition.as_str(),
            "Monitor {} is now {}",
            monitor.name,
            tag
        );
        ctx.metrics
            .status_transitions_total
            .with_label_values(&[transition.as_str()])
            .inc();

        let message = status_message(&monitor, tag);
        ctx.dispatcher.notify(&monitor, &message, tag).await;
    }

    if let Err(e) = ctx
        .store
        .append_heartbeat(monitor.id, result.verdict, result.latency_ms)
        .await
    {
        tracing::error!(
            monitor_id = monitor.id,
            verdict = %result.verdict,
            error = %e,
            "Failed to append heartbeat"
        );
        ctx.metrics
            .persistence_errors_total
            .with_label_values(&["append_heartbeat"])
            .inc();
    }
}
