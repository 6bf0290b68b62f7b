use crate::common::{check_context, drain, monitor, MemoryStore, ScriptedProber};
use chrono::{Duration as ChronoDuration, Utc};
use pulsewatch::modules::monitor::model::{MonitorStatus, Verdict};
use pulsewatch::services::monitor::engine::{run_check, InFlight};
use pulsewatch::services::monitor::MonitorEngine;
use pulsewatch::services::webhook::{Provider, StatusTag};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

// =============================================================================
// INTEGRATION TESTS - CHECK CYCLE
// =============================================================================

#[tokio::test]
async fn test_three_failures_then_recovery() {
    let mut m = monitor(1, 3);
    m.notification_url = Some("https://ntfy.sh/ops".to_string());
    let store = MemoryStore::with_monitors(vec![m]);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(1, &[Verdict::Down, Verdict::Down, Verdict::Down, Verdict::Up]);

    let (ctx, mut queue) = check_context(store.clone(), prober.clone());
    let in_flight = Arc::new(InFlight::default());

    let expected = [
        (MonitorStatus::Pending, 1, 0),
        (MonitorStatus::Pending, 2, 0),
        (MonitorStatus::Down, 3, 1),
        (MonitorStatus::Up, 0, 1),
    ];

    for (status, fails, notifications) in expected {
        let guard = in_flight.try_acquire(1).unwrap();
        run_check(ctx.clone(), store.monitor(1), guard).await;

        let current = store.monitor(1);
        assert_eq!(current.status, status);
        assert_eq!(current.consecutive_fails, fails);
        assert_eq!(drain(&mut queue).len(), notifications);
    }

    // One heartbeat per probe, raw verdicts regardless of filtering
    let verdicts: Vec<_> = store.heartbeats_for(1).iter().map(|h| h.status).collect();
    assert_eq!(
        verdicts,
        vec![Verdict::Down, Verdict::Down, Verdict::Down, Verdict::Up]
    );
    assert!(in_flight.is_empty());
}

#[tokio::test]
async fn test_notifications_carry_status_and_message() {
    let mut m = monitor(2, 1);
    m.status = MonitorStatus::Up;
    m.notification_url = Some("https://hooks.slack.com/services/T0/B0/x".to_string());
    let store = MemoryStore::with_monitors(vec![m]);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(2, &[Verdict::Down, Verdict::Up]);

    let (ctx, mut queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());

    run_check(ctx.clone(), store.monitor(2), in_flight.try_acquire(2).unwrap()).await;
    let down = drain(&mut queue);
    assert_eq!(down.len(), 1);
    assert_eq!(down[0].status, StatusTag::Down);
    assert_eq!(down[0].payload.provider, Provider::Slack);
    assert_eq!(down[0].monitor_id, 2);

    run_check(ctx, store.monitor(2), in_flight.try_acquire(2).unwrap()).await;
    let up = drain(&mut queue);
    assert_eq!(up.len(), 1);
    assert_eq!(up[0].status, StatusTag::Up);
}

#[tokio::test]
async fn test_down_records_zero_latency() {
    let store = MemoryStore::with_monitors(vec![monitor(3, 5)]);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(3, &[Verdict::Down]);

    let (ctx, _queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());
    run_check(ctx, store.monitor(3), in_flight.try_acquire(3).unwrap()).await;

    let current = store.monitor(3);
    assert_eq!(current.response_time_ms, Some(0));
    assert!(current.last_checked.is_some());
    assert_eq!(store.heartbeats_for(3)[0].latency_ms, 0);
}

#[tokio::test]
async fn test_default_target_used_as_fallback() {
    let store = MemoryStore::with_monitors(vec![monitor(4, 1)]);
    store.set_default_target("https://discord.com/api/webhooks/1/abc", Some("tok"));
    let prober = Arc::new(ScriptedProber::default());
    prober.script(4, &[Verdict::Down]);

    let (ctx, mut queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());
    run_check(ctx, store.monitor(4), in_flight.try_acquire(4).unwrap()).await;

    let intents = drain(&mut queue);
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].target.url, "https://discord.com/api/webhooks/1/abc");
    assert_eq!(intents[0].target.token.as_deref(), Some("tok"));
    assert_eq!(intents[0].payload.provider, Provider::Discord);
}

#[tokio::test]
async fn test_own_target_skips_settings_lookup() {
    let mut m = monitor(5, 1);
    m.notification_url = Some("https://ntfy.sh/mine".to_string());
    let store = MemoryStore::with_monitors(vec![m]);
    store.set_default_target("https://ntfy.sh/global", None);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(5, &[Verdict::Down]);

    let (ctx, mut queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());
    run_check(ctx, store.monitor(5), in_flight.try_acquire(5).unwrap()).await;

    let intents = drain(&mut queue);
    assert_eq!(intents[0].target.url, "https://ntfy.sh/mine");
    assert_eq!(store.settings_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_status_changes_without_any_target() {
    let store = MemoryStore::with_monitors(vec![monitor(6, 1)]);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(6, &[Verdict::Down]);

    let (ctx, mut queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());
    run_check(ctx, store.monitor(6), in_flight.try_acquire(6).unwrap()).await;

    assert_eq!(store.monitor(6).status, MonitorStatus::Down);
    assert!(drain(&mut queue).is_empty());
}

#[tokio::test]
async fn test_persistence_failures_are_isolated() {
    let mut m = monitor(7, 1);
    m.notification_url = Some("https://ntfy.sh/ops".to_string());
    let store = MemoryStore::with_monitors(vec![m]);
    store.fail_record.store(true, Ordering::SeqCst);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(7, &[Verdict::Down, Verdict::Down]);

    let (ctx, mut queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());
    run_check(ctx.clone(), store.monitor(7), in_flight.try_acquire(7).unwrap()).await;

    // Status write failed: heartbeat still appended, transition not announced
    assert!(drain(&mut queue).is_empty());
    assert_eq!(store.heartbeats_for(7).len(), 1);
    assert_eq!(store.monitor(7).status, MonitorStatus::Pending);

    store.fail_record.store(false, Ordering::SeqCst);
    store.fail_heartbeat.store(true, Ordering::SeqCst);
    run_check(ctx, store.monitor(7), in_flight.try_acquire(7).unwrap()).await;

    assert_eq!(store.monitor(7).status, MonitorStatus::Down);
    assert_eq!(drain(&mut queue).len(), 1);
    assert_eq!(store.heartbeats_for(7).len(), 1);
    assert!(in_flight.is_empty());
}

#[tokio::test]
async fn test_failing_status_write_does_not_repeat_notifications() {
    let mut m = monitor(8, 1);
    m.interval_secs = 0;
    m.notification_url = Some("https://ntfy.sh/ops".to_string());
    let store = MemoryStore::with_monitors(vec![m]);
    store.fail_record.store(true, Ordering::SeqCst);
    let prober = Arc::new(ScriptedProber::default());
    prober.script(8, &[Verdict::Down, Verdict::Down, Verdict::Down]);

    let (ctx, mut queue) = check_context(store.clone(), prober);
    let in_flight = Arc::new(InFlight::default());
    for _ in 0..3 {
        run_check(ctx.clone(), store.monitor(8), in_flight.try_acquire(8).unwrap()).await;
    }

    assert!(drain(&mut queue).is_empty());
    assert_eq!(store.heartbeats_for(8).len(), 3);
}

// =============================================================================
// INTEGRATION TESTS - SCHEDULER
// =============================================================================

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }
}

#[tokio::test]
async fn test_tick_launches_only_due_monitors() {
    let mut fresh = monitor(11, 3);
    fresh.last_checked = Some(Utc::now());
    let mut stale = monitor(12, 3);
    stale.last_checked = Some(Utc::now() - ChronoDuration::seconds(120));
    let never = monitor(13, 3);

    let store = MemoryStore::with_monitors(vec![fresh, stale, never]);
    let prober = Arc::new(ScriptedProber::default());
    let (ctx, _queue) = check_context(store.clone(), prober.clone());
    let engine = MonitorEngine::new(ctx, Duration::from_millis(50));

    let mut tasks = JoinSet::new();
    let report = engine.tick(Utc::now(), &mut tasks).await;
    join_all(&mut tasks).await;

    assert_eq!(report.due, 2);
    assert_eq!(report.launched, 2);
    assert_eq!(report.skipped_in_flight, 0);
    assert!(store.heartbeats_for(11).is_empty());
    assert_eq!(store.heartbeats_for(12).len(), 1);
    assert_eq!(store.heartbeats_for(13).len(), 1);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_monitor_with_probe_in_flight_is_skipped() {
    let store = MemoryStore::with_monitors(vec![monitor(21, 3)]);
    let prober = Arc::new(ScriptedProber::default());
    prober.delay(21, Duration::from_millis(300));
    let (ctx, _queue) = check_context(store.clone(), prober.clone());
    let engine = MonitorEngine::new(ctx, Duration::from_millis(50));

    let mut tasks = JoinSet::new();
    let first = engine.tick(Utc::now(), &mut tasks).await;
    let second = engine.tick(Utc::now(), &mut tasks).await;

    assert_eq!(first.launched, 1);
    assert_eq!(second.due, 1);
    assert_eq!(second.skipped_stale, 0);
    assert_eq!(second.launched, 0);
    assert_eq!(second.skipped_in_flight, 1);
    assert!(engine.in_flight().contains(21));

    join_all(&mut tasks).await;
    assert!(engine.in_flight().is_empty());
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.heartbeats_for(21).len(), 1);
}

#[tokio::test]
async fn test_slow_monitor_does_not_delay_others() {
    let store = MemoryStore::with_monitors(vec![monitor(31, 3), monitor(32, 3)]);
    let prober = Arc::new(ScriptedProber::default());
    prober.delay(31, Duration::from_secs(2));
    let (ctx, _queue) = check_context(store.clone(), prober);
    let engine = MonitorEngine::new(ctx, Duration::from_millis(50));

    let mut tasks = JoinSet::new();
    engine.tick(Utc::now(), &mut tasks).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.heartbeats_for(32).len(), 1);
    assert!(store.heartbeats_for(31).is_empty());

    join_all(&mut tasks).await;
    assert_eq!(store.heartbeats_for(31).len(), 1);
}

#[tokio::test]
async fn test_failed_monitor_listing_skips_tick() {
    let store = MemoryStore::with_monitors(vec![monitor(41, 3)]);
    store.fail_list.store(true, Ordering::SeqCst);
    let prober = Arc::new(ScriptedProber::default());
    let (ctx, _queue) = check_context(store.clone(), prober.clone());
    let engine = MonitorEngine::new(ctx, Duration::from_millis(50));

    let mut tasks = JoinSet::new();
    let report = engine.tick(Utc::now(), &mut tasks).await;

    assert_eq!(report.due, 0);
    assert!(tasks.is_empty());
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let store = MemoryStore::with_monitors(vec![monitor(51, 3)]);
    let prober = Arc::new(ScriptedProber::default());
    let (ctx, _queue) = check_context(store.clone(), prober);
    let engine = Arc::new(MonitorEngine::new(ctx, Duration::from_millis(20)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = Arc::clone(&engine);
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    let mut waited = 0;
    while store.heartbeats_for(51).is_empty() && waited < 50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
    }
    assert_eq!(store.heartbeats_for(51).len(), 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("engine stopped")
        .unwrap();

    // Interval is 60s, so the monitor was not probed again
    assert_eq!(store.heartbeats_for(51).len(), 1);
}

#[tokio::test]
async fn test_check_finishing_during_listing_is_not_repeated_from_old_row() {
    let mut m = monitor(61, 2);
    m.interval_secs = 0;
    m.notification_url = Some("https://ntfy.sh/ops".to_string());
    let store = MemoryStore::with_monitors(vec![m]);
    store.set_list_delay(Some(Duration::from_millis(200)));
    let prober = Arc::new(ScriptedProber::default());
    prober.script(61, &[Verdict::Down, Verdict::Down]);
    prober.delay(61, Duration::from_millis(100));

    let (ctx, mut queue) = check_context(store.clone(), prober.clone());
    let engine = MonitorEngine::new(ctx, Duration::from_millis(50));
    let mut tasks = JoinSet::new();

    // The first probe completes while the second listing is still running
    let first = engine.tick(Utc::now(), &mut tasks).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = engine.tick(Utc::now(), &mut tasks).await;
    join_all(&mut tasks).await;

    assert_eq!(first.launched, 1);
    assert_eq!(second.launched, 0);
    assert_eq!(second.skipped_stale, 1);
    assert_eq!(store.monitor(61).consecutive_fails, 1);

    store.set_list_delay(None);
    let third = engine.tick(Utc::now(), &mut tasks).await;
    join_all(&mut tasks).await;

    assert_eq!(third.launched, 1);
    let current = store.monitor(61);
    assert_eq!(current.consecutive_fails, 2);
    assert_eq!(current.status, MonitorStatus::Down);
    assert_eq!(drain(&mut queue).len(), 1);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.heartbeats_for(61).len(), 2);
}

#[tokio::test]
async fn test_shutdown_waits_for_running_check() {
    let store = MemoryStore::with_monitors(vec![monitor(71, 3)]);
    let prober = Arc::new(ScriptedProber::default());
    prober.delay(71, Duration::from_millis(500));
    let (ctx, _queue) = check_context(store.clone(), prober.clone());
    let engine = Arc::new(MonitorEngine::new(ctx, Duration::from_millis(20)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = Arc::clone(&engine);
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    let mut waited = 0;
    while prober.calls.load(Ordering::SeqCst) == 0 && waited < 50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 1;
    }
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    assert!(store.heartbeats_for(71).is_empty());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .expect("engine stopped")
        .unwrap();

    assert_eq!(store.heartbeats_for(71).len(), 1);
    assert_eq!(store.monitor(71).consecutive_fails, 0);
    assert!(engine.in_flight().is_empty());
}
