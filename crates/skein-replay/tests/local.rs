#![forbid(unsafe_code)]


use std::time::Duration;

use fixture::{msg, ManualClock, TickingClock};
use skein_replay::{ChatEvent, LocalChatReplay, ReplayConfig, ReplayEvent};
use tokio::time::timeout;

async fn recv_event(
    rx: &mut tokio::sync::broadcast::Receiver<ReplayEvent>,
    within: Duration,
) -> Option<ReplayEvent> {
    timeout(within, rx.recv()).await.ok().and_then(Result::ok)
}

fn message_id(event: &ReplayEvent) -> Option<&str> {
    match event {
        ReplayEvent::Message(ChatEvent { id, .. }) => Some(id.as_str()),
        ReplayEvent::Clear => None,
    }
}

#[tokio::test(start_paused = true)]
async fn start_filters_to_a_rewind_window_and_backfills() {
    // Playback resumes at 30s: messages older than position-20s are gone,
    // the ones inside the window replay immediately, later ones on schedule.
    let clock = TickingClock::starting_at(30_000);
    let messages = vec![msg("m9", 9.0), msg("m15", 15.0), msg("m25", 25.0), msg("m31", 31.0)];
    let replay = LocalChatReplay::new(messages, clock, ReplayConfig::default());

    let mut rx = replay.subscribe();
    let t0 = tokio::time::Instant::now();
    replay.start(30_000);

    let mut ids = Vec::new();
    let mut last_at = 0;
    while let Some(event) = recv_event(&mut rx, Duration::from_secs(5)).await {
        ids.push(message_id(&event).unwrap().to_owned());
        last_at = t0.elapsed().as_millis() as i64;
    }

    assert_eq!(ids, vec!["m15", "m25", "m31"]);
    assert!((900..=1500).contains(&last_at), "offset-31 message arrived at {last_at}ms");

    replay.stop();
}

#[tokio::test(start_paused = true)]
async fn speed_change_reschedules_the_pending_wait() {
    let clock = ManualClock::at(0);
    let config = ReplayConfig::default().with_watchdog_interval(Duration::from_secs(3600));
    let replay = LocalChatReplay::new(vec![msg("early", 0.5), msg("late", 5.0)], clock, config);

    let mut rx = replay.subscribe();
    let t0 = tokio::time::Instant::now();
    replay.start(0);

    let first = recv_event(&mut rx, Duration::from_secs(30)).await.unwrap();
    assert_eq!(message_id(&first), Some("early"));
    let first_at = t0.elapsed().as_millis() as i64;
    assert!((400..=700).contains(&first_at));

    // Double the speed while the offset-5s message is pending. Remaining
    // wait is recomputed against the factor instead of expiring at 5000ms.
    tokio::time::sleep_until(t0 + Duration::from_millis(1000)).await;
    replay.update_speed(2.0);
    // Reapplying the same factor is a no-op.
    replay.update_speed(2.0);

    let second = recv_event(&mut rx, Duration::from_secs(30)).await.unwrap();
    assert_eq!(message_id(&second), Some("late"));
    let second_at = t0.elapsed().as_millis() as i64;
    assert!(
        (3400..=3700).contains(&second_at),
        "rescheduled message arrived at {second_at}ms"
    );

    // No redelivery of the already-dispatched message.
    assert!(recv_event(&mut rx, Duration::from_secs(2)).await.is_none());

    replay.stop();
}

#[tokio::test(start_paused = true)]
async fn seek_resync_refilters_the_list_and_clears_display() {
    let clock = TickingClock::starting_at(0);
    let config = ReplayConfig::default().with_watchdog_interval(Duration::from_secs(3600));
    let messages = vec![msg("m1", 1.0), msg("m2", 2.0), msg("m5", 5.0), msg("m25", 25.0)];
    let replay = LocalChatReplay::new(messages, clock, config);

    let mut rx = replay.subscribe();
    let t0 = tokio::time::Instant::now();
    replay.start(0);

    let mut seen = Vec::new();
    seen.push(recv_event(&mut rx, Duration::from_secs(30)).await.unwrap());
    seen.push(recv_event(&mut rx, Duration::from_secs(30)).await.unwrap());

    // Simulate a far-forward seek reported at t=2.5s.
    tokio::time::sleep_until(t0 + Duration::from_millis(2500)).await;
    replay.update_position(25_000);

    while let Some(event) = recv_event(&mut rx, Duration::from_secs(30)).await {
        let done = matches!(event, ReplayEvent::Message(ChatEvent { ref id, .. }) if id == "m25");
        seen.push(event);
        if done {
            break;
        }
    }

    let shape: Vec<String> = seen
        .iter()
        .map(|e| message_id(e).unwrap_or("<clear>").to_owned())
        .collect();
    // Messages delivered before the seek, one clear, then the refiltered
    // tail (floor = 25s - 20s rewind = 5s).
    assert_eq!(shape, vec!["m1", "m2", "<clear>", "m5", "m25"]);

    replay.stop();
}

#[tokio::test(start_paused = true)]
async fn drift_band_matches_remote_contract() {
    let clock = ManualClock::at(0);
    let config = ReplayConfig::default().with_watchdog_interval(Duration::from_secs(3600));
    let replay = LocalChatReplay::new(Vec::new(), clock, config);

    let mut rx = replay.subscribe();
    replay.start(0);

    replay.update_position(0);
    replay.update_position(0);
    replay.update_position(20_000);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(rx.try_recv().is_err(), "in-band deltas never clear");

    replay.update_position(19_999);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(matches!(rx.try_recv(), Ok(ReplayEvent::Clear)));

    replay.stop();
}

#[tokio::test(start_paused = true)]
async fn watchdog_first_check_waits_a_full_period() {
    let clock = ManualClock::at(0);
    let config = ReplayConfig::default().with_watchdog_interval(Duration::from_millis(500));
    let replay = LocalChatReplay::new(Vec::new(), clock, config);

    let mut rx = replay.subscribe();
    replay.start(0);
    // An in-band jump reported right after start, ahead of the polled clock,
    // must not be clobbered by an immediate watchdog read.
    replay.update_position(20_000);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err(), "no clear before the first full period");

    // A full period later the clock is still at 0; the divergence is real
    // and the watchdog resyncs.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(rx.try_recv(), Ok(ReplayEvent::Clear)));

    replay.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_delivery() {
    let clock = TickingClock::starting_at(0);
    let replay = LocalChatReplay::new(vec![msg("m5", 5.0)], clock, ReplayConfig::default());

    let mut rx = replay.subscribe();
    replay.start(0);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    replay.stop();

    assert!(
        recv_event(&mut rx, Duration::from_secs(10)).await.is_none(),
        "nothing may be delivered after stop"
    );
}
