//! Paginated (VOD) replay cursor.
//!
//! One dispatch task at a time drains the buffered queue against the
//! external clock; a prefetch task may run alongside it (prefetch only
//! appends, dispatch only pops); a watchdog polls the clock and resyncs the
//! whole cursor when the position jumps outside the drift band.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ReplayConfig;
use crate::source::{ChatSource, PlaybackClock};
use crate::types::{ChatEvent, ReplayEvent};

struct Buffer {
    queue: VecDeque<ChatEvent>,
    /// Next page to fetch; `None` means end of log.
    cursor: Option<String>,
}

struct Shared {
    source: Arc<dyn ChatSource>,
    clock: Arc<dyn PlaybackClock>,
    config: ReplayConfig,
    events: broadcast::Sender<ReplayEvent>,
    buffer: Mutex<Buffer>,
    is_loading: AtomicBool,
    /// Base offset added to the clock position: chat offsets are absolute
    /// into the video, the clock restarts at zero per playback.
    start_offset_ms: AtomicI64,
    last_position_ms: AtomicI64,
    /// Externally updated playback speed factor; scales pending waits.
    speed: Mutex<f64>,
}

impl Shared {
    fn playhead_ms(&self) -> i64 {
        self.start_offset_ms.load(Ordering::Acquire) + self.clock.position_ms()
    }
}

#[derive(Default)]
struct Tasks {
    watchdog: Option<CancellationToken>,
    dispatch: Option<CancellationToken>,
}

/// Replay cursor over a paginated chat log.
///
/// `start`/`stop`/`update_position` are cheap and non-blocking; all waiting
/// happens on spawned tasks. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct ChatReplayCursor {
    shared: Arc<Shared>,
    tasks: Arc<Mutex<Tasks>>,
}

impl ChatReplayCursor {
    pub fn new(
        source: Arc<dyn ChatSource>,
        clock: Arc<dyn PlaybackClock>,
        config: ReplayConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            shared: Arc::new(Shared {
                source,
                clock,
                config,
                events,
                buffer: Mutex::new(Buffer {
                    queue: VecDeque::new(),
                    cursor: None,
                }),
                is_loading: AtomicBool::new(false),
                start_offset_ms: AtomicI64::new(0),
                last_position_ms: AtomicI64::new(0),
                speed: Mutex::new(1.0),
            }),
            tasks: Arc::new(Mutex::new(Tasks::default())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReplayEvent> {
        self.shared.events.subscribe()
    }

    /// Begin replay with the given base offset into the video. Any previous
    /// run of this cursor is cancelled first.
    pub fn start(&self, start_offset_ms: i64) {
        self.stop();

        let position = self.shared.clock.position_ms();
        self.shared
            .start_offset_ms
            .store(start_offset_ms, Ordering::Release);
        self.shared
            .last_position_ms
            .store(position, Ordering::Release);

        debug!(start_offset_ms, position, "chat replay starting");

        let watchdog = CancellationToken::new();
        self.tasks.lock().watchdog = Some(watchdog.clone());
        let cursor = self.clone();
        tokio::spawn(async move {
            cursor.watchdog_loop(watchdog).await;
        });

        self.begin_load(start_offset_ms + position);
    }

    /// Cancel dispatch, prefetch and watchdog, and drop the buffer.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock();
        if let Some(token) = tasks.watchdog.take() {
            token.cancel();
        }
        if let Some(token) = tasks.dispatch.take() {
            token.cancel();
        }
        drop(tasks);

        let mut buffer = self.shared.buffer.lock();
        buffer.queue.clear();
        buffer.cursor = None;
    }

    /// Report the latest observed playback position. A delta outside
    /// `[0, drift_tolerance_ms]` (any backward jump, or a forward jump past
    /// tolerance) cancels all pending work and reloads from scratch.
    pub fn update_position(&self, position_ms: i64) {
        let last = self
            .shared
            .last_position_ms
            .swap(position_ms, Ordering::AcqRel);
        let delta = position_ms - last;
        if (0..=self.shared.config.drift_tolerance_ms).contains(&delta) {
            trace!(delta_ms = delta, "position within drift band");
            return;
        }

        debug!(delta_ms = delta, position_ms, "position drift, resyncing chat replay");

        // Cancel the active dispatch before discarding the buffer: no stale
        // message may be delivered once the resync has begun.
        if let Some(token) = self.tasks.lock().dispatch.take() {
            token.cancel();
        }
        let _ = self.shared.events.send(ReplayEvent::Clear);
        self.begin_load(self.shared.start_offset_ms.load(Ordering::Acquire) + position_ms);
    }

    /// Apply a new playback speed. The dispatch loop re-reads the external
    /// clock on every wake, so timing self-corrects regardless; the factor
    /// only bounds how long a pending wait may oversleep a sped-up clock.
    /// No restart is needed.
    pub fn update_speed(&self, speed: f64) {
        let mut current = self.shared.speed.lock();
        if (*current - speed).abs() < f64::EPSILON {
            return;
        }
        debug!(from = *current, to = speed, "replay speed changed");
        *current = speed;
    }

    /// Spawn a fresh dispatch task loading from `offset_ms`, replacing any
    /// active one.
    fn begin_load(&self, offset_ms: i64) {
        let token = CancellationToken::new();
        {
            let mut tasks = self.tasks.lock();
            if let Some(old) = tasks.dispatch.take() {
                old.cancel();
            }
            tasks.dispatch = Some(token.clone());
        }
        {
            let mut buffer = self.shared.buffer.lock();
            buffer.queue.clear();
            buffer.cursor = None;
        }
        self.shared.is_loading.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("chat dispatch cancelled");
                }
                _ = dispatch_loop(Arc::clone(&shared), token.clone(), offset_ms) => {}
            }
        });
    }

    async fn watchdog_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.shared.config.watchdog_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // interval's first tick completes immediately; swallow it so the
        // first clock check happens a full period in, not racing position
        // reports issued right after start.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.update_position(self.shared.clock.position_ms());
                }
            }
        }
    }
}

async fn dispatch_loop(shared: Arc<Shared>, cancel: CancellationToken, offset_ms: i64) {
    // Initial page. Transient fetch failures are retried on a fixed delay;
    // they never take the loop down.
    let offset_seconds = offset_ms.max(0) as f64 / 1000.0;
    loop {
        match shared.source.load(offset_seconds).await {
            Ok(page) => {
                let mut buffer = shared.buffer.lock();
                buffer.cursor = if page.has_next_page { page.cursor } else { None };
                buffer.queue.extend(page.messages);
                debug!(
                    queued = buffer.queue.len(),
                    has_cursor = buffer.cursor.is_some(),
                    "chat replay page loaded"
                );
                break;
            }
            Err(e) => {
                warn!(error = %e, "chat page load failed, retrying");
                tokio::time::sleep(shared.config.fetch_retry_delay).await;
            }
        }
    }

    loop {
        let head = shared.buffer.lock().queue.pop_front();
        let Some(message) = head else {
            if shared.is_loading.load(Ordering::Acquire) {
                tokio::time::sleep(shared.config.idle_poll).await;
                continue;
            }
            let cursor = shared.buffer.lock().cursor.clone();
            match cursor {
                Some(cursor) => {
                    fetch_page(&shared, &cursor).await;
                    continue;
                }
                None => {
                    debug!("chat log exhausted, dispatch done");
                    return;
                }
            }
        };

        maybe_prefetch(&shared, &cancel);

        let Some(target_ms) = message.offset_ms() else {
            // Not time-anchored: deliver immediately.
            let _ = shared.events.send(ReplayEvent::Message(message));
            continue;
        };

        // Sleep until the playhead reaches the target, recomputing on every
        // wake: the clock is external and may stall or jump under us. The
        // wait is scaled by the speed factor so a sped-up clock is not
        // overslept by the full remainder.
        loop {
            let remaining = target_ms - shared.playhead_ms();
            if remaining <= 0 {
                break;
            }
            let speed = *shared.speed.lock();
            let wait_ms = ((remaining as f64 / speed.max(0.01)).ceil() as u64).max(1);
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        let lateness = shared.playhead_ms() - target_ms;
        if lateness < shared.config.staleness_ms {
            trace!(target_ms, lateness_ms = lateness, "delivering chat message");
            let _ = shared.events.send(ReplayEvent::Message(message));
        } else {
            // Fell too far behind (e.g. a long buffering stall); drop, do
            // not retry.
            debug!(target_ms, lateness_ms = lateness, "dropping stale chat message");
        }
    }
}

/// Blocking (in-loop) fetch of the next page, used when the queue has fully
/// drained with a cursor still pending.
async fn fetch_page(shared: &Arc<Shared>, cursor: &str) {
    match shared.source.next_page(cursor).await {
        Ok(page) => {
            let mut buffer = shared.buffer.lock();
            buffer.cursor = if page.has_next_page { page.cursor } else { None };
            buffer.queue.extend(page.messages);
            trace!(queued = buffer.queue.len(), "chat replay page appended");
        }
        Err(e) => {
            warn!(error = %e, "chat page fetch failed, retrying");
            tokio::time::sleep(shared.config.fetch_retry_delay).await;
        }
    }
}

/// Kick off a non-blocking prefetch once the queue drains to the low-water
/// mark, without interrupting dispatch. Prefetch only appends; dispatch only
/// pops.
fn maybe_prefetch(shared: &Arc<Shared>, cancel: &CancellationToken) {
    {
        let buffer = shared.buffer.lock();
        if buffer.queue.len() > shared.config.low_water_mark || buffer.cursor.is_none() {
            return;
        }
    }
    if shared.is_loading.swap(true, Ordering::AcqRel) {
        return;
    }
    let Some(cursor) = shared.buffer.lock().cursor.clone() else {
        shared.is_loading.store(false, Ordering::Release);
        return;
    };

    trace!(cursor = %cursor, "low-water mark reached, prefetching next page");

    let shared = Arc::clone(shared);
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = shared.source.next_page(&cursor) => {
                match result {
                    // A resync may have raced the fetch; its buffer must not
                    // receive pages from the generation being torn down.
                    Ok(page) if !cancel.is_cancelled() => {
                        let mut buffer = shared.buffer.lock();
                        buffer.cursor = if page.has_next_page { page.cursor } else { None };
                        buffer.queue.extend(page.messages);
                        trace!(queued = buffer.queue.len(), "prefetch appended");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Cursor stays intact; dispatch retries when it
                        // drains.
                        warn!(error = %e, "chat prefetch failed");
                    }
                }
            }
        }
        // On cancellation the next generation owns the flag; it was reset
        // when that generation began loading.
        if !cancel.is_cancelled() {
            shared.is_loading.store(false, Ordering::Release);
        }
    });
}
