//! Local (preloaded list) replay cursor.
//!
//! Same dispatch contract as the paginated variant, fed by a fully
//! materialized message list: no pagination, resync is a cheap synchronous
//! re-filter, and pending waits scale by a live speed factor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::ReplayConfig;
use crate::source::PlaybackClock;
use crate::types::{ChatEvent, ReplayEvent};

struct Shared {
    /// Full recording chat log, in non-decreasing offset order.
    messages: Vec<ChatEvent>,
    clock: Arc<dyn PlaybackClock>,
    config: ReplayConfig,
    events: broadcast::Sender<ReplayEvent>,
    queue: Mutex<VecDeque<ChatEvent>>,
    /// Externally updated playback speed factor.
    speed: Mutex<f64>,
    last_position_ms: AtomicI64,
}

#[derive(Default)]
struct Tasks {
    watchdog: Option<CancellationToken>,
    dispatch: Option<CancellationToken>,
}

/// Replay cursor over a preloaded, in-memory chat log.
#[derive(Clone)]
pub struct LocalChatReplay {
    shared: Arc<Shared>,
    tasks: Arc<Mutex<Tasks>>,
}

impl LocalChatReplay {
    pub fn new(
        messages: Vec<ChatEvent>,
        clock: Arc<dyn PlaybackClock>,
        config: ReplayConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            shared: Arc::new(Shared {
                messages,
                clock,
                config,
                events,
                queue: Mutex::new(VecDeque::new()),
                speed: Mutex::new(1.0),
                last_position_ms: AtomicI64::new(0),
            }),
            tasks: Arc::new(Mutex::new(Tasks::default())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReplayEvent> {
        self.shared.events.subscribe()
    }

    /// Begin replay at the given playback position. Any previous run is
    /// cancelled first.
    pub fn start(&self, position_ms: i64) {
        self.stop();

        self.shared
            .last_position_ms
            .store(position_ms, Ordering::Release);
        self.refill(position_ms);

        debug!(position_ms, queued = self.shared.queue.lock().len(), "local chat replay starting");

        let watchdog = CancellationToken::new();
        self.tasks.lock().watchdog = Some(watchdog.clone());
        let cursor = self.clone();
        tokio::spawn(async move {
            cursor.watchdog_loop(watchdog).await;
        });

        self.respawn_dispatch();
    }

    pub fn stop(&self) {
        let mut tasks = self.tasks.lock();
        if let Some(token) = tasks.watchdog.take() {
            token.cancel();
        }
        if let Some(token) = tasks.dispatch.take() {
            token.cancel();
        }
        drop(tasks);
        self.shared.queue.lock().clear();
    }

    /// Same drift contract as the paginated variant; a resync here is a
    /// synchronous re-filter of the in-memory list, no network involved.
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

        debug!(delta_ms = delta, position_ms, "position drift, refiltering local replay");

        if let Some(token) = self.tasks.lock().dispatch.take() {
            token.cancel();
        }
        self.refill(position_ms);
        let _ = self.shared.events.send(ReplayEvent::Clear);
        self.respawn_dispatch();
    }

    /// Apply a new playback speed. Restarts only the dispatch loop (the
    /// queue is untouched) so the next wait computation picks the factor up
    /// immediately instead of letting the current sleep expire.
    pub fn update_speed(&self, speed: f64) {
        {
            let mut current = self.shared.speed.lock();
            if (*current - speed).abs() < f64::EPSILON {
                return;
            }
            debug!(from = *current, to = speed, "replay speed changed");
            *current = speed;
        }
        if let Some(token) = self.tasks.lock().dispatch.take() {
            token.cancel();
        }
        self.respawn_dispatch();
    }

    /// Rebuild the queue with messages at or after `position - rewind`.
    fn refill(&self, position_ms: i64) {
        let floor_ms = (position_ms - self.shared.config.local_rewind_ms).max(0);
        let queue: VecDeque<ChatEvent> = self
            .shared
            .messages
            .iter()
            .filter(|m| m.offset_ms().map_or(true, |off| off >= floor_ms))
            .cloned()
            .collect();
        *self.shared.queue.lock() = queue;
    }

    fn respawn_dispatch(&self) {
        let token = CancellationToken::new();
        {
            let mut tasks = self.tasks.lock();
            if let Some(old) = tasks.dispatch.take() {
                old.cancel();
            }
            tasks.dispatch = Some(token.clone());
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("local dispatch cancelled");
                }
                _ = dispatch_loop(shared) => {}
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

async fn dispatch_loop(shared: Arc<Shared>) {
    loop {
        // Peek instead of popping: a cancelled sleep (speed change, resync)
        // must leave the pending message in place for the next run.
        let head = shared.queue.lock().front().cloned();
        let Some(message) = head else {
            debug!("local chat log drained, dispatch done");
            return;
        };

        if let Some(target_ms) = message.offset_ms() {
            let current = shared.clock.position_ms();
            let speed = *shared.speed.lock();
            let delay_ms = ((target_ms - current) as f64 / speed.max(0.01)).max(0.0);
            if delay_ms > 0.0 {
                trace!(target_ms, current, speed, delay_ms, "waiting for chat message slot");
                tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
            }
        }

        // Pop unconditionally, no staleness check: the resync filter already
        // narrowed the queue to a close window.
        shared.queue.lock().pop_front();
        let _ = shared.events.send(ReplayEvent::Message(message));
    }
}
