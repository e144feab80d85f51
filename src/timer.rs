//! # Timer Module
//!
//! Tokio-backed periodic timers for the alarm check, the ring cadence and the
//! wallpaper tick. Timers only decide *when*; the work itself is a closure that
//! calls a plain state-transition method (`check_alarms`, `ring_tick`,
//! `on_tick`), so every controller can be tested by calling those directly.
//!
//! ## Timer kinds
//! - [`TimerTask::periodic`]: fixed-period loop, first tick one period after start
//! - [`RestartableTimer`]: parked until `restart`, re-phased on every `restart`,
//!   parked again on `stop` (the ring cycle)
//!
//! Both abort their background task when the returned [`TimerTask`] is dropped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{Error, Result};
use crate::ring::RingTimer;

/// Owns a running timer task
#[derive(Debug)]
pub struct TimerTask {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimerTask {
    /// Calls `on_tick` every `period` on the current tokio runtime.
    ///
    /// Fails when called outside a runtime or with a zero period. Ticks that
    /// could not run on time are skipped, not replayed.
    pub fn periodic<F, Fut>(name: &'static str, period: Duration, mut on_tick: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::Timer {
                name,
                reason: "period must be non-zero".to_string(),
            });
        }
        let runtime = current_runtime(name)?;

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                on_tick().await;
            }
        });

        log::debug!("Timer {name} started ({}s period)", period.as_secs_f32());
        Ok(Self::from_handle(name, handle))
    }

    fn from_handle(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self {
            name,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stops the background task
    pub fn stop(&self) {
        if let Ok(mut guard) = self.handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
                log::debug!("Timer {} stopped", self.name);
            }
        }
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.stop();
    }
}

fn current_runtime(name: &'static str) -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|e| Error::Timer {
        name,
        reason: e.to_string(),
    })
}

#[derive(Debug)]
struct Control {
    running: AtomicBool,
    period: Mutex<Duration>,
    notify: Notify,
}

/// A periodic timer that can be restarted and stopped from synchronous code.
///
/// Clones share the same control block: hand one to the ring cycle and use
/// another to [`RestartableTimer::spawn`] the task.
#[derive(Debug, Clone)]
pub struct RestartableTimer {
    control: Arc<Control>,
}

impl RestartableTimer {
    pub fn new() -> Self {
        Self {
            control: Arc::new(Control {
                running: AtomicBool::new(false),
                period: Mutex::new(Duration::from_secs(1)),
                notify: Notify::new(),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }

    /// Spawns the task that calls `on_tick` once per period while running.
    pub fn spawn<F, Fut>(&self, name: &'static str, mut on_tick: F) -> Result<TimerTask>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = current_runtime(name)?;
        let control = self.control.clone();

        let handle = runtime.spawn(async move {
            loop {
                if !control.running.load(Ordering::SeqCst) {
                    control.notify.notified().await;
                    continue;
                }

                let period = match control.period.lock() {
                    Ok(p) => *p,
                    Err(poisoned) => *poisoned.into_inner(),
                };

                tokio::select! {
                    _ = tokio::time::sleep(period) => {
                        if control.running.load(Ordering::SeqCst) {
                            on_tick().await;
                        }
                    }
                    // restart() or stop(): start the period over
                    _ = control.notify.notified() => {}
                }
            }
        });

        log::debug!("Timer {name} spawned");
        Ok(TimerTask::from_handle(name, handle))
    }
}

impl Default for RestartableTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingTimer for RestartableTimer {
    fn restart(&self, period: Duration) {
        if let Ok(mut p) = self.control.period.lock() {
            *p = period;
        }
        self.control.running.store(true, Ordering::SeqCst);
        self.control.notify.notify_one();
    }

    fn stop(&self) {
        self.control.running.store(false, Ordering::SeqCst);
        self.control.notify.notify_one();
    }
}
