//! # Alarm Scheduler Module
//!
//! Keeps the list of alarms and compares it against the wall clock once per
//! minute. A matching alarm raises a host alert, starts the ring cycle and
//! calls the user callback. One-shot alarms are removed right after they fire.
//!
//! ## Matching
//! Matching is an exact `(hour, minute)` comparison. A check that runs late and
//! misses the minute misses the alarm for that day; there is no catch-up.

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::ring::{AudioService, RingCycle, RingTick, SoundBank};

/// Cadence of the wall-clock check
pub const CHECK_PERIOD: std::time::Duration = std::time::Duration::from_secs(60);

/// A single alarm.
///
/// Serialised field names are part of the exported format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// 0..=23
    pub hour: u32,
    /// 0..=59
    pub minute: u32,
    /// Ringtone identifier ("ga", "alarm1", "iphone"; anything else plays "ga")
    pub ringtone: String,
    pub repeat_daily: bool,
}

/// Host notification surface. Fire-and-forget.
pub trait AlertSurface: Send + Sync {
    fn alert(&self, title: &str, body: &str, icon: &str, extra: &str);
}

type TriggerCallback = Box<dyn Fn(&Alarm) + Send + Sync>;

pub struct AlarmScheduler {
    alarms: Vec<Alarm>,
    ring: RingCycle,
    alerts: Box<dyn AlertSurface>,
    on_triggered: Option<TriggerCallback>,
}

impl AlarmScheduler {
    pub fn new(ring: RingCycle, alerts: Box<dyn AlertSurface>) -> Self {
        Self {
            alarms: Vec::new(),
            ring,
            alerts,
            on_triggered: None,
        }
    }

    /// Registers the callback invoked with every triggered alarm
    pub fn set_on_triggered(&mut self, cb: impl Fn(&Alarm) + Send + Sync + 'static) {
        self.on_triggered = Some(Box::new(cb));
    }

    /// Appends an alarm. Out-of-range hour/minute values are clamped, not rejected.
    pub fn add_alarm(&mut self, hour: i32, minute: i32, ringtone: &str, repeat_daily: bool) {
        let hour = hour.clamp(0, 23) as u32;
        let minute = minute.clamp(0, 59) as u32;

        self.alarms.push(Alarm {
            hour,
            minute,
            ringtone: ringtone.to_string(),
            repeat_daily,
        });
        log::info!("Added alarm {hour:02}:{minute:02} ringtone={ringtone} repeat={repeat_daily}");
    }

    /// Stops any ringing alarm and drops every alarm
    pub fn remove_all(&mut self) {
        self.ring.stop();
        self.alarms.clear();
        log::info!("All alarms cleared");
    }

    /// Compact JSON array of all alarms, in insertion order
    pub fn list_alarms(&self) -> String {
        serde_json::to_string(&self.alarms).unwrap_or_else(|e| {
            log::error!("Failed to serialize alarms: {e}");
            "[]".to_string()
        })
    }

    #[cfg(test)]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    /// Checks the alarms against the local wall clock.
    pub fn check_alarms(&mut self) -> usize {
        let now = Local::now();
        self.check_alarms_at(now.hour(), now.minute())
    }

    /// Triggers every alarm set for `hour:minute`. Returns how many fired.
    pub fn check_alarms_at(&mut self, hour: u32, minute: u32) -> usize {
        let due: Vec<Alarm> = self
            .alarms
            .iter()
            .filter(|a| a.hour == hour && a.minute == minute)
            .cloned()
            .collect();

        if due.is_empty() {
            return 0;
        }

        self.alarms
            .retain(|a| !(a.hour == hour && a.minute == minute && !a.repeat_daily));

        for alarm in &due {
            self.trigger(alarm);
        }
        due.len()
    }

    fn trigger(&mut self, alarm: &Alarm) {
        log::info!(
            "Alarm triggered at {:02}:{:02} (ring={})",
            alarm.hour,
            alarm.minute,
            alarm.ringtone
        );

        self.alerts.alert("Alarm", "Time's up!", "bell", "");
        self.ring.start(alarm);

        if let Some(cb) = &self.on_triggered {
            cb(alarm);
        }
    }

    /// User-facing "stop alarm" action
    pub fn stop_ringing(&mut self) {
        self.ring.stop();
    }

    pub fn is_ringing(&self) -> bool {
        self.ring.is_ringing()
    }

    /// Forwards a ring timer tick to the ring cycle
    pub fn ring_tick(&mut self, sounds: &SoundBank, audio: &dyn AudioService) -> RingTick {
        self.ring.on_tick(sounds, audio)
    }

    #[cfg(test)]
    pub fn ring(&self) -> &RingCycle {
        &self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::tests::{full_bank, CountingTimer, RecordingAudio};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingAlerts {
        titles: Arc<Mutex<Vec<String>>>,
    }

    impl AlertSurface for RecordingAlerts {
        fn alert(&self, title: &str, _body: &str, icon: &str, _extra: &str) {
            assert_eq!(icon, "bell");
            self.titles.lock().unwrap().push(title.to_string());
        }
    }

    fn scheduler() -> (AlarmScheduler, RecordingAlerts) {
        let alerts = RecordingAlerts::default();
        let ring = RingCycle::new(Box::new(CountingTimer::default()));
        (AlarmScheduler::new(ring, Box::new(alerts.clone())), alerts)
    }

    #[test]
    fn test_add_alarm_clamps() {
        let (mut s, _) = scheduler();
        s.add_alarm(-5, -1, "ga", false);
        s.add_alarm(24, 60, "ga", false);
        s.add_alarm(i32::MAX, i32::MIN, "ga", false);
        s.add_alarm(12, 34, "ga", false);

        let got: Vec<(u32, u32)> = s.alarms().iter().map(|a| (a.hour, a.minute)).collect();
        assert_eq!(got, vec![(0, 0), (23, 59), (23, 0), (12, 34)]);
    }

    #[test]
    fn test_list_alarms_empty() {
        let (s, _) = scheduler();
        assert_eq!(s.list_alarms(), "[]");
    }

    #[test]
    fn test_list_alarms_in_order() {
        let (mut s, _) = scheduler();
        s.add_alarm(6, 5, "iphone", true);
        s.add_alarm(21, 0, "ga", false);

        assert_eq!(
            s.list_alarms(),
            r#"[{"hour":6,"minute":5,"ringtone":"iphone","repeat_daily":true},{"hour":21,"minute":0,"ringtone":"ga","repeat_daily":false}]"#
        );
        // Listing never mutates
        assert_eq!(s.alarms().len(), 2);
    }

    #[test]
    fn test_one_shot_fires_once_and_is_removed() {
        let (mut s, alerts) = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();
        s.set_on_triggered(move |a| {
            assert_eq!(a.hour, 7);
            fired_cb.fetch_add(1, Ordering::SeqCst);
        });

        s.add_alarm(7, 0, "ga", false);
        assert_eq!(s.check_alarms_at(7, 0), 1);
        assert!(s.alarms().is_empty());
        assert!(s.is_ringing());

        assert_eq!(s.check_alarms_at(7, 0), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(alerts.titles.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_repeat_daily_is_retained() {
        let (mut s, _) = scheduler();
        s.add_alarm(8, 15, "alarm1", true);

        assert_eq!(s.check_alarms_at(8, 15), 1);
        assert_eq!(s.alarms().len(), 1);
        assert_eq!(s.check_alarms_at(8, 15), 1);
        assert_eq!(s.alarms().len(), 1);
    }

    #[test]
    fn test_non_matching_time_does_nothing() {
        let (mut s, alerts) = scheduler();
        s.add_alarm(8, 15, "ga", false);
        assert_eq!(s.check_alarms_at(8, 16), 0);
        assert_eq!(s.alarms().len(), 1);
        assert!(!s.is_ringing());
        assert!(alerts.titles.lock().unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_each_trigger() {
        let (mut s, alerts) = scheduler();
        s.add_alarm(9, 0, "ga", false);
        s.add_alarm(9, 0, "ga", false);
        s.add_alarm(9, 0, "iphone", true);

        assert_eq!(s.check_alarms_at(9, 0), 3);
        assert_eq!(alerts.titles.lock().unwrap().len(), 3);
        assert_eq!(s.alarms().len(), 1);
        // Last trigger wins the ring cycle
        assert_eq!(
            s.ring().active_alarm().map(|a| a.ringtone.as_str()),
            Some("iphone")
        );
    }

    #[test]
    fn test_remove_all_stops_ringing() {
        let (mut s, _) = scheduler();
        s.add_alarm(10, 0, "ga", true);
        s.add_alarm(11, 0, "ga", false);
        s.check_alarms_at(10, 0);
        assert!(s.is_ringing());

        s.remove_all();
        assert!(s.alarms().is_empty());
        assert!(!s.is_ringing());

        // Idempotent on an empty, idle scheduler
        s.remove_all();
        assert!(s.alarms().is_empty());
    }

    #[test]
    fn test_ring_tick_plays_through_scheduler() {
        let (mut s, _) = scheduler();
        let audio = RecordingAudio::default();
        s.add_alarm(6, 0, "alarm1", false);
        s.check_alarms_at(6, 0);

        assert_eq!(s.ring_tick(&full_bank(), &audio), RingTick::Played(1));
        s.stop_ringing();
        assert_eq!(s.ring_tick(&full_bank(), &audio), RingTick::Idle);
        assert_eq!(audio.count(), 1);
    }
}
