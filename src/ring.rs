//! # Ring Cycle Module
//!
//! Owns the playback loop for a fired alarm: the ringtone is played every
//! [`RING_PERIOD`] until [`MAX_RINGS`] plays have happened or someone calls
//! [`RingCycle::stop`].
//!
//! ## State machine
//! ```text
//! Idle --start--> Ringing --stop / 11th tick--> Idle
//!                 Ringing --start--> Ringing (counters reset, timer re-phased)
//! ```
//!
//! The cycle never touches a platform timer directly. It asks a [`RingTimer`]
//! to restart or stop, and the owner of the timer calls [`RingCycle::on_tick`]
//! when the period elapses. Tests drive `on_tick` by hand.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::alarm::Alarm;

/// Interval between two plays of the ringtone
pub const RING_PERIOD: Duration = Duration::from_secs(10);

/// Number of plays before the cycle stops by itself
pub const MAX_RINGS: u32 = 10;

/// The closed set of ringtones the device ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ringtone {
    Ga,
    Alarm1,
    Iphone,
}

impl Ringtone {
    /// Maps a ringtone identifier to a ringtone. Unknown identifiers get [`Ringtone::Ga`].
    pub fn from_id(id: &str) -> Self {
        match id {
            "ga" => Ringtone::Ga,
            "alarm1" => Ringtone::Alarm1,
            "iphone" => Ringtone::Iphone,
            _ => Ringtone::Ga,
        }
    }

    /// File name of the ringtone inside the sounds directory
    pub fn file_name(self) -> &'static str {
        match self {
            Ringtone::Ga => "ga.ogg",
            Ringtone::Alarm1 => "alarm1.ogg",
            Ringtone::Iphone => "iphone.ogg",
        }
    }
}

/// A loaded sound. An empty `data` buffer means the sound is unavailable.
#[derive(Debug, Clone)]
pub struct Sound {
    pub ringtone: Ringtone,
    pub path: PathBuf,
    pub data: Arc<[u8]>,
}

impl Sound {
    pub fn new(ringtone: Ringtone, path: PathBuf, data: Vec<u8>) -> Self {
        Self {
            ringtone,
            path,
            data: Arc::from(data),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The three ringtones, loaded once at start-up.
#[derive(Debug, Clone)]
pub struct SoundBank {
    ga: Sound,
    alarm1: Sound,
    iphone: Sound,
}

impl SoundBank {
    pub fn new(ga: Sound, alarm1: Sound, iphone: Sound) -> Self {
        Self { ga, alarm1, iphone }
    }

    /// Reads every ringtone from `dir`. A missing or unreadable file becomes an
    /// empty sound so the fallback chain can take over.
    pub fn load(dir: &Path) -> Self {
        let read = |ringtone: Ringtone| {
            let path = dir.join(ringtone.file_name());
            let data = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Ringtone {} unavailable: {e}", path.display());
                    Vec::new()
                }
            };
            Sound::new(ringtone, path, data)
        };

        Self::new(
            read(Ringtone::Ga),
            read(Ringtone::Alarm1),
            read(Ringtone::Iphone),
        )
    }

    pub fn get(&self, ringtone: Ringtone) -> &Sound {
        match ringtone {
            Ringtone::Ga => &self.ga,
            Ringtone::Alarm1 => &self.alarm1,
            Ringtone::Iphone => &self.iphone,
        }
    }

    /// Picks the sound to play for a ringtone identifier.
    ///
    /// Fallback chain: selected → Alarm1 → Ga. The chain ends there even if Ga
    /// is empty too.
    pub fn resolve(&self, id: &str) -> &Sound {
        let selected = self.get(Ringtone::from_id(id));
        if !selected.is_empty() {
            return selected;
        }

        log::warn!("Ringtone '{id}' is empty, falling back to alarm1");
        let alarm1 = self.get(Ringtone::Alarm1);
        if !alarm1.is_empty() {
            return alarm1;
        }

        log::warn!("alarm1 is also empty, falling back to ga");
        self.get(Ringtone::Ga)
    }
}

/// Audio backend. Fire-and-forget.
pub trait AudioService: Send + Sync {
    fn play_sound(&self, sound: &Sound);
}

/// Periodic timer driving the ring cycle.
pub trait RingTimer: Send + Sync {
    /// (Re)start the timer so the next tick lands one full `period` from now
    fn restart(&self, period: Duration);
    fn stop(&self);
}

/// Outcome of a single ring timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingTick {
    /// Nothing is ringing
    Idle,
    /// The maximum ring count was reached and the cycle stopped
    Exhausted,
    /// The ringtone was played; carries the number of plays so far
    Played(u32),
}

pub struct RingCycle {
    active_alarm: Option<Alarm>,
    is_ringing: bool,
    ring_count: u32,
    timer: Box<dyn RingTimer>,
}

impl RingCycle {
    pub fn new(timer: Box<dyn RingTimer>) -> Self {
        Self {
            active_alarm: None,
            is_ringing: false,
            ring_count: 0,
            timer,
        }
    }

    /// Starts ringing for `alarm`, replacing any cycle already in progress.
    pub fn start(&mut self, alarm: &Alarm) {
        self.active_alarm = Some(alarm.clone());
        self.ring_count = 0;
        self.is_ringing = true;
        self.timer.restart(RING_PERIOD);

        log::info!("Ringing started: ringtone={}", alarm.ringtone);
    }

    /// Handles one ring timer tick.
    pub fn on_tick(&mut self, sounds: &SoundBank, audio: &dyn AudioService) -> RingTick {
        if !self.is_ringing {
            return RingTick::Idle;
        }

        if self.ring_count >= MAX_RINGS {
            log::info!("Reached max ring count, stopping alarm");
            self.stop();
            return RingTick::Exhausted;
        }

        let id = self
            .active_alarm
            .as_ref()
            .map(|a| a.ringtone.as_str())
            .unwrap_or_default();
        let sound = sounds.resolve(id);

        log::info!("Playing alarm sound #{} (id={id})", self.ring_count + 1);
        audio.play_sound(sound);

        self.ring_count += 1;
        RingTick::Played(self.ring_count)
    }

    /// Stops the cycle. Safe to call when idle.
    pub fn stop(&mut self) {
        if !self.is_ringing {
            return;
        }

        self.is_ringing = false;
        self.ring_count = 0;
        self.active_alarm = None;
        self.timer.stop();

        log::info!("Alarm ringing stopped");
    }

    pub fn is_ringing(&self) -> bool {
        self.is_ringing
    }

    #[cfg(test)]
    pub fn ring_count(&self) -> u32 {
        self.ring_count
    }

    #[cfg(test)]
    pub fn active_alarm(&self) -> Option<&Alarm> {
        self.active_alarm.as_ref()
    }
}
