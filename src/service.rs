//! # Device Control Service
//!
//! Exposes the alarm scheduler and the wallpaper rotation over D-Bus so other
//! processes (the CLI, an assistant, a settings UI) can drive them.
//!
//! ## D-Bus Interface
//!
//! Service name: `io.github.ambient_clock.Device1`
//! Object path: `/io/github/ambient_clock/Device1`
//!
//! ### Methods
//! - `AddAlarm(hour: i32, minute: i32, ringtone: String, repeat_daily: bool)`
//! - `RemoveAllAlarms()` - also stops a ringing alarm
//! - `ListAlarms() -> String` - compact JSON array
//! - `StopRinging()` / `IsRinging() -> bool`
//! - `SetWallpapers(names: Vec<String>) -> bool`
//! - `ApplyWallpaper(index: u32) -> bool`
//! - `ApplyWallpaperWithEffect(index: u32, effect: String) -> bool`
//! - `EnableAutoRotate(enabled: bool, interval_secs: i32)`
//! - `GetCurrentWallpaper() -> (u32, String)`
//!
//! ### Signals
//! - `AlarmTriggered(hour: i32, minute: i32, ringtone: String)`
//! - `WallpaperChanged(index: u32, name: String)`

use std::sync::Arc;
use tokio::sync::Mutex;
use zbus::{interface, SignalContext};

use crate::alarm::AlarmScheduler;
use crate::transition::TransitionEffect;
use crate::wallpaper::WallpaperRotation;

/// D-Bus service name
pub const SERVICE_NAME: &str = "io.github.ambient_clock.Device1";

/// D-Bus object path
pub const OBJECT_PATH: &str = "/io/github/ambient_clock/Device1";

/// Controllers shared between the timer tasks and the D-Bus service
#[derive(Clone)]
pub struct DeviceState {
    pub alarms: Arc<Mutex<AlarmScheduler>>,
    pub wallpapers: Arc<Mutex<WallpaperRotation>>,
}

pub struct DeviceService {
    state: DeviceState,
}

impl DeviceService {
    pub fn new(state: DeviceState) -> Self {
        Self { state }
    }
}

#[interface(name = "io.github.ambient_clock.Device1")]
impl DeviceService {
    /// Add an alarm; out-of-range values are clamped
    async fn add_alarm(&self, hour: i32, minute: i32, ringtone: String, repeat_daily: bool) {
        self.state
            .alarms
            .lock()
            .await
            .add_alarm(hour, minute, &ringtone, repeat_daily);
    }

    /// Remove every alarm and stop ringing
    async fn remove_all_alarms(&self) {
        self.state.alarms.lock().await.remove_all();
    }

    /// All alarms as a JSON array
    async fn list_alarms(&self) -> String {
        self.state.alarms.lock().await.list_alarms()
    }

    /// Stop the alarm that is currently ringing, if any
    async fn stop_ringing(&self) {
        self.state.alarms.lock().await.stop_ringing();
    }

    async fn is_ringing(&self) -> bool {
        self.state.alarms.lock().await.is_ringing()
    }

    /// Replace the wallpaper list; the current wallpaper is applied immediately
    async fn set_wallpapers(&self, names: Vec<String>) -> bool {
        self.state.wallpapers.lock().await.set_wallpapers(names)
    }

    /// Apply a wallpaper instantly
    async fn apply_wallpaper(&self, index: u32) -> bool {
        self.state.wallpapers.lock().await.apply(index as usize)
    }

    /// Apply a wallpaper through the fade transition
    async fn apply_wallpaper_with_effect(&self, index: u32, effect: String) -> bool {
        let effect = TransitionEffect::parse(&effect);
        self.state
            .wallpapers
            .lock()
            .await
            .apply_with_effect(index as usize, effect)
            .await
    }

    async fn enable_auto_rotate(&self, enabled: bool, interval_secs: i32) {
        self.state
            .wallpapers
            .lock()
            .await
            .enable_auto_rotate(enabled, interval_secs);
    }

    /// Index and name of the wallpaper on screen (empty name when none is set)
    async fn get_current_wallpaper(&self) -> (u32, String) {
        let rotation = self.state.wallpapers.lock().await;
        (
            rotation.current_index() as u32,
            rotation.current_name().unwrap_or_default().to_string(),
        )
    }

    // === Signals ===

    /// Signal emitted when an alarm fires
    #[zbus(signal)]
    pub async fn alarm_triggered(
        ctx: &SignalContext<'_>,
        hour: i32,
        minute: i32,
        ringtone: &str,
    ) -> zbus::Result<()>;

    /// Signal emitted after a wallpaper was applied
    #[zbus(signal)]
    pub async fn wallpaper_changed(ctx: &SignalContext<'_>, index: u32, name: &str) -> zbus::Result<()>;
}
