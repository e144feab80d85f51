//! # D-Bus Client Module
//!
//! Client side of the device control service, used by the CLI commands to
//! talk to a running daemon.
//!
//! ## Usage
//!
//! ```ignore
//! let client = DeviceClient::connect().await?;
//! client.add_alarm(7, 30, "iphone", true).await?;
//! println!("{}", client.list_alarms().await?);
//! ```

use zbus::{proxy, Connection};

/// D-Bus proxy for the device service
#[proxy(
    interface = "io.github.ambient_clock.Device1",
    default_service = "io.github.ambient_clock.Device1",
    default_path = "/io/github/ambient_clock/Device1"
)]
trait DeviceService {
    async fn add_alarm(&self, hour: i32, minute: i32, ringtone: &str, repeat_daily: bool) -> zbus::Result<()>;

    async fn remove_all_alarms(&self) -> zbus::Result<()>;

    /// All alarms as a JSON array
    async fn list_alarms(&self) -> zbus::Result<String>;

    async fn stop_ringing(&self) -> zbus::Result<()>;

    async fn is_ringing(&self) -> zbus::Result<bool>;

    async fn set_wallpapers(&self, names: &[&str]) -> zbus::Result<bool>;

    async fn apply_wallpaper_with_effect(&self, index: u32, effect: &str) -> zbus::Result<bool>;

    async fn enable_auto_rotate(&self, enabled: bool, interval_secs: i32) -> zbus::Result<()>;

    /// Index and name of the wallpaper on screen
    async fn get_current_wallpaper(&self) -> zbus::Result<(u32, String)>;
}

/// High-level client for the device service
pub struct DeviceClient {
    proxy: DeviceServiceProxy<'static>,
}

impl DeviceClient {
    /// Connect to the device service
    ///
    /// Only the bus connection is checked here; a daemon that is not running is
    /// reported by the first method call.
    pub async fn connect() -> zbus::Result<Self> {
        let connection = Connection::session().await?;
        let proxy = DeviceServiceProxy::new(&connection).await?;
        Ok(Self { proxy })
    }

    pub async fn add_alarm(&self, hour: i32, minute: i32, ringtone: &str, repeat_daily: bool) -> zbus::Result<()> {
        self.proxy.add_alarm(hour, minute, ringtone, repeat_daily).await
    }

    /// Remove every alarm; also silences a ringing alarm
    pub async fn remove_all_alarms(&self) -> zbus::Result<()> {
        self.proxy.remove_all_alarms().await
    }

    pub async fn list_alarms(&self) -> zbus::Result<String> {
        self.proxy.list_alarms().await
    }

    /// Stops ringing. Returns whether an alarm was ringing.
    pub async fn stop_ringing(&self) -> zbus::Result<bool> {
        let was_ringing = self.proxy.is_ringing().await?;
        self.proxy.stop_ringing().await?;
        Ok(was_ringing)
    }

    pub async fn set_wallpapers(&self, names: &[&str]) -> zbus::Result<bool> {
        self.proxy.set_wallpapers(names).await
    }

    /// Fades to the wallpaper after the current one
    pub async fn next_wallpaper(&self) -> zbus::Result<bool> {
        let (index, _) = self.proxy.get_current_wallpaper().await?;
        self.proxy
            .apply_wallpaper_with_effect(index.wrapping_add(1), "fade_black")
            .await
    }

    pub async fn enable_auto_rotate(&self, enabled: bool, interval_secs: i32) -> zbus::Result<()> {
        self.proxy.enable_auto_rotate(enabled, interval_secs).await
    }

    pub async fn current_wallpaper(&self) -> zbus::Result<(u32, String)> {
        self.proxy.get_current_wallpaper().await
    }
}
