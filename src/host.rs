//! # Host Collaborators
//!
//! Concrete implementations of the collaborator traits for running the daemon on
//! a regular Linux host:
//!
//! - [`HostNotifier`] - alarm alerts through `notify-send`
//! - [`HostPlayer`] - ringtones through an external player (`paplay` by default)
//! - [`HeadlessDisplay`] - in-memory theme state with a logging compositor
//!
//! Commands are spawned in the background. A runtime task waits on each child
//! so finished commands are reaped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::alarm::AlertSurface;
use crate::display::{Display, OverlayId, SharedSurface, Surface, THEME_VARIANTS};
use crate::image::WallpaperHandle;
use crate::ring::{AudioService, Sound};

/// Checks if the application is running inside a Flatpak sandbox.
pub fn is_flatpak() -> bool {
    std::path::Path::new("/.flatpak-info").exists()
}

/// Spawns a command on the host, prefixing `flatpak-spawn --host` inside Flatpak.
///
/// Must be called from within a tokio runtime, which waits on the child.
fn spawn_host_command(cmd: &str, args: &[&str]) -> std::io::Result<()> {
    let runtime = tokio::runtime::Handle::try_current().map_err(std::io::Error::other)?;

    let mut command = if is_flatpak() {
        let mut command = tokio::process::Command::new("flatpak-spawn");
        command.arg("--host").arg(cmd);
        command
    } else {
        tokio::process::Command::new(cmd)
    };
    let mut child = command.args(args).spawn()?;

    let program = cmd.to_string();
    runtime.spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => log::debug!("{program} exited with {status}"),
            Ok(_) => {}
            Err(e) => log::warn!("Failed to wait for {program}: {e}"),
        }
    });
    Ok(())
}

/// Splits a configured command line into program and leading arguments
fn split_command(command: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Desktop notifications via `notify-send`
#[derive(Debug, Default)]
pub struct HostNotifier;

impl AlertSurface for HostNotifier {
    fn alert(&self, title: &str, body: &str, icon: &str, _extra: &str) {
        if let Err(e) = spawn_host_command("notify-send", &["-i", icon, title, body]) {
            log::warn!("Failed to show alert '{title}': {e}");
        }
    }
}

/// Plays sound files with an external command
#[derive(Debug)]
pub struct HostPlayer {
    command: String,
}

impl HostPlayer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl AudioService for HostPlayer {
    fn play_sound(&self, sound: &Sound) {
        if sound.is_empty() {
            log::warn!("Skipping empty sound {:?}", sound.ringtone);
            return;
        }
        let Some((program, mut args)) = split_command(&self.command) else {
            log::warn!("No player command configured");
            return;
        };

        let path = sound.path.to_string_lossy();
        args.push(&path);
        if let Err(e) = spawn_host_command(program, &args) {
            log::warn!("Failed to play {}: {e}", sound.path.display());
        }
    }
}

/// Compositor that tracks overlay opacity and logs every operation.
/// Ramps complete immediately.
#[derive(Debug, Default)]
pub struct LoggingSurface {
    next_id: u32,
    overlays: HashMap<OverlayId, u8>,
}

#[cfg(test)]
impl LoggingSurface {
    pub fn opacity(&self, overlay: OverlayId) -> Option<u8> {
        self.overlays.get(&overlay).copied()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }
}

impl Surface for LoggingSurface {
    fn create_overlay(&mut self, opacity: u8) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.overlays.insert(id, opacity);
        log::debug!("Overlay {} created (opacity {opacity})", id.0);
        id
    }

    fn animate_opacity(&mut self, overlay: OverlayId, from: u8, to: u8, duration: Duration) {
        if let Some(opacity) = self.overlays.get_mut(&overlay) {
            *opacity = to;
        }
        log::debug!(
            "Overlay {} opacity {from} -> {to} over {}ms",
            overlay.0,
            duration.as_millis()
        );
    }

    fn delete_overlay(&mut self, overlay: OverlayId) {
        self.overlays.remove(&overlay);
        log::debug!("Overlay {} deleted", overlay.0);
    }
}

#[derive(Debug)]
struct ScreenState {
    theme: String,
    backgrounds: HashMap<String, String>,
    chat: Option<(String, String)>,
}

/// Display without a physical panel. Keeps theme state in memory so the
/// daemon can run and be inspected on a development host.
pub struct HeadlessDisplay {
    state: Mutex<ScreenState>,
    surface: Arc<Mutex<LoggingSurface>>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScreenState {
                theme: "light".to_string(),
                backgrounds: HashMap::new(),
                chat: None,
            }),
            surface: Arc::new(Mutex::new(LoggingSurface::default())),
        }
    }
}

#[cfg(test)]
impl HeadlessDisplay {
    /// Name of the image set on `theme`
    pub fn background(&self, theme: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.backgrounds.get(theme).cloned())
    }

    pub fn chat_message(&self) -> Option<(String, String)> {
        self.state.lock().ok().and_then(|s| s.chat.clone())
    }

    pub fn surface(&self) -> Arc<Mutex<LoggingSurface>> {
        self.surface.clone()
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    fn current_theme(&self) -> Option<String> {
        self.state.lock().ok().map(|s| s.theme.clone())
    }

    fn set_theme(&self, name: &str) {
        if let Ok(mut s) = self.state.lock() {
            s.theme = name.to_string();
        }
        log::debug!("Theme applied: {name}");
    }

    fn set_background_image(&self, theme: &str, image: &WallpaperHandle) -> bool {
        if !THEME_VARIANTS.contains(&theme) {
            return false;
        }
        if let Ok(mut s) = self.state.lock() {
            s.backgrounds.insert(theme.to_string(), image.name.clone());
        }
        log::debug!(
            "Background of {theme} theme set to {} ({:?}, {} bytes, {})",
            image.name,
            image.kind,
            image.data().len(),
            if image.is_borrowed() { "mapped" } else { "owned" }
        );
        true
    }

    fn set_chat_message(&self, role: &str, text: &str) {
        log::info!("[{role}] {text}");
        if let Ok(mut s) = self.state.lock() {
            s.chat = Some((role.to_string(), text.to_string()));
        }
    }

    fn compositor(&self) -> Option<SharedSurface> {
        let surface: SharedSurface = self.surface.clone();
        Some(surface)
    }
}
