//! # Display Interfaces
//!
//! Narrow view of the rendering toolkit: named themes carrying a background
//! image, a chat/status line, and an optional compositor surface for overlay
//! animations. The compositor sits behind a `std::sync::Mutex`, which is the
//! rendering lock; callers take it only around direct manipulation.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::image::WallpaperHandle;

/// Theme variants that carry the wallpaper
pub const THEME_VARIANTS: [&str; 2] = ["light", "dark"];

/// Fully transparent overlay opacity
pub const OPA_TRANSPARENT: u8 = 0;
/// Fully opaque overlay opacity
pub const OPA_COVER: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u32);

/// Compositor primitives used by the fade transition
pub trait Surface {
    /// Creates a full-screen black overlay with the given opacity
    fn create_overlay(&mut self, opacity: u8) -> OverlayId;
    /// Starts an opacity ramp; the animation runs on the toolkit's own loop
    fn animate_opacity(&mut self, overlay: OverlayId, from: u8, to: u8, duration: Duration);
    fn delete_overlay(&mut self, overlay: OverlayId);
}

/// Rendering lock around a compositor surface
pub type SharedSurface = Arc<Mutex<dyn Surface + Send>>;

pub trait Display: Send + Sync {
    /// Name of the active theme, `None` when no theme is set up yet
    fn current_theme(&self) -> Option<String>;
    /// Re-applies a theme so the screen picks up changed theme properties
    fn set_theme(&self, name: &str);
    /// Sets the background of a named theme. Returns false if the theme does not exist.
    fn set_background_image(&self, theme: &str, image: &WallpaperHandle) -> bool;
    fn set_chat_message(&self, role: &str, text: &str);
    /// `None` when the toolkit has no overlay animation support
    fn compositor(&self) -> Option<SharedSurface>;
}

/// Takes the rendering lock, recovering the surface if a previous holder panicked.
pub fn lock_surface(surface: &SharedSurface) -> MutexGuard<'_, dyn Surface + Send + 'static> {
    match surface.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Sets `image` on both theme variants and re-applies the active theme.
pub fn swap_background(display: &dyn Display, theme: &str, image: &WallpaperHandle) {
    for variant in THEME_VARIANTS {
        display.set_background_image(variant, image);
    }
    display.set_theme(theme);
}
