//! # Wallpaper Rotation Module
//!
//! Owns the ordered wallpaper list, the index of the wallpaper on screen and
//! the auto-rotate countdown. `on_tick` is called once per second; when the
//! interval elapses the next wallpaper is faded in.
//!
//! `current_index` only moves after an image was loaded and applied. A failed
//! load leaves the previous wallpaper on screen.

use std::sync::Arc;

use crate::display::{swap_background, Display};
use crate::image::{ImageResolver, WallpaperHandle};
use crate::transition::{fade_black_then_apply, TransitionEffect};

/// Default auto-rotate interval (3 minutes)
pub const DEFAULT_INTERVAL_SECS: u32 = 180;

type ChangedCallback = Box<dyn Fn(usize, &str) + Send + Sync>;

pub struct WallpaperRotation {
    wallpapers: Vec<String>,
    current_index: usize,
    auto_rotate: bool,
    interval_secs: u32,
    elapsed_secs: u32,
    resolver: ImageResolver,
    display: Option<Arc<dyn Display>>,
    on_changed: Option<ChangedCallback>,
}

impl WallpaperRotation {
    pub fn new(resolver: ImageResolver, display: Option<Arc<dyn Display>>) -> Self {
        Self {
            wallpapers: Vec::new(),
            current_index: 0,
            auto_rotate: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
            elapsed_secs: 0,
            resolver,
            display,
            on_changed: None,
        }
    }

    /// Registers a callback invoked with `(index, name)` after every successful apply
    pub fn set_on_changed(&mut self, cb: impl Fn(usize, &str) + Send + Sync + 'static) {
        self.on_changed = Some(Box::new(cb));
    }

    /// Replaces the wallpaper list and applies the wallpaper at the (wrapped)
    /// current index right away.
    pub fn set_wallpapers(&mut self, names: Vec<String>) -> bool {
        self.wallpapers = names;
        if self.wallpapers.is_empty() {
            log::info!("Wallpaper list cleared");
            return false;
        }
        self.current_index %= self.wallpapers.len();
        self.apply(self.current_index)
    }

    /// Applies the wallpaper at `index` (wrapped) without a transition.
    pub fn apply(&mut self, index: usize) -> bool {
        let Some((index, display, theme, image)) = self.prepare(index) else {
            return false;
        };

        swap_background(display.as_ref(), &theme, &image);
        self.commit(index, display.as_ref());
        log::info!("Applied wallpaper #{index}: {}", self.wallpapers[index]);
        true
    }

    /// Applies the wallpaper at `index` (wrapped) through the fade transition.
    ///
    /// `effect` is always normalised to [`TransitionEffect::FadeBlack`]. Without a
    /// compositor the swap happens instantly.
    pub async fn apply_with_effect(&mut self, index: usize, effect: TransitionEffect) -> bool {
        if effect != TransitionEffect::FadeBlack {
            log::warn!("Transition effect {effect:?} is not supported, using FadeBlack");
        }

        let Some((index, display, theme, image)) = self.prepare(index) else {
            return false;
        };

        match display.compositor() {
            Some(surface) => {
                fade_black_then_apply(&surface, display.as_ref(), &theme, &image).await;
            }
            None => {
                log::debug!("No compositor, applying wallpaper without transition");
                swap_background(display.as_ref(), &theme, &image);
            }
        }

        self.commit(index, display.as_ref());
        log::info!("Applied wallpaper #{index} with FadeBlack: {}", self.wallpapers[index]);
        true
    }

    /// Turns auto-rotate on or off. A positive `interval_secs` replaces the
    /// interval; the countdown always restarts.
    pub fn enable_auto_rotate(&mut self, enabled: bool, interval_secs: i32) {
        self.auto_rotate = enabled;
        if interval_secs > 0 {
            self.interval_secs = interval_secs as u32;
        }
        self.elapsed_secs = 0;
        log::info!(
            "Auto-rotate {} (every {}s)",
            if enabled { "enabled" } else { "disabled" },
            self.interval_secs
        );
    }

    /// One-second tick. Returns true if a rotation was attempted.
    pub async fn on_tick(&mut self) -> bool {
        if !self.auto_rotate || self.wallpapers.len() < 2 {
            return false;
        }

        self.elapsed_secs += 1;
        if self.elapsed_secs < self.interval_secs {
            return false;
        }

        self.elapsed_secs = 0;
        let next = (self.current_index + 1) % self.wallpapers.len();
        self.apply_with_effect(next, TransitionEffect::FadeBlack).await;
        true
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_name(&self) -> Option<&str> {
        self.wallpapers.get(self.current_index).map(String::as_str)
    }

    pub fn wallpapers(&self) -> &[String] {
        &self.wallpapers
    }

    pub fn auto_rotate_enabled(&self) -> bool {
        self.auto_rotate
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    /// Shared checks for both apply paths: wraps the index, finds the display and
    /// its active theme, and loads the image.
    fn prepare(&self, index: usize) -> Option<(usize, Arc<dyn Display>, String, WallpaperHandle)> {
        if self.wallpapers.is_empty() {
            return None;
        }
        let index = index % self.wallpapers.len();

        let display = self.display.clone()?;
        let theme = display.current_theme()?;

        let name = &self.wallpapers[index];
        let Some(image) = self.resolver.load(name) else {
            log::error!("Failed to load image: {name}");
            return None;
        };

        Some((index, display, theme, image))
    }

    fn commit(&mut self, index: usize, display: &dyn Display) {
        self.current_index = index;
        let name = &self.wallpapers[index];
        display.set_chat_message("system", &format!("Wallpaper: {name}"));
        if let Some(cb) = &self.on_changed {
            cb(index, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::{FakeDisplay, Journal};
    use crate::image::tests::partition;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn rotation(display: Arc<FakeDisplay>) -> WallpaperRotation {
        let assets = partition(&[
            ("a.cbin", &b"aaaa"[..]),
            ("b.png", &b"bbbb"[..]),
            ("c.png", &b"cccc"[..]),
        ]);
        let resolver = ImageResolver::new(assets, "/nonexistent/ambient-clock-storage");
        WallpaperRotation::new(resolver, Some(display as Arc<dyn Display>))
    }

    fn fake() -> Arc<FakeDisplay> {
        Arc::new(FakeDisplay::new(Journal::new()))
    }

    #[test]
    fn test_defaults() {
        let r = rotation(fake());
        assert!(r.auto_rotate_enabled());
        assert_eq!(r.interval_secs(), DEFAULT_INTERVAL_SECS);
        assert_eq!(r.current_index(), 0);
    }

    #[tokio::test]
    async fn test_empty_list_disables_everything() {
        let display = fake();
        let mut r = rotation(display.clone());

        assert!(!r.set_wallpapers(Vec::new()));
        assert!(!r.apply(0));
        r.enable_auto_rotate(true, 1);
        assert!(!r.on_tick().await);
        assert!(!r.apply_with_effect(0, TransitionEffect::FadeBlack).await);
        assert!(display.background("light").is_none());
        assert!(display.last_chat().is_none());
    }

    #[test]
    fn test_set_wallpapers_applies_current() {
        let display = fake();
        let mut r = rotation(display.clone());

        assert!(r.set_wallpapers(names(&["a.cbin", "b.png"])));
        assert_eq!(r.current_index(), 0);
        assert_eq!(display.background("light").as_deref(), Some("a.cbin"));
        assert_eq!(display.background("dark").as_deref(), Some("a.cbin"));
        assert_eq!(display.last_chat().as_deref(), Some("system: Wallpaper: a.cbin"));
    }

    #[test]
    fn test_set_wallpapers_wraps_index() {
        let display = fake();
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "b.png", "c.png"]));
        assert!(r.apply(2));

        assert!(r.set_wallpapers(names(&["a.cbin", "b.png"])));
        assert_eq!(r.current_index(), 0);
        assert_eq!(display.background("light").as_deref(), Some("a.cbin"));
    }

    #[test]
    fn test_apply_wraps_out_of_range_index() {
        let display = fake();
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "b.png", "c.png"]));

        assert!(r.apply(5));
        assert_eq!(r.current_index(), 2);
        assert_eq!(display.background("dark").as_deref(), Some("c.png"));

        assert!(r.apply(3));
        assert_eq!(r.current_index(), 0);
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let display = fake();
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "missing.png"]));

        assert!(!r.apply(1));
        assert_eq!(r.current_index(), 0);
        assert_eq!(display.background("light").as_deref(), Some("a.cbin"));
    }

    #[test]
    fn test_no_display_or_theme_fails() {
        let assets = partition(&[("a.cbin", &b"aaaa"[..])]);
        let mut r = WallpaperRotation::new(ImageResolver::new(assets, "/nonexistent"), None);
        assert!(!r.set_wallpapers(names(&["a.cbin"])));

        let mut themeless = FakeDisplay::new(Journal::new());
        themeless.theme = None;
        let mut r = rotation(Arc::new(themeless));
        assert!(!r.set_wallpapers(names(&["a.cbin"])));
    }

    #[test]
    fn test_changed_callback() {
        let mut r = rotation(fake());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        r.set_on_changed(move |index, name| {
            assert_eq!((index, name), (1, "b.png"));
            calls_cb.fetch_add(1, Ordering::SeqCst);
        });

        r.wallpapers = names(&["a.cbin", "b.png"]);
        assert!(r.apply(1));
        assert!(r.apply(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_after_interval_ticks() {
        let display = fake();
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "b.png", "c.png"]));
        r.enable_auto_rotate(true, 3);

        assert!(!r.on_tick().await);
        assert!(!r.on_tick().await);
        assert_eq!(r.current_index(), 0);

        assert!(r.on_tick().await);
        assert_eq!(r.current_index(), 1);
        assert_eq!(display.background("light").as_deref(), Some("b.png"));

        for _ in 0..3 {
            r.on_tick().await;
        }
        assert_eq!(r.current_index(), 2);
        for _ in 0..3 {
            r.on_tick().await;
        }
        assert_eq!(r.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_noop_when_disabled_or_single() {
        let mut r = rotation(fake());
        r.set_wallpapers(names(&["a.cbin", "b.png"]));
        r.enable_auto_rotate(false, 1);
        for _ in 0..5 {
            assert!(!r.on_tick().await);
        }
        assert_eq!(r.current_index(), 0);

        r.set_wallpapers(names(&["a.cbin"]));
        r.enable_auto_rotate(true, 1);
        assert!(!r.on_tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_resets_countdown() {
        let mut r = rotation(fake());
        r.set_wallpapers(names(&["a.cbin", "b.png"]));
        r.enable_auto_rotate(true, 3);
        r.on_tick().await;
        r.on_tick().await;

        r.enable_auto_rotate(true, 0);
        assert_eq!(r.interval_secs(), 3);
        assert!(!r.on_tick().await);
        assert!(!r.on_tick().await);
        assert!(r.on_tick().await);
        assert_eq!(r.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_uses_fade_when_compositor_present() {
        let journal = Journal::new();
        let display = Arc::new(FakeDisplay::with_surface(journal.clone()));
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "b.png"]));
        r.enable_auto_rotate(true, 1);

        assert!(r.on_tick().await);
        assert_eq!(r.current_index(), 1);

        let events = journal.names();
        assert!(events.contains(&"create 0".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("delete"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_effect_is_normalised() {
        let display = fake();
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "b.png"]));

        assert!(r.apply_with_effect(1, TransitionEffect::Unsupported).await);
        assert_eq!(r.current_index(), 1);
        assert_eq!(display.background("dark").as_deref(), Some("b.png"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_with_effect_keeps_index() {
        let journal = Journal::new();
        let display = Arc::new(FakeDisplay::with_surface(journal.clone()));
        let mut r = rotation(display.clone());
        r.set_wallpapers(names(&["a.cbin", "missing.png"]));

        assert!(!r.apply_with_effect(1, TransitionEffect::FadeBlack).await);
        assert_eq!(r.current_index(), 0);
        assert!(!journal.names().contains(&"create 0".to_string()));
    }
}
