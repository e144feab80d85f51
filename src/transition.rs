//! # Fade Transition Module
//!
//! The one supported wallpaper transition: ramp a black overlay to opaque, swap
//! the background while the screen is covered, ramp back to transparent, then
//! drop the overlay.
//!
//! The protocol is an explicit phase machine ([`FadeTransition`]) so the
//! ordering can be inspected without a display. [`fade_black_then_apply`] walks
//! the phases with `tokio::time::sleep` between them; tests run it on a paused
//! clock.
//!
//! The rendering lock is taken around every surface call and released before
//! each wait. The background swap itself happens outside the lock: the overlay
//! is fully opaque at that moment.

use std::time::Duration;

use crate::display::{lock_surface, swap_background, Display, SharedSurface, OPA_COVER, OPA_TRANSPARENT};
use crate::image::WallpaperHandle;

/// Fade-to-black ramp
pub const FADE_OUT: Duration = Duration::from_millis(220);
/// Extra wait after the fade-out so the last frame reaches the panel
pub const FADE_OUT_SETTLE: Duration = Duration::from_millis(30);
/// Fade-from-black ramp
pub const FADE_IN: Duration = Duration::from_millis(240);
pub const FADE_IN_SETTLE: Duration = Duration::from_millis(40);

/// Requested transition effect. Every value is normalised to [`TransitionEffect::FadeBlack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionEffect {
    #[default]
    FadeBlack,
    /// Effects the device does not render; accepted and replaced by `FadeBlack`
    Unsupported,
}

impl TransitionEffect {
    pub fn parse(name: &str) -> Self {
        match name {
            "" | "fade_black" | "fade-black" | "FadeBlack" => TransitionEffect::FadeBlack,
            _ => TransitionEffect::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    FadingOut,
    Swapping,
    FadingIn,
    Done,
}

/// Action to perform for one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStep {
    /// Create a transparent overlay, ramp it to opaque, then wait `ramp + settle`
    Cover { ramp: Duration, settle: Duration },
    /// Swap the theme backgrounds
    Swap,
    /// Ramp the overlay back to transparent, wait `ramp + settle`, then delete it
    Reveal { ramp: Duration, settle: Duration },
}

#[derive(Debug)]
pub struct FadeTransition {
    phase: FadePhase,
}

impl FadeTransition {
    pub fn new() -> Self {
        Self {
            phase: FadePhase::FadingOut,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    /// Returns the action for the current phase and moves to the next one.
    /// `None` once the transition is done.
    pub fn step(&mut self) -> Option<FadeStep> {
        let (step, next) = match self.phase {
            FadePhase::FadingOut => (
                FadeStep::Cover {
                    ramp: FADE_OUT,
                    settle: FADE_OUT_SETTLE,
                },
                FadePhase::Swapping,
            ),
            FadePhase::Swapping => (FadeStep::Swap, FadePhase::FadingIn),
            FadePhase::FadingIn => (
                FadeStep::Reveal {
                    ramp: FADE_IN,
                    settle: FADE_IN_SETTLE,
                },
                FadePhase::Done,
            ),
            FadePhase::Done => return None,
        };
        self.phase = next;
        Some(step)
    }

    /// Total wall time a full transition blocks its caller
    pub fn total_duration() -> Duration {
        FADE_OUT + FADE_OUT_SETTLE + FADE_IN + FADE_IN_SETTLE
    }
}

impl Default for FadeTransition {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a full fade-to-black transition, swapping in `image` on the `light` and
/// `dark` themes and re-applying `theme` while the screen is covered.
///
/// Suspends the caller for [`FadeTransition::total_duration`]. Not cancellable.
pub async fn fade_black_then_apply(
    surface: &SharedSurface,
    display: &dyn Display,
    theme: &str,
    image: &WallpaperHandle,
) {
    log::debug!(
        "Fading to {} ({}ms)",
        image.name,
        FadeTransition::total_duration().as_millis()
    );
    let mut fade = FadeTransition::new();
    let mut overlay = None;

    while let Some(step) = fade.step() {
        match step {
            FadeStep::Cover { ramp, settle } => {
                {
                    let mut s = lock_surface(surface);
                    let id = s.create_overlay(OPA_TRANSPARENT);
                    s.animate_opacity(id, OPA_TRANSPARENT, OPA_COVER, ramp);
                    overlay = Some(id);
                }
                tokio::time::sleep(ramp + settle).await;
            }
            FadeStep::Swap => {
                swap_background(display, theme, image);
            }
            FadeStep::Reveal { ramp, settle } => {
                if let Some(id) = overlay {
                    lock_surface(surface).animate_opacity(id, OPA_COVER, OPA_TRANSPARENT, ramp);
                }
                tokio::time::sleep(ramp + settle).await;
                if let Some(id) = overlay.take() {
                    lock_surface(surface).delete_overlay(id);
                }
            }
        }
    }

    log::debug!("Fade transition to {} complete", image.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::{FakeDisplay, Journal};
    use crate::image::{ImageBytes, ImageKind, WallpaperImage};
    use std::sync::Arc;

    fn image(name: &str) -> WallpaperHandle {
        Arc::new(WallpaperImage {
            name: name.to_string(),
            kind: ImageKind::Raw,
            bytes: ImageBytes::Owned(vec![1, 2, 3]),
        })
    }

    #[test]
    fn test_phase_order() {
        let mut fade = FadeTransition::new();
        assert_eq!(fade.phase(), FadePhase::FadingOut);
        assert!(matches!(fade.step(), Some(FadeStep::Cover { .. })));
        assert_eq!(fade.phase(), FadePhase::Swapping);
        assert_eq!(fade.step(), Some(FadeStep::Swap));
        assert_eq!(fade.phase(), FadePhase::FadingIn);
        assert!(matches!(fade.step(), Some(FadeStep::Reveal { .. })));
        assert_eq!(fade.phase(), FadePhase::Done);
        assert_eq!(fade.step(), None);
        assert_eq!(fade.step(), None);
    }

    #[test]
    fn test_effect_parse() {
        assert_eq!(TransitionEffect::parse("fade_black"), TransitionEffect::FadeBlack);
        assert_eq!(TransitionEffect::parse(""), TransitionEffect::FadeBlack);
        assert_eq!(TransitionEffect::parse("slide_left"), TransitionEffect::Unsupported);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_sequence_and_timing() {
        let journal = Journal::new();
        let display = FakeDisplay::with_surface(journal.clone());
        let surface = display.compositor().unwrap();

        fade_black_then_apply(&surface, &display, "light", &image("sky.png")).await;

        let events = journal.events();
        let names: Vec<&str> = events.iter().map(|(_, e)| e.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "create 0",
                "animate 0->255 220ms",
                "background light sky.png",
                "background dark sky.png",
                "theme light",
                "animate 255->0 240ms",
                "delete",
            ]
        );

        let at = |i: usize| events[i].0;
        assert_eq!(at(0), Duration::ZERO);
        assert_eq!(at(2), Duration::from_millis(250));
        assert_eq!(at(5), Duration::from_millis(250));
        assert_eq!(at(6), Duration::from_millis(530));
        assert_eq!(FadeTransition::total_duration(), Duration::from_millis(530));
    }
}
