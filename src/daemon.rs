//! # Daemon Module
//!
//! Builds the controllers, starts their timers and registers the D-Bus service.
//!
//! ## Task layout
//! - `alarm_check` (60 s): `AlarmScheduler::check_alarms`
//! - `alarm_ring` (10 s, restartable): `AlarmScheduler::ring_tick`
//! - `wallpaper_tick` (1 s): `WallpaperRotation::on_tick`, which may suspend
//!   for the length of a fade; it runs on its own task so alarms are unaffected
//! - event forwarder: turns controller callbacks into D-Bus signals

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use zbus::SignalContext;

use crate::alarm::{AlarmScheduler, AlertSurface, CHECK_PERIOD};
use crate::assets::AssetPartition;
use crate::config::Config;
use crate::display::Display;
use crate::error::Result;
use crate::host::{HeadlessDisplay, HostNotifier, HostPlayer};
use crate::image::ImageResolver;
use crate::ring::{AudioService, RingCycle, RingTick, SoundBank};
use crate::service::{DeviceService, DeviceState, OBJECT_PATH, SERVICE_NAME};
use crate::timer::{RestartableTimer, TimerTask};
use crate::wallpaper::WallpaperRotation;

/// Cadence of the wallpaper rotation tick
const WALLPAPER_TICK: Duration = Duration::from_secs(1);

/// Controller notifications forwarded as D-Bus signals
#[derive(Debug, Clone)]
enum DeviceEvent {
    AlarmTriggered { hour: u32, minute: u32, ringtone: String },
    WallpaperChanged { index: usize, name: String },
}

/// Creates the controllers from `config`.
fn build_state(
    config: &Config,
    alerts: Box<dyn AlertSurface>,
    events: mpsc::UnboundedSender<DeviceEvent>,
) -> (DeviceState, RestartableTimer) {
    let ring_timer = RestartableTimer::new();
    let mut scheduler = AlarmScheduler::new(RingCycle::new(Box::new(ring_timer.clone())), alerts);
    let alarm_events = events.clone();
    scheduler.set_on_triggered(move |alarm| {
        let _ = alarm_events.send(DeviceEvent::AlarmTriggered {
            hour: alarm.hour,
            minute: alarm.minute,
            ringtone: alarm.ringtone.clone(),
        });
    });

    let assets = Arc::new(AssetPartition::open(Path::new(&config.asset_bundle)));
    let resolver = ImageResolver::new(assets, &config.storage_dir);
    let display: Arc<dyn Display> = Arc::new(HeadlessDisplay::new());
    let mut rotation = WallpaperRotation::new(resolver, Some(display));
    rotation.set_on_changed(move |index, name| {
        let _ = events.send(DeviceEvent::WallpaperChanged {
            index,
            name: name.to_string(),
        });
    });

    let interval = i32::try_from(config.rotate_interval_secs).unwrap_or(i32::MAX);
    rotation.enable_auto_rotate(config.auto_rotate, interval);
    if !config.wallpapers.is_empty() && !rotation.set_wallpapers(config.wallpapers.clone()) {
        log::warn!("Initial wallpaper could not be applied");
    }

    let state = DeviceState {
        alarms: Arc::new(Mutex::new(scheduler)),
        wallpapers: Arc::new(Mutex::new(rotation)),
    };
    (state, ring_timer)
}

/// Starts the three controller timers. Any failure here is fatal.
fn start_timers(
    state: &DeviceState,
    ring_timer: &RestartableTimer,
    sounds: Arc<SoundBank>,
    audio: Arc<dyn AudioService>,
) -> Result<Vec<TimerTask>> {
    let alarms = state.alarms.clone();
    let check = TimerTask::periodic("alarm_check", CHECK_PERIOD, move || {
        let alarms = alarms.clone();
        async move {
            alarms.lock().await.check_alarms();
        }
    })?;

    let alarms = state.alarms.clone();
    let ring = ring_timer.spawn("alarm_ring", move || {
        let alarms = alarms.clone();
        let sounds = sounds.clone();
        let audio = audio.clone();
        async move {
            let tick = alarms.lock().await.ring_tick(&sounds, audio.as_ref());
            if tick == RingTick::Exhausted {
                log::info!("Alarm rang out");
            }
        }
    })?;

    let wallpapers = state.wallpapers.clone();
    let rotate = TimerTask::periodic("wallpaper_tick", WALLPAPER_TICK, move || {
        let wallpapers = wallpapers.clone();
        async move {
            wallpapers.lock().await.on_tick().await;
        }
    })?;

    Ok(vec![check, ring, rotate])
}

/// Registers the D-Bus service on the session bus.
async fn register_service(state: DeviceState) -> Result<zbus::Connection> {
    let conn = zbus::connection::Builder::session()?
        .name(SERVICE_NAME)?
        .serve_at(OBJECT_PATH, DeviceService::new(state))?
        .build()
        .await?;
    log::info!("D-Bus service running at {OBJECT_PATH} on {SERVICE_NAME}");
    Ok(conn)
}

async fn emit(conn: &zbus::Connection, event: &DeviceEvent) -> zbus::Result<()> {
    let ctx = SignalContext::new(conn, OBJECT_PATH)?;
    match event {
        DeviceEvent::AlarmTriggered {
            hour,
            minute,
            ringtone,
        } => DeviceService::alarm_triggered(&ctx, *hour as i32, *minute as i32, ringtone).await,
        DeviceEvent::WallpaperChanged { index, name } => {
            DeviceService::wallpaper_changed(&ctx, *index as u32, name).await
        }
    }
}

/// Runs the daemon until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let sounds = Arc::new(SoundBank::load(Path::new(&config.sounds_dir)));
    let audio: Arc<dyn AudioService> = Arc::new(HostPlayer::new(config.player_command.clone()));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (state, ring_timer) = build_state(&config, Box::new(HostNotifier), event_tx);
    {
        let rotation = state.wallpapers.lock().await;
        log::info!(
            "{} wallpaper(s), auto-rotate {} every {}s",
            rotation.wallpapers().len(),
            if rotation.auto_rotate_enabled() { "on" } else { "off" },
            rotation.interval_secs()
        );
    }

    let _timers = start_timers(&state, &ring_timer, sounds, audio)?;
    // The device keeps working without remote control
    let conn = match register_service(state).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            log::error!("Failed to register D-Bus service: {e}");
            None
        }
    };

    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log::debug!("Device event: {event:?}");
            if let Some(conn) = &conn {
                if let Err(e) = emit(conn, &event).await {
                    log::warn!("Failed to emit signal: {e}");
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    forwarder.abort();
    Ok(())
}
