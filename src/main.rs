//! # Ambient Clock
//!
//! Alarm clock and rotating wallpaper daemon for a small always-on display.
//!
//! ## Features
//! - Minute-resolution alarms, one-shot or daily, with a 10-play ring cycle
//! - Ringtone fallback when a sound file is missing
//! - Wallpaper rotation from a packed asset bundle or plain files
//! - Fade-to-black transition between wallpapers
//! - D-Bus service so the CLI (or anything else) can drive the daemon
//!
//! ## Architecture
//! - `alarm.rs` - Alarm list and wall-clock matching
//! - `ring.rs` - Ring cycle and ringtone resolution
//! - `wallpaper.rs` - Wallpaper list, rotation and apply
//! - `transition.rs` - Fade-to-black phase machine
//! - `image.rs` / `assets.rs` - Image loading from the bundle or the filesystem
//! - `display.rs` - Display and compositor traits
//! - `host.rs` - Host notifier, player and headless display
//! - `timer.rs` - Periodic and restartable timers
//! - `service.rs` / `dbus_client.rs` - D-Bus interface and its client
//! - `daemon.rs` - Wires everything together
//! - `config.rs` - Start-up configuration
//!
//! ## CLI Usage
//! - No arguments: run the daemon
//! - `--add HH:MM [ringtone] [--daily]`, `--list`, `--clear`, `--stop`
//! - `--wallpapers a,b,c`, `--next`, `--auto on|off [secs]`
//! - `--init-config`, `--pack-assets OUT FILE...`
//! - `--help`, `--version`

mod alarm;       // Alarm scheduler
mod assets;      // Packed asset bundle
mod config;      // Start-up configuration
mod daemon;      // Daemon wiring (timers, D-Bus, signals)
mod dbus_client; // D-Bus client used by the CLI commands
mod display;     // Display and compositor traits
mod error;       // Fatal error type
mod host;        // Host implementations of the device traits
mod image;       // Wallpaper image loading
mod ring;        // Ring cycle and sounds
mod service;     // D-Bus service
mod timer;       // Tokio timers
mod transition;  // Fade-to-black transition
mod wallpaper;   // Wallpaper rotation

use std::future::Future;
use std::path::Path;

use dbus_client::DeviceClient;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let result = if args.len() > 1 {
        match args[1].as_str() {
            "--add" | "-a" => block_on(cmd_add(&args[2..])),
            "--list" | "-l" => block_on(cmd_list()),
            "--clear" => block_on(cmd_clear()),
            "--stop" => block_on(cmd_stop()),
            "--wallpapers" | "-w" => block_on(cmd_wallpapers(&args[2..])),
            "--next" | "-n" => block_on(cmd_next()),
            "--auto" => block_on(cmd_auto(&args[2..])),
            "--init-config" => init_config(),
            "--pack-assets" => pack_assets(&args[2..]),
            "--help" | "-h" => {
                print_help(&args[0]);
                Ok(())
            }
            "--version" | "-v" => {
                println!("ambient-clock {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            _ => {
                eprintln!("Unknown argument: {}", args[1]);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
        }
    } else {
        block_on(async {
            daemon::run(config::Config::load())
                .await
                .map_err(|e| format!("Daemon failed: {e}"))
        })
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

/// Prints help message
fn print_help(program: &str) {
    println!("Ambient Clock - alarms and wallpaper rotation\n");
    println!("Usage: {} [OPTIONS]\n", program);
    println!("Options:");
    println!("  (none)                        Run the daemon");
    println!("  --add, -a HH:MM [RING] [--daily]");
    println!("                                Add an alarm (RING: ga, alarm1, iphone)");
    println!("  --list, -l                    List alarms as JSON");
    println!("  --clear                       Remove all alarms");
    println!("  --stop                        Stop a ringing alarm");
    println!("  --wallpapers, -w a,b,c        Set the wallpaper rotation");
    println!("  --next, -n                    Fade to the next wallpaper");
    println!("  --auto on|off [SECS]          Toggle auto-rotate");
    println!("  --init-config                 Write the default configuration file");
    println!("  --pack-assets OUT FILE...     Build an asset bundle");
    println!("  --version, -v                 Show version information");
    println!("  --help, -h                    Show this help message");
    println!();
    println!("Commands other than --init-config and --pack-assets talk to the");
    println!("running daemon over D-Bus.");
}

/// Runs `fut` on a fresh tokio runtime
fn block_on<F>(fut: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create tokio runtime: {e}"))?;
    rt.block_on(fut)
}

async fn connect() -> Result<DeviceClient, String> {
    DeviceClient::connect()
        .await
        .map_err(|e| format!("Failed to connect to daemon: {e}"))
}

/// Parses `HH:MM`. Values are range-checked loosely; the scheduler clamps.
fn parse_time(value: &str) -> Result<(i32, i32), String> {
    let (hour, minute) = value
        .split_once(':')
        .ok_or_else(|| format!("Expected HH:MM, got '{value}'"))?;
    let hour = hour
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Invalid hour '{hour}': {e}"))?;
    let minute = minute
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Invalid minute '{minute}': {e}"))?;
    Ok((hour, minute))
}

/// Parses the `--auto` arguments into (enabled, interval).
/// Without seconds the interval is 0, which keeps the daemon's current one.
fn parse_auto(args: &[String]) -> Result<(bool, i32), String> {
    let enabled = match args.first().map(String::as_str) {
        Some("on") => true,
        Some("off") => false,
        other => return Err(format!("Expected on|off, got {:?}", other.unwrap_or(""))),
    };
    let interval = match args.get(1) {
        Some(secs) => secs
            .parse::<i32>()
            .map_err(|e| format!("Invalid interval '{secs}': {e}"))?,
        None => 0,
    };
    Ok((enabled, interval))
}

async fn cmd_add(args: &[String]) -> Result<(), String> {
    let time = args.first().ok_or("Missing alarm time (HH:MM)")?;
    let (hour, minute) = parse_time(time)?;
    let daily = args.iter().any(|a| a == "--daily");
    let ringtone = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("ga");

    let client = connect().await?;
    client
        .add_alarm(hour, minute, ringtone, daily)
        .await
        .map_err(|e| format!("Failed to add alarm: {e}"))?;
    println!(
        "Alarm set for {:02}:{:02} ({ringtone}{})",
        hour.clamp(0, 23),
        minute.clamp(0, 59),
        if daily { ", daily" } else { "" }
    );
    Ok(())
}

async fn cmd_list() -> Result<(), String> {
    let client = connect().await?;
    let alarms = client
        .list_alarms()
        .await
        .map_err(|e| format!("Failed to list alarms: {e}"))?;
    println!("{alarms}");
    Ok(())
}

async fn cmd_clear() -> Result<(), String> {
    let client = connect().await?;
    client
        .remove_all_alarms()
        .await
        .map_err(|e| format!("Failed to clear alarms: {e}"))?;
    println!("All alarms removed");
    Ok(())
}

async fn cmd_stop() -> Result<(), String> {
    let client = connect().await?;
    let was_ringing = client
        .stop_ringing()
        .await
        .map_err(|e| format!("Failed to stop alarm: {e}"))?;
    println!("{}", if was_ringing { "Alarm stopped" } else { "No alarm ringing" });
    Ok(())
}

async fn cmd_wallpapers(args: &[String]) -> Result<(), String> {
    let list = args.first().ok_or("Missing wallpaper list (a,b,c)")?;
    let names: Vec<&str> = list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();

    let client = connect().await?;
    let applied = client
        .set_wallpapers(&names)
        .await
        .map_err(|e| format!("Failed to set wallpapers: {e}"))?;
    if !applied {
        return Err("Wallpaper list set, but the first wallpaper could not be applied".to_string());
    }
    println!("{} wallpaper(s) set", names.len());
    Ok(())
}

async fn cmd_next() -> Result<(), String> {
    let client = connect().await?;
    let applied = client
        .next_wallpaper()
        .await
        .map_err(|e| format!("Failed to rotate: {e}"))?;
    if !applied {
        return Err("Next wallpaper could not be applied".to_string());
    }
    let (index, name) = client
        .current_wallpaper()
        .await
        .map_err(|e| format!("Failed to query wallpaper: {e}"))?;
    println!("Wallpaper {index}: {name}");
    Ok(())
}

async fn cmd_auto(args: &[String]) -> Result<(), String> {
    let (enabled, interval) = parse_auto(args)?;
    let client = connect().await?;
    client
        .enable_auto_rotate(enabled, interval)
        .await
        .map_err(|e| format!("Failed to set auto-rotate: {e}"))?;
    if enabled && interval > 0 {
        println!("Auto-rotate on ({interval}s)");
    } else if enabled {
        println!("Auto-rotate on");
    } else {
        println!("Auto-rotate off");
    }
    Ok(())
}

fn init_config() -> Result<(), String> {
    let path = config::Config::default().save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Packs image files into an asset bundle, keyed by file name
fn pack_assets(args: &[String]) -> Result<(), String> {
    let (out, files) = args
        .split_first()
        .ok_or("Usage: --pack-assets OUT FILE...")?;
    if files.is_empty() {
        return Err("No input files given".to_string());
    }

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let path = Path::new(file);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| format!("Not a file: {file}"))?;
        let bytes = std::fs::read(path).map_err(|e| format!("Failed to read {file}: {e}"))?;
        entries.push((name, bytes));
    }

    let bundle = assets::AssetPartition::pack(&entries)?;
    std::fs::write(out, &bundle).map_err(|e| format!("Failed to write {out}: {e}"))?;
    println!("Packed {} asset(s) into {out} ({} bytes)", entries.len(), bundle.len());
    Ok(())
}
