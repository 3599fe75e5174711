use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, UNIX_EPOCH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracklink::communication::{ChannelSink, EventStream};
use tracklink::device::DeviceEvent;
use tracklink::library::nodes::{
    DeviceEventSource, LocatorNode, ProstateNavNode, SimulatedRobot, SimulatedScanner,
    SimulatedTracker,
};
use tracklink::params::{TrackParams, DEFAULT_PARAMS_PATH};
use tracklink::scheduling::{PollingDriver, Scheduler};

#[derive(Parser)]
#[command(name = "tracklink-sim")]
#[command(about = "Run a tracking session against simulated hardware")]
#[command(version)]
struct Cli {
    /// Parameter file (defaults to .tracklink/params.toml when present)
    #[arg(short = 'p', long = "params")]
    params: Option<PathBuf>,

    /// Session length in milliseconds
    #[arg(short = 'd', long = "duration-ms", default_value_t = 3000)]
    duration_ms: u64,

    /// Override the polling speed from the parameter file
    #[arg(short = 's', long = "speed-ms")]
    speed_ms: Option<u64>,

    /// Tracker position jitter, in meters
    #[arg(long = "noise", default_value_t = 0.0)]
    noise: f32,

    /// Write the effective parameters to this file and exit
    #[arg(long = "write-params")]
    write_params: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "tracklink=info,tracklink_core=info,tracklink_library=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let params_path = cli
        .params
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PARAMS_PATH));
    let mut params = TrackParams::load(&params_path)
        .with_context(|| format!("failed to load {}", params_path.display()))?;
    if let Some(speed) = cli.speed_ms {
        params.polling.speed_ms = speed;
    }

    if let Some(out) = &cli.write_params {
        params
            .save(out)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("{} {}", "Wrote parameters to".green(), out.display());
        return Ok(());
    }

    run_session(&cli, &params, &params_path)
}

fn run_session(cli: &Cli, params: &TrackParams, params_path: &Path) -> Result<()> {
    tracing::info!(
        "session '{}' from {} ({} ms polling, batch {})",
        params.stream.name,
        params_path.display(),
        params.polling.speed_ms,
        params.polling.batch_size
    );

    let stream = EventStream::shared(params.stream.clone());
    let (sink, commands) = ChannelSink::unbounded();
    stream.set_sink(Box::new(sink));

    let locator = LocatorNode::new(&stream)?;
    let nav = ProstateNavNode::new(stream.clone(), params.needle.clone())?;

    let tracker =
        SimulatedTracker::with_seed(params.polling.tool_index + 1, 1).with_noise(cli.noise);
    let tracker_driver = PollingDriver::new(
        "tracker",
        DeviceEventSource::new(tracker, params.polling.tool_index),
        stream.clone(),
        params.polling.clone(),
    );
    let health = tracker_driver.health_events();
    let robot_driver = PollingDriver::new(
        "robot",
        SimulatedRobot::new().with_target_depth(40.0, 2.0),
        stream.clone(),
        params.polling.clone(),
    );
    let scanner_driver = PollingDriver::new(
        "scanner",
        SimulatedScanner::new(params.stream.image_geometry),
        stream.clone(),
        params.polling.clone(),
    );

    let mut scheduler = Scheduler::new()
        .with_name("tracklink-sim")
        .with_tick_period(params.polling.speed());
    scheduler
        .add(Box::new(tracker_driver), 0)
        .add(Box::new(robot_driver), 1)
        .add(Box::new(scanner_driver), 2)
        .add(Box::new(locator.clone()), 10)
        .add(Box::new(nav.clone()), 11);

    let running = scheduler.running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("{}", "\nCtrl+C received! Stopping session...".red());
        running.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("failed to set signal handler: {}", e);
    }

    nav.set_robot_command("command", "START")
        .context("failed to command robot")?;
    scheduler.run_for(Duration::from_millis(cli.duration_ms))?;

    print_summary(&stream, &locator, &nav);

    let sent: Vec<_> = commands.try_iter().collect();
    println!("{} {}", "Robot commands sent:".bold(), sent.len());
    for event in health.try_iter() {
        match event {
            DeviceEvent::Error(msg) => println!("  {} {}", "tracker error:".red(), msg),
            other => println!("  tracker {:?}", other),
        }
    }
    Ok(())
}

fn print_summary(stream: &EventStream, locator: &LocatorNode, nav: &ProstateNavNode) {
    println!("{}", "Session summary".bold().cyan());

    let status = nav.robot_status();
    let status = if status.is_empty() { "-".to_string() } else { status };
    println!("  {:<16} {}", "robot status".bold(), status.green());
    println!("  {:<16} {}", "robot message".bold(), nav.robot_message());

    if nav.is_needle_ready() {
        let tip = nav.needle_matrix().translation();
        println!(
            "  {:<16} ({:.2}, {:.2}, {:.2})",
            "needle tip".bold(),
            tip.x,
            tip.y,
            tip.z
        );
    } else {
        println!("  {:<16} {}", "needle tip".bold(), "not ready".yellow());
    }

    match locator.locator_frame() {
        Some(frame) => {
            let p = frame.position();
            println!(
                "  {:<16} ({:.2}, {:.2}, {:.2}) from {} samples",
                "locator".bold(),
                p.x,
                p.y,
                p.z,
                locator.sample_count()
            );
        }
        None => println!("  {:<16} {}", "locator".bold(), "no pose".yellow()),
    }

    match nav.image_timestamp() {
        Some(stamp) => {
            let secs = stamp
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            println!(
                "  {:<16} {} frames, last at {:.3}",
                "scanner".bold(),
                nav.image_count(),
                secs
            );
        }
        None => println!("  {:<16} {}", "scanner".bold(), "no image".yellow()),
    }

    let stats = stream.stats();
    println!(
        "  {:<16} {} delivered, {} unrouted, {} rejected fields, {} pushed",
        "dispatch".bold(),
        stats.delivered,
        stats.unrouted,
        stats.rejected_fields,
        stats.pushed
    );
}
