//! Insulin pump simulator — console entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  stdin reader ─▶ console::parse_line      JsonConfigFile      │
//! │  FaultPanel (FaultSignals)                (ConfigPort)        │
//! │  LogEventSink / JsonLinesSink (EventSink)                     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                 Device (pure logic)                    │  │
//! │  │  FSM · Safety · Control · Pump · Calculator            │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Main loop: one tick per 1000/rate ms, input between ticks   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::io::{self, BufRead, Stdout};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use insulinpump::adapters::config_file::JsonConfigFile;
use insulinpump::adapters::console::{self, ConsoleInput, HELP, ParseError};
use insulinpump::adapters::fault_panel::FaultPanel;
use insulinpump::adapters::json_sink::JsonLinesSink;
use insulinpump::adapters::log_sink::LogEventSink;
use insulinpump::app::commands::DeviceCommand;
use insulinpump::app::events::DeviceEvent;
use insulinpump::app::ports::{ConfigPort, EventSink};
use insulinpump::app::service::Device;
use insulinpump::config::SystemConfig;
use insulinpump::invariants;
use insulinpump::scheduler::TickDeadline;

/// Closed-loop insulin pump simulator.
///
/// Type commands on stdin while the simulation runs; `help` lists them.
#[derive(Parser)]
#[command(name = "insulinpump")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file (defaults are used if it does not exist)
    #[arg(short, long, env = "INSULINPUMP_CONFIG")]
    config: Option<PathBuf>,

    /// Simulation rate in ticks per second
    #[arg(short, long)]
    rate: Option<u32>,

    /// Seed for the CGM noise generator
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many closed-loop ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Emit events as JSON lines on stdout
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Power on and unlock immediately
    #[arg(long, default_value_t = false)]
    auto_start: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

// ── Event fan-out ─────────────────────────────────────────────
//
// Human-readable logs always go to stderr through the `log` facade;
// `--json` additionally streams machine-readable records to stdout.

struct Sinks {
    log: LogEventSink,
    json: Option<JsonLinesSink<Stdout>>,
}

impl EventSink for Sinks {
    fn emit(&mut self, event: &DeviceEvent) {
        self.log.emit(event);
        if let Some(json) = self.json.as_mut() {
            json.emit(event);
        }
    }
}

fn load_config(cli: &Cli) -> Result<SystemConfig> {
    let mut config = match &cli.config {
        Some(path) => JsonConfigFile::new(path)
            .load()
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SystemConfig::default(),
    };
    if let Some(rate) = cli.rate {
        config.sim_rate = rate;
    }
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }
    Ok(config)
}

/// Forward stdin lines to the main loop until EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Apply one console input.  Returns `false` when the user quits.
fn dispatch(
    input: ConsoleInput,
    device: &mut Device,
    panel: &mut FaultPanel,
    sinks: &mut Sinks,
) -> Result<bool> {
    match input {
        ConsoleInput::Command(cmd) => match device.handle_command(cmd, &*panel, sinks) {
            Ok(outcome) => info!("OK | {:?}", outcome),
            Err(e) => warn!("REJECTED | {e}"),
        },
        ConsoleInput::ToggleCgmFault => {
            panel.toggle_cgm();
        }
        ConsoleInput::TogglePumpFault => {
            panel.toggle_pump();
        }
        ConsoleInput::Status => {
            let snapshot = device.snapshot();
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).context("rendering status")?
            );
        }
        ConsoleInput::Help => println!("{HELP}"),
        ConsoleInput::Quit => return Ok(false),
    }
    Ok(true)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = load_config(&cli)?;
    let mut device = Device::new(config).context("invalid simulator configuration")?;
    let mut panel = FaultPanel::new();
    let mut sinks = Sinks {
        log: LogEventSink::new(),
        json: cli.json.then(|| JsonLinesSink::new(io::stdout())),
    };

    info!(
        "insulinpump v{} | tick={} min | rate={}/s",
        env!("CARGO_PKG_VERSION"),
        device.clock().tick_minutes(),
        device.clock().rate()
    );

    if cli.auto_start {
        device
            .handle_command(DeviceCommand::PowerOn, &panel, &mut sinks)
            .context("auto-start power on")?;
        device
            .handle_command(DeviceCommand::Unlock, &panel, &mut sinks)
            .context("auto-start unlock")?;
    } else {
        info!("Device is off. Type 'on', then 'unlock' ('help' for commands).");
    }

    let rx = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut ticks_run: u64 = 0;

    let mut deadline = TickDeadline::after(Instant::now(), device.clock().interval());

    loop {
        let now = Instant::now();
        let wait = deadline.remaining(now);
        let next = if deadline.is_due(now) {
            Err(RecvTimeoutError::Timeout)
        } else if stdin_open {
            rx.recv_timeout(wait)
        } else {
            thread::sleep(wait);
            Err(RecvTimeoutError::Timeout)
        };

        match next {
            Ok(line) => match console::parse_line(&line) {
                Ok(input) => {
                    if !dispatch(input, &mut device, &mut panel, &mut sinks)? {
                        break;
                    }
                }
                Err(ParseError::Empty) => {}
                Err(e) => warn!("{e}"),
            },
            Err(RecvTimeoutError::Timeout) => {
                deadline.rearm(Instant::now(), device.clock().interval());
                if let Some(snapshot) = device.tick(&panel, &mut sinks) {
                    if cfg!(debug_assertions) {
                        if let Err(name) = invariants::check(&snapshot) {
                            error!("INVARIANT | {name} violated at {}", snapshot.time);
                        }
                    }
                    ticks_run += 1;
                    if cli.ticks.is_some_and(|max| ticks_run >= max) {
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Without a tick limit nothing could ever stop the loop.
                if cli.ticks.is_none() {
                    break;
                }
                stdin_open = false;
            }
        }
    }

    let m = device.metrics();
    info!(
        "Simulation ended at {} | ticks={} | delivered={:.2}U | shortfall={:.2}U | blocked={} | alerts={}",
        device.clock().now(),
        m.ticks,
        m.total_delivered(),
        m.shortfall(),
        m.blocked_requests,
        m.alerts_raised,
    );
    Ok(())
}
