mod config;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use asio_host::{parse_clsid, AsioSharedHost, BufferSwitchListener, ChannelDescriptor, Direction};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{SessionConfig, SizeMode};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => execute_probe(args),
        Commands::CheckFormat(args) => execute_check_format(args),
        Commands::Run(args) => execute_run(args),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Inspect and drive ASIO drivers through the shared host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach a driver and list its channels.
    Probe(DriverArgs),
    /// Ask whether a driver accepts a wave format on a channel range.
    CheckFormat(CheckFormatArgs),
    /// Run a session for a while and report how many buffer switches arrived.
    Run(RunArgs),
}

#[derive(Args)]
struct DriverArgs {
    /// Path to the driver module.
    #[arg(long)]
    driver: PathBuf,
    /// Class id the driver is registered under, e.g. {8E3D2B65-...}.
    #[arg(long)]
    clsid: String,
}

#[derive(Args)]
struct CheckFormatArgs {
    #[command(flatten)]
    target: DriverArgs,
    #[arg(long, value_enum, default_value_t = Side::Output)]
    direction: Side,
    #[arg(long, default_value_t = 0)]
    first: usize,
    #[arg(long, default_value_t = 2)]
    channels: u16,
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,
    #[arg(long, default_value_t = 32)]
    container_bits: u16,
    /// Defaults to the container size.
    #[arg(long)]
    valid_bits: Option<u16>,
}

#[derive(Args)]
struct RunArgs {
    /// Session description (JSON). Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    driver: Option<PathBuf>,
    #[arg(long)]
    clsid: Option<String>,
    #[arg(long)]
    sample_rate: Option<u32>,
    #[arg(long)]
    channels: Option<u16>,
    #[arg(long)]
    container_bits: Option<u16>,
    #[arg(long)]
    valid_bits: Option<u16>,
    /// Suggested buffer length in milliseconds.
    #[arg(long)]
    buffer_ms: Option<f64>,
    #[arg(long, value_enum)]
    mode: Option<SizeMode>,
    /// Accept a buffer shorter than the suggested length.
    #[arg(long)]
    allow_smaller: bool,
    /// How long to keep the session running.
    #[arg(long)]
    seconds: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    Input,
    Output,
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Input => Direction::Input,
            Side::Output => Direction::Output,
        }
    }
}

impl RunArgs {
    fn into_config(self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(driver) = self.driver {
            config.driver = Some(driver);
        }
        if let Some(clsid) = self.clsid {
            config.clsid = Some(clsid);
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(channels) = self.channels {
            config.channels = channels;
        }
        if let Some(bits) = self.container_bits {
            config.container_bits = bits;
            config.valid_bits = bits;
        }
        if let Some(bits) = self.valid_bits {
            config.valid_bits = bits;
        }
        if let Some(ms) = self.buffer_ms {
            config.buffer_ms = ms;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        config.allow_smaller |= self.allow_smaller;
        if let Some(seconds) = self.seconds {
            config.seconds = seconds;
        }
        Ok(config)
    }
}

fn open_host(driver: &std::path::Path, clsid: &str) -> Result<AsioSharedHost> {
    let clsid = parse_clsid(clsid).with_context(|| format!("'{clsid}' is not a class id"))?;
    // SAFETY: the user vouches for the module being an ASIO driver.
    let host = unsafe { AsioSharedHost::open(driver, &clsid) };
    match host.attach_error() {
        Some(err) => Err(anyhow!("failed to attach {}: {err}", driver.display())),
        None => Ok(host),
    }
}

fn print_channels(label: &str, channels: &[ChannelDescriptor]) {
    println!("  {label}: {}", channels.len());
    for channel in channels {
        println!(
            "    [{:>2}] {:<24} {:?}{}",
            channel.index,
            channel.name,
            channel.sample_type,
            if channel.is_active { " (active)" } else { "" }
        );
    }
}

fn execute_probe(args: DriverArgs) -> Result<()> {
    let host = open_host(&args.driver, &args.clsid)?;
    println!("Driver '{}'", host.driver_name());
    print_channels("Inputs", host.input_channels());
    print_channels("Outputs", host.output_channels());
    Ok(())
}

fn execute_check_format(args: CheckFormatArgs) -> Result<()> {
    let host = open_host(&args.target.driver, &args.target.clsid)?;
    let format = SessionConfig {
        sample_rate: args.sample_rate,
        channels: args.channels,
        container_bits: args.container_bits,
        valid_bits: args.valid_bits.unwrap_or(args.container_bits),
        ..SessionConfig::default()
    }
    .wave_format();

    let direction = Direction::from(args.direction);
    match host.is_wave_format_supported(
        &format,
        direction,
        args.first,
        usize::from(args.channels),
    ) {
        Ok(sample_type) => {
            println!("Supported: {direction:?} channels carry {sample_type:?}");
            Ok(())
        }
        Err(err) => Err(anyhow!("not supported on {direction:?}: {err}")),
    }
}

/// Counts switches from the driver thread.
#[derive(Default)]
struct SwitchCounter {
    halves: [AtomicU64; 2],
}

impl BufferSwitchListener for SwitchCounter {
    fn on_buffer_switch(&self, half: usize) {
        if let Some(counter) = self.halves.get(half) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn execute_run(args: RunArgs) -> Result<()> {
    let config = args.into_config()?;
    let (driver, clsid) = config.driver()?;
    let mut host = open_host(driver, clsid)?;

    let format = config.wave_format();
    host.start(
        &format,
        config.buffer_duration()?,
        config.mode.into(),
        config.allow_smaller,
    )
    .context("failed to start the session")?;

    let counter = Arc::new(SwitchCounter::default());
    host.add_buffer_switch_listener(&counter);
    let latency = host.latency_time()?;
    info!(frames = host.buffer_num_frames(), ?latency, "session running");

    thread::sleep(config.run_time()?);

    let frames = host.buffer_num_frames();
    host.remove_buffer_switch_listener(&counter);
    host.stop().context("failed to stop the session")?;

    let [first, second] = &counter.halves;
    println!(
        "Driver '{}': {} frames per buffer, {} switches ({} / {})",
        host.driver_name(),
        frames,
        host.buffer_switch_count(),
        first.load(Ordering::Relaxed),
        second.load(Ordering::Relaxed)
    );
    println!(
        "  Latency: input {:.2} ms, output {:.2} ms",
        latency.input.as_secs_f64() * 1000.0,
        latency.output.as_secs_f64() * 1000.0
    );
    Ok(())
}
