use std::fs::File;
use std::io::{IsTerminal, LineWriter, Stdout};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use adbscope_adb::{AdbClient, AdbProcessSource, DeviceInfo};
use adbscope_logs::{OutputSink, ProcessRegistry, Session, line_stream};

mod config;

use config::{Args, InputSource, Settings};

type ConsoleSession = Session<AdbProcessSource, Stdout, LineWriter<File>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Diagnostics go to stderr so they never mix with log output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args)?;

    let adb = AdbClient::new();
    let mut session = build_session(&settings, &adb)?;

    match &settings.input {
        InputSource::Adb => {
            adb.ensure_available().await?;
            let devices = adb.devices().await?;
            let device = AdbClient::select_device(&devices, settings.device.as_deref())?;
            eprintln!("{}", device_banner(&device));

            session.refresh().await;
            let logcat = adb.logcat(&device.serial)?;
            tracing::debug!(pid = ?logcat.id(), "logcat started");
            session.run(logcat).await?;
            tracing::warn!("device disconnected");
        }
        InputSource::Stdin => {
            session.refresh().await;
            session.run(line_stream(tokio::io::stdin())).await?;
        }
        InputSource::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            session.refresh().await;
            session.run(line_stream(file)).await?;
        }
    }

    Ok(())
}

fn build_session(settings: &Settings, adb: &AdbClient) -> Result<ConsoleSession> {
    let output = match &settings.output_file {
        Some(path) => Some(
            File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path.display()))?,
        ),
        None => None,
    };
    let sink = OutputSink::stdout(settings.stdout, output);

    let source = adb.process_source(settings.device.clone());
    let registry = ProcessRegistry::new(&settings.filter, source)?;

    let session = Session::new(&settings.filter, terminal_width(), registry, sink)?;
    Ok(session)
}

/// Announcement of the device being read, shown on stderr
fn device_banner(device: &DeviceInfo) -> String {
    format!("Selected device: {}", device.serial)
}

/// Console width, when stdout is an interactive terminal
fn terminal_width() -> Option<u16> {
    if !std::io::stdout().is_terminal() {
        return None;
    }
    crossterm::terminal::size().ok().map(|(cols, _)| cols)
}
