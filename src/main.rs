//! # Quick Alarm plugin
//! The host starts this binary and talks to it over stdin and stdout. Logs go to stderr,
//! filtered with `RUST_LOG` (default `info`).
use clap::Parser;
use embassy_executor::Spawner;
use quick_alarm::task::host_bridge::{StdioHost, spawn_stdin_reader};
use quick_alarm::task::orchestrate::{
    Plugin, SHUTDOWN_SIGNAL, alarm_ticker, animation_ticker, install, orchestrator,
};
use quick_alarm::task::sound::ProcessPlayer;
use quick_alarm::Result;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Alarm clock keys for a hardware button deck
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The id the host gave this plugin
    #[arg(long, default_value = "")]
    plugin_uuid: String,
    /// The event name to register with; nothing is sent if omitted
    #[arg(long)]
    register_event: Option<String>,
    /// Directory the sound player runs in, relative sound files resolve against it
    #[arg(long, default_value = ".")]
    plugin_dir: PathBuf,
}

// Entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    info!("Program start");

    if let Err(e) = start(spawner, Args::parse()).await {
        error!("Plugin could not start: {}", e);
        std::process::exit(1);
    }

    // wait for the host to go away
    SHUTDOWN_SIGNAL.wait().await;
    info!("Program end");
    std::process::exit(0);
}

/// Introduce ourselves to the host, set up the plugin and start the tasks
async fn start(spawner: Spawner, args: Args) -> Result<()> {
    let mut host = StdioHost::new(std::io::stdout(), args.plugin_uuid);
    if let Some(register_event) = &args.register_event {
        host.register(register_event)?;
    }
    host.request_shared_defaults()?;

    info!("Sound player runs in {}", args.plugin_dir.display());
    install(Plugin::new(host, ProcessPlayer::new(args.plugin_dir))).await;

    spawner.spawn(orchestrator())?;
    spawner.spawn(alarm_ticker())?;
    spawner.spawn(animation_ticker())?;

    // the reader blocks on stdin, so it gets a thread of its own
    spawn_stdin_reader()?;
    Ok(())
}
