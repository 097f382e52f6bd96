use anyhow::bail;
use apcmini_kbd::DeviceType;
use apcmini_kbd::controller::Controller;
use apcmini_kbd::events::{Event, Events};
use apcmini_kbd::midi_player;
use apcmini_kbd::skin::Skin;
use apcmini_kbd::surface::{self, Surface};
use clap::CommandFactory;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// This command drives an Akai APC mini as a standalone instrument surface:
/// the pad grid becomes a scrollable piano keyboard or drum-kit bank, and
/// pad presses are translated to notes on a virtual MIDI output port.
/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
/// If RUST_LOG is not set, the log level defaults to Info.
/// Set RUST_LOG=apcmini_kbd::module::path=level to see messages for a given module.
/// Set RUST_LOG=apcmini_kbd to see all messages.
#[derive(Parser)]
#[command(version, about, long_about = None, verbatim_doc_comment)]
struct Cli {
    /// Substring to match for midi port; run amidi -l
    #[arg(long)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Main command -- light the grid and translate pad presses to notes
    Run {
        /// TOML file overriding the default pad colors
        #[arg(long)]
        skin: Option<PathBuf>,
        /// Send notes to a virtual output port named "APC mini Keys"
        #[arg(long)]
        midi: bool,
    },
    /// Generate shell completion
    Completion {
        /// shell
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }
    let Some(port) = cli.port else {
        bail!("the port option is required");
    };

    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Info);
    }
    log_builder.init();

    let Commands::Run { skin, midi } = cli.command else {
        unreachable!("already handled");
    };
    let skin = match skin {
        None => Skin::default(),
        Some(file) => Skin::load(&file)?,
    };

    let events = Events::new();
    let events_tx = events.sender().await;
    let events_rx = events.receiver();

    // Create the midi controller and wait for the identity handshake.
    let (id_tx, id_rx) = oneshot::channel();
    let controller = Controller::new(&port, id_tx)?;
    match id_rx.await? {
        DeviceType::ApcMini => {}
        DeviceType::Empty => bail!("unable to identify an APC mini on port {port}"),
    }

    let surface = Surface::new(events_tx.clone(), skin)?;
    let main_handle =
        surface::start_surface(Some(controller), surface, events_rx.resubscribe()).await?;

    if midi {
        let rx2 = events_rx.resubscribe();
        tokio::spawn(async move {
            if let Err(e) = midi_player::play_midi(rx2).await {
                log::error!("midi player error: {e}");
            }
        });
    }

    // Make sure everything is cleaned up on exit.
    tokio::spawn(async move {
        log::info!("Hit CTRL-C to exit");
        let _ = tokio::signal::ctrl_c().await;
        events.shutdown().await;
    });

    if let Some(tx) = events_tx.upgrade() {
        tx.send(Event::Reset)?;
    }
    drop(events_tx);
    drop(events_rx);
    main_handle.await?
}
