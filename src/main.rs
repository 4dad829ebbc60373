//! automation-voice: drive the speech rendering core from the command line.
//!
//! `speak` stands in for the host framework; `listen` is the relay observer.

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use automation_voice::fragment::parse_markup;
use automation_voice::{
    logging, AbortSignal, BookmarkEvent, Config, EngineSite, FragmentSequencer, LocalRelayClient,
    SiteError, VocalizationSupervisor, ACTION_ABORT, EVENT_INTEREST_BOOKMARK,
};

#[derive(Parser, Debug)]
#[command(name = "automation-voice", about = "Speech renderer plugin core")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Speak one utterance. Inline `<bookmark mark="N"/>` tags become bookmarks.
    Speak {
        #[arg(required = true)]
        text: Vec<String>,

        /// Report no interest in bookmark events
        #[arg(long)]
        no_bookmarks: bool,
    },

    /// Print every message arriving on the relay endpoint
    Listen {
        /// One JSON object per line, with a local timestamp
        #[arg(long)]
        json: bool,
    },
}

/// Host stand-in: prints bookmark events, aborts on Ctrl-C.
struct ConsoleSite {
    interest: u64,
    actions: Arc<AtomicU32>,
}

impl AbortSignal for ConsoleSite {
    fn abort_requested(&self) -> bool {
        self.actions.abort_requested()
    }
}

impl EngineSite for ConsoleSite {
    fn event_interest(&self) -> Result<u64, SiteError> {
        Ok(self.interest)
    }

    fn add_event(&self, event: BookmarkEvent) -> Result<(), SiteError> {
        println!("bookmark {} ({})", event.marker, event.text);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = logging::bootstrap(|| Config::load(args.config.as_deref()));
    logging::init(
        "automation-voice",
        args.verbose,
        config.logging.directory.as_deref(),
    );
    info!("Relay endpoint: {}", config.relay.endpoint.display());

    match args.command {
        Cmd::Speak { text, no_bookmarks } => speak(config, &text.join(" "), !no_bookmarks).await,
        Cmd::Listen { json } => listen(&config, json).await,
    }
}

async fn speak(config: Config, text: &str, bookmarks: bool) -> Result<(), Box<dyn Error>> {
    let fragments = parse_markup(text);
    if fragments.is_empty() {
        return Err("nothing to speak".into());
    }

    let actions = Arc::new(AtomicU32::new(0));
    let site = ConsoleSite {
        interest: if bookmarks { EVENT_INTEREST_BOOKMARK } else { 0 },
        actions: actions.clone(),
    };

    // The core is synchronous; keep it off the runtime so Ctrl-C stays live.
    let mut task = tokio::task::spawn_blocking(move || {
        let relay = LocalRelayClient::new(&config.relay.endpoint);
        let vocalizer = VocalizationSupervisor::new(&config.vocalizer);
        let mut sequencer = FragmentSequencer::new(relay, vocalizer);
        sequencer.speak(&fragments, &site)
    });

    let result = tokio::select! {
        joined = &mut task => joined?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, aborting utterance");
            actions.fetch_or(ACTION_ABORT, Ordering::Relaxed);
            task.await?
        }
    };

    result?;
    Ok(())
}

#[cfg(unix)]
async fn listen(config: &Config, json: bool) -> Result<(), Box<dyn Error>> {
    use automation_voice::listener::{ObservedMessage, RelayListener};
    use tokio::sync::mpsc;

    let listener = RelayListener::bind(&config.relay.endpoint)?;
    let (tx, mut rx) = mpsc::channel(64);
    let server = tokio::spawn(listener.run(tx));

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                if json {
                    println!("{}", serde_json::to_string(&ObservedMessage::new(&message))?);
                } else {
                    println!("{}", message.to_wire());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down listener");
                server.abort();
                return Ok(());
            }
        }
    }

    // The channel only closes when the accept loop stops.
    server.await??;
    Ok(())
}

#[cfg(not(unix))]
async fn listen(_config: &Config, _json: bool) -> Result<(), Box<dyn Error>> {
    Err("the relay listener is only available on unix".into())
}
