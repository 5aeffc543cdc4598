use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use avatar_gateway::chat::Role;
use avatar_gateway::session::SessionState;
use avatar_gateway::speech::{RestSynthesizer, SilentSynthesizer, SpeechQueue, Utterance};
use avatar_gateway::{AvatarSession, ChatOrchestrator, Config, RelayClient};

/// Avatar - real-time talking-avatar chat client
#[derive(Parser)]
#[command(name = "avatar", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable speech output (chat text only)
    #[arg(long, env = "AVATAR_DISABLE_SPEECH")]
    disable_speech: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single ungrounded chat turn and print the reply
    Ask {
        /// The query to send
        query: String,
    },
    /// Test speech synthesis
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the avatar voice.")]
        text: String,
    },
    /// Fetch a media relay token and print the relay URL
    TestRelay,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,avatar_gateway=info",
        1 => "info,avatar_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Ask { query } => ask(&query).await,
            Command::TestTts { text } => test_tts(&text).await,
            Command::TestRelay => test_relay().await,
        };
    }

    run_session(cli.disable_speech).await
}

/// Run the interactive console session
async fn run_session(disable_speech: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let synthesizer: Arc<dyn avatar_gateway::Synthesizer> = if disable_speech {
        tracing::info!("speech output disabled");
        Arc::new(SilentSynthesizer)
    } else {
        Arc::new(RestSynthesizer::new(&config.speech)?)
    };

    let display = spawn_display_printer();

    // Media negotiation is owned by an external transport; none is attached
    // from the console, so the session runs chat-only
    let mut session = AvatarSession::new(config, synthesizer, None, display);

    tracing::info!(session = %session.id(), "avatar gateway ready");
    session.run_console().await?;

    Ok(())
}

/// Run a single chat turn and print the assistant reply
async fn ask(query: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    // One-shot turns skip retrieval grounding
    config.grounding = None;

    let state = SessionState::new();
    let queue = SpeechQueue::new(Arc::new(SilentSynthesizer), state.clone());
    let (display_tx, mut display_rx) = mpsc::unbounded_channel::<String>();
    display_rx.close();

    let mut orchestrator = ChatOrchestrator::new(&config, queue, state, display_tx);
    orchestrator.handle_user_query(query).await?;

    if let Some(turn) = orchestrator.transcript().last() {
        if turn.role == Role::Assistant {
            println!("{}", turn.content);
        }
    }

    Ok(())
}

/// Synthesize one utterance through the configured speech endpoint
async fn test_tts(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Synthesizing: \"{text}\"");

    let state = SessionState::new();
    let synthesizer = Arc::new(RestSynthesizer::new(&config.speech)?);
    let queue = SpeechQueue::new(synthesizer, state);

    queue.enqueue(Utterance::new(text));
    queue.wait_until_idle().await;

    println!("Done. If the request succeeded, synthesis is working.");
    Ok(())
}

/// Fetch a relay token and print the negotiated relay URL
async fn test_relay() -> anyhow::Result<()> {
    let config = Config::load()?;

    let relay = RelayClient::new(&config.speech);
    let ice = relay.fetch_ice_server().await?;

    println!("Relay URL: {}", ice.urls.join(", "));
    println!("Username:  {}", ice.username);
    Ok(())
}

/// Spawn the task that renders display fragments to stdout
fn spawn_display_printer() -> mpsc::UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        use std::io::Write;
        while let Some(fragment) = rx.recv().await {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        }
    });
    tx
}
