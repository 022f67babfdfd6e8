use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use voxroom_lib::config::ConfigManager;
use voxroom_lib::session::VoiceCoordinator;
use voxroom_lib::state::StateChangeEvent;
use voxroom_lib::token::TokenIssuer;
use voxroom_lib::transport::{MockConnector, ParticipantIdentity, RemoteTrack, RoomEvent};
use voxroom_lib::utils::error::{AppError, AppResult};
use voxroom_lib::utils::logging::init_logging;

const AGENT_IDENTITY: &str = "agent";

#[derive(Parser, Debug)]
#[command(name = "voxroom")]
#[command(about = "Drive a voice session through a scripted agent turn")]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "voxroom.json")]
    config: PathBuf,

    /// User id, prefixed with the configured identity prefix
    #[arg(short, long, default_value = "demo")]
    identity: String,

    /// Room name (overrides the config file)
    #[arg(long)]
    room: Option<String>,

    /// Delay between scripted room events, in milliseconds
    #[arg(long, default_value = "200")]
    step_ms: u64,

    /// Only mint and print an access token
    #[arg(long)]
    token_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        let ctx = err.context();
        error!(
            code = ?ctx.code,
            recoverable = ctx.recoverable,
            detail = ?ctx.detail,
            "{}",
            ctx.message
        );
        if let Ok(line) = serde_json::to_string(&ctx) {
            eprintln!("{}", line);
        }
        return Err(anyhow::Error::new(err).context(ctx.message));
    }

    Ok(())
}

async fn run(args: Args) -> AppResult<()> {
    let mut config = ConfigManager::load(&args.config).inspect_err(|e| {
        error!(path = %args.config.display(), error = %e, "Failed to load config");
    })?;
    config.apply_env();
    if let Some(room) = args.room {
        config.livekit.room_name = room;
    }

    let identity = config.livekit.participant_identity(&args.identity);

    let token = if config.livekit.has_credentials() {
        let issued = TokenIssuer::from_config(&config.livekit)?
            .issue(&identity, &config.livekit.room_name)?;
        let json = serde_json::to_string_pretty(&issued)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        println!("{}", json);
        issued.token
    } else {
        warn!("LIVEKIT_API_KEY / LIVEKIT_API_SECRET not set, using a placeholder token");
        "placeholder-token".to_string()
    };

    if args.token_only {
        return Ok(());
    }

    let server_url = if config.livekit.server_url.is_empty() {
        "wss://mock.voxroom.local".to_string()
    } else {
        config.livekit.server_url.clone()
    };

    let connector = MockConnector::new(identity.as_str());
    let coordinator = VoiceCoordinator::new(Arc::new(connector.clone()), config.session.clone());

    let mut changes = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = changes.recv().await {
            let event = StateChangeEvent::from(&snapshot);
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to serialize state change"),
            }
        }
    });

    let outcome = coordinator.connect(&token, &server_url).await?;
    info!(?outcome, "Connect finished");

    let room = connector
        .last_room()
        .ok_or_else(|| AppError::from("connector did not open a room"))?;
    let step = Duration::from_millis(args.step_ms);
    let agent_audio = RemoteTrack::audio("TR_agent_audio", AGENT_IDENTITY);

    let script = [
        RoomEvent::ActiveSpeakersChanged(vec![ParticipantIdentity::new(identity.as_str())]),
        RoomEvent::ActiveSpeakersChanged(vec![]),
        RoomEvent::DataReceived {
            payload: b"agent is thinking".to_vec(),
            sender: Some(ParticipantIdentity::new(AGENT_IDENTITY)),
        },
        RoomEvent::TrackSubscribed(agent_audio.clone()),
        RoomEvent::ActiveSpeakersChanged(vec![ParticipantIdentity::new(AGENT_IDENTITY)]),
        RoomEvent::TrackUnsubscribed(agent_audio),
        RoomEvent::ActiveSpeakersChanged(vec![]),
    ];

    for event in script {
        info!(event = event.name(), "Emitting scripted room event");
        room.emit(event);
        tokio::time::sleep(step).await;
        info!(agent_state = %coordinator.agent_state(), "Agent state");
    }

    let muted = coordinator.toggle_mute().await?;
    info!(muted, agent_state = %coordinator.agent_state(), "Microphone toggled");
    tokio::time::sleep(step).await;
    coordinator.toggle_mute().await?;

    coordinator.shutdown().await;
    printer
        .await
        .map_err(|e| AppError::Internal(format!("state printer failed: {}", e)))?;

    Ok(())
}
