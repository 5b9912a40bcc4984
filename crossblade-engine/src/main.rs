//! Crossblade scene runner - Main entry point
//!
//! Runs a single crossfade pass over a scene file against a recording audio
//! engine and prints the target volume of every sound. Useful to check a
//! layer configuration without a running session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossblade_common::config::TomlConfig;
use crossblade_common::events::EventLabel;
use crossblade_engine::{
    Controller, Playlist, RecordingAudioEngine, SessionSnapshot, SharedSession,
};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for crossblade-scene
#[derive(Parser, Debug)]
#[command(name = "crossblade-scene")]
#[command(about = "Dry-run a Crossblade crossfade pass over a scene")]
#[command(version)]
struct Args {
    /// Scene file with session state and playlists (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Settings file (TOML)
    #[arg(short, long, env = "CROSSBLADE_CONFIG")]
    config: Option<PathBuf>,

    /// Event label to use instead of classifying the session
    #[arg(short, long)]
    event: Option<String>,
}

/// Scene file contents
#[derive(Debug, Deserialize)]
struct Scene {
    #[serde(default)]
    session: SessionSnapshot,

    #[serde(default)]
    playlists: Vec<Playlist>,
}

fn load_scene(path: &Path) -> Result<Scene> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse scene file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TomlConfig::load_or_default(path).context("Failed to load configuration")?,
        None => TomlConfig::default(),
    };

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("crossblade_engine={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let scene = load_scene(&args.scene)?;
    info!(
        "Loaded scene with {} playlist(s) from {}",
        scene.playlists.len(),
        args.scene.display()
    );

    let audio = Arc::new(RecordingAudioEngine::new());
    let session = Arc::new(SharedSession::new(scene.session));
    let controller = Controller::new(audio.clone(), session, config.crossblade);

    for mut playlist in scene.playlists {
        for track in playlist.sounds.iter_mut() {
            if track.base_sound.is_none() && !track.path.is_empty() {
                track.base_sound = Some(audio.register(&track.path));
            }
        }
        controller.upsert_playlist(playlist).await;
    }

    let event = match args.event {
        Some(label) => EventLabel::new(label),
        None => controller.classify_event().await,
    };
    info!("Crossfading to {}", event);
    controller.set_current_event(event.clone()).await;

    let pass = controller.crossfade_playlists(&[]).await;
    let requests: Vec<_> = pass
        .tracks()
        .iter()
        .map(|fade| (fade.track.clone(), fade.batch.requests().to_vec()))
        .collect();
    pass.settle().await;

    println!("event: {}", event);
    if requests.is_empty() {
        println!("no playing track has layers");
    }
    for (track_ref, requests) in requests {
        let name = controller
            .playlist(&track_ref.playlist_id)
            .await
            .and_then(|playlist| playlist.track(&track_ref.track_id).map(|t| t.name.clone()))
            .unwrap_or_else(|| track_ref.to_string());
        println!("{}", name);
        for request in requests {
            let src = audio
                .source_of(request.sound)
                .unwrap_or_else(|| request.sound.to_string());
            println!("  {:<40} {:.3}", src, request.volume);
        }
    }

    Ok(())
}
