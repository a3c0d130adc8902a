//! Text-only round trip: says hello and prints the assistant's transcript.
//! Audio is queued but never played.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use realtime_voice::utils::playback::PlaybackQueue;
use realtime_voice::{Config, SessionController, SessionEvent, WebSocketTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let config = Config::from_env().context("failed to load configuration")?;
    let sink = Arc::new(PlaybackQueue::new(config.output_sample_rate()));
    let mut session = SessionController::new(config, WebSocketTransport::default(), sink);
    let mut notifications = session.subscribe();

    session.connect(&CancellationToken::new()).await?;
    println!("Connected to the realtime endpoint");

    session.send_user_message("Hello!", false, true).await;

    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            alive = session.process_next() => if !alive { break },
        }
        while let Ok(event) = notifications.try_recv() {
            match event {
                SessionEvent::AssistantTranscript(text) => println!("assistant: {text}"),
                SessionEvent::ResponseDone { .. } => println!("response done"),
                other => tracing::debug!("{:?}", other),
            }
        }
    }

    session.disconnect().await;
    Ok(())
}
