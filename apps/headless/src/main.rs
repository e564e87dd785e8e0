use std::time::Duration;

use anyhow::{bail, Context, Result};
use pairs_core::{load_settings, CardFace, GameEvent, GameSession};
use rand::seq::IteratorRandom;
use shared::{domain::SlotIndex, protocol::UiRequest};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    time::timeout,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const EVENT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TAPS: usize = 400;

/// Plays one game against the configured catalog by tapping random face-down
/// cards until a pair is found.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    info!(catalog = %settings.catalog_url, "starting headless game");
    let session = GameSession::with_http(settings);
    let mut events = session.subscribe_events();
    let (request_tx, request_rx) = mpsc::channel(32);
    let worker = tokio::spawn(session.run(request_rx));

    request_tx
        .send(UiRequest::RequestNewGame)
        .await
        .context("game session stopped")?;

    let mut rng = rand::thread_rng();
    let mut slot_count = 0;
    let mut resolved = 0;
    let mut placeholders = 0;
    let mut face_up: Option<SlotIndex> = None;
    let mut taps = 0;

    let (first, second) = loop {
        let event = match timeout(EVENT_TIMEOUT, events.recv())
            .await
            .context("timed out waiting for the game session")?
        {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event stream lagged");
                continue;
            }
            Err(RecvError::Closed) => bail!("game session closed its event stream"),
        };

        let tap_next = match event {
            GameEvent::ErrorOccurred(err) => bail!("could not start a game: {err}"),
            GameEvent::LoadingStarted => {
                info!("loading image catalog");
                false
            }
            GameEvent::BoardReady { generation, slots } => {
                slot_count = slots.len();
                info!(generation = generation.0, slots = slot_count, "board dealt");
                false
            }
            GameEvent::CardImageUpdated { face, .. } => {
                resolved += 1;
                if matches!(face, CardFace::Placeholder) {
                    placeholders += 1;
                }
                resolved == slot_count
            }
            GameEvent::CardFlipped {
                index,
                face_up: true,
            } => {
                face_up = Some(index);
                true
            }
            GameEvent::CardFlipped { index, .. } => {
                if face_up == Some(index) {
                    face_up = None;
                }
                false
            }
            GameEvent::GameWon { first, second } => break (first, second),
        };

        if !tap_next {
            continue;
        }
        if taps >= MAX_TAPS {
            bail!("no matching pair found after {MAX_TAPS} taps");
        }
        let Some(index) = (0..slot_count)
            .map(SlotIndex)
            .filter(|index| Some(*index) != face_up)
            .choose(&mut rng)
        else {
            bail!("board has no cards to tap");
        };
        taps += 1;
        request_tx
            .send(UiRequest::CardTapped { index })
            .await
            .context("game session stopped")?;
    };

    info!(
        first = first.0,
        second = second.0,
        taps,
        placeholders,
        "pair found, game won"
    );

    drop(request_tx);
    worker.await.context("game session task failed")?;
    Ok(())
}
