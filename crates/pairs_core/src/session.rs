//! Session controller: catalog fetch, deal, per-card image requests and tap
//! forwarding. A session is driven from a single task; background work only
//! reaches it through channels.

use std::{collections::HashMap, sync::Arc};

use reqwest::Client;
use shared::{
    domain::{Generation, ImageReference, SlotIndex},
    protocol::UiRequest,
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    catalog::{HttpImageCatalog, ImageCatalog},
    config::Settings,
    events::{flip_events, GameEvent, SessionError},
    game::{GameStateMachine, SelectOutcome},
    loader::{CardImageLoader, HttpImageSource, ImageSource, LoadCompletion},
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
struct PendingWin {
    generation: Generation,
    first: SlotIndex,
    second: SlotIndex,
}

pub struct GameSession {
    catalog: Arc<dyn ImageCatalog>,
    loader: CardImageLoader,
    settings: Settings,
    machine: GameStateMachine,
    round_images: Vec<ImageReference>,
    inflight: HashMap<SlotIndex, JoinHandle<()>>,
    events: broadcast::Sender<GameEvent>,
    completions_tx: mpsc::UnboundedSender<LoadCompletion>,
    completions_rx: mpsc::UnboundedReceiver<LoadCompletion>,
    wins_tx: mpsc::UnboundedSender<PendingWin>,
    wins_rx: mpsc::UnboundedReceiver<PendingWin>,
}

impl GameSession {
    pub fn new(
        catalog: Arc<dyn ImageCatalog>,
        source: Arc<dyn ImageSource>,
        settings: Settings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (wins_tx, wins_rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            loader: CardImageLoader::new(source, settings.max_image_dimension),
            settings,
            machine: GameStateMachine::new(),
            round_images: Vec::new(),
            inflight: HashMap::new(),
            events,
            completions_tx,
            completions_rx,
            wins_tx,
            wins_rx,
        }
    }

    /// Session backed by the HTTP catalog and image endpoints in `settings`.
    pub fn with_http(settings: Settings) -> Self {
        let http = Client::new();
        let catalog = HttpImageCatalog::from_settings(http.clone(), &settings);
        Self::new(
            Arc::new(catalog),
            Arc::new(HttpImageSource::new(http)),
            settings,
        )
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn machine(&self) -> &GameStateMachine {
        &self.machine
    }

    pub fn round_images(&self) -> &[ImageReference] {
        &self.round_images
    }

    fn emit(&self, event: GameEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    pub async fn start_new_game(&mut self) {
        self.emit(GameEvent::LoadingStarted);
        self.abort_inflight();
        self.machine.reset();

        let images = match self.catalog.fetch().await {
            Ok(images) => images,
            Err(err) => {
                warn!("failed to fetch image catalog: {err}");
                self.abandon_round(err.into());
                return;
            }
        };

        let dealt = {
            let mut rng = rand::thread_rng();
            self.machine.deal(
                images.len(),
                self.settings.slot_count(),
                self.settings.deal_strategy,
                &mut rng,
            )
        };
        let generation = match dealt {
            Ok(generation) => generation,
            Err(err) => {
                warn!("failed to deal a board: {err}");
                self.abandon_round(err.into());
                return;
            }
        };

        self.round_images = images;
        info!(
            generation = generation.0,
            slots = self.machine.slots().len(),
            catalog = self.round_images.len(),
            "new game ready"
        );
        self.emit(GameEvent::BoardReady {
            generation,
            slots: self.machine.slots().to_vec(),
        });

        for index in 0..self.machine.slots().len() {
            self.request_card_image(SlotIndex(index));
        }
    }

    fn abandon_round(&mut self, err: SessionError) {
        self.machine.clear();
        self.round_images.clear();
        self.emit(GameEvent::ErrorOccurred(err));
    }

    /// Asks for one cell's image. Already resolved faces are re-published
    /// instead of fetched again; a load already in flight is left alone.
    pub fn request_card_image(&mut self, index: SlotIndex) {
        let Some(slot) = self.machine.slot(index) else {
            debug!(slot = index.0, "image requested for a slot not on the board");
            return;
        };
        if let Some(face) = slot.face() {
            self.emit(GameEvent::CardImageUpdated { index, face });
            return;
        }
        if self
            .inflight
            .get(&index)
            .is_some_and(|handle| !handle.is_finished())
        {
            return;
        }
        let Some(reference) = self.round_images.get(slot.image_id.0).cloned() else {
            warn!(slot = index.0, image = slot.image_id.0, "slot refers to a missing catalog entry");
            return;
        };

        let generation = slot.generation;
        let handle = self.loader.spawn_load(
            index,
            generation,
            reference,
            self.completions_tx.clone(),
        );
        self.inflight.insert(index, handle);
    }

    fn abort_inflight(&mut self) {
        for (_, handle) in self.inflight.drain() {
            handle.abort();
        }
    }

    pub fn on_card_tapped(&mut self, index: SlotIndex) {
        let outcome = match self.machine.select(index) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("ignoring tap: {err}");
                return;
            }
        };

        if outcome == SelectOutcome::GameAlreadyWon {
            debug!(slot = index.0, "ignoring tap after the game was won");
            return;
        }
        for event in flip_events(outcome) {
            self.emit(event);
        }
        if let SelectOutcome::Won { first, second } = outcome {
            self.schedule_win(first, second);
        }
    }

    fn schedule_win(&self, first: SlotIndex, second: SlotIndex) {
        let pending = PendingWin {
            generation: self.machine.generation(),
            first,
            second,
        };
        let delay = self.settings.win_reveal_delay;
        let wins_tx = self.wins_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wins_tx.send(pending);
        });
    }

    pub fn handle_load_completion(&mut self, completion: LoadCompletion) {
        let index = completion.slot;
        if completion.generation == self.machine.generation() {
            self.inflight.remove(&index);
        }
        if let Some(face) = self.machine.apply_load(completion) {
            self.emit(GameEvent::CardImageUpdated { index, face });
        }
    }

    fn handle_win_due(&mut self, pending: PendingWin) {
        if pending.generation != self.machine.generation()
            || self.machine.winner() != Some(pending.second)
        {
            debug!(
                generation = pending.generation.0,
                "dropping win notice for a round that is no longer active"
            );
            return;
        }
        info!(
            first = pending.first.0,
            second = pending.second.0,
            "player found a matching pair"
        );
        self.emit(GameEvent::GameWon {
            first: pending.first,
            second: pending.second,
        });
    }

    pub async fn handle_request(&mut self, request: UiRequest) {
        match request {
            UiRequest::RequestNewGame => self.start_new_game().await,
            UiRequest::CardTapped { index } => self.on_card_tapped(index),
            UiRequest::CardVisible { index } => self.request_card_image(index),
        }
    }

    /// Waits for the next background result (image load or win timer) and
    /// applies it.
    pub async fn process_next_signal(&mut self) {
        tokio::select! {
            Some(completion) = self.completions_rx.recv() => self.handle_load_completion(completion),
            Some(pending) = self.wins_rx.recv() => self.handle_win_due(pending),
        }
    }

    /// Drives the session until the request channel closes.
    pub async fn run(mut self, mut requests: mpsc::Receiver<UiRequest>) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => break,
                },
                _ = self.process_next_signal() => {}
            }
        }
        debug!("game session stopped");
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.abort_inflight();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
