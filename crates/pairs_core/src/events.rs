//! Notifications a game session publishes to the presentation layer.

use shared::{
    domain::{Generation, SlotIndex},
    error::{CatalogError, DealError},
};
use thiserror::Error;

use crate::{
    game::SelectOutcome,
    slot::{CardFace, CardSlot},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Deal(#[from] DealError),
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Starting a round failed; no board is shown. The player may retry.
    ErrorOccurred(SessionError),
    LoadingStarted,
    BoardReady {
        generation: Generation,
        slots: Vec<CardSlot>,
    },
    CardImageUpdated {
        index: SlotIndex,
        face: CardFace,
    },
    CardFlipped {
        index: SlotIndex,
        face_up: bool,
    },
    /// Published after the reveal delay, once both cards have been shown.
    GameWon {
        first: SlotIndex,
        second: SlotIndex,
    },
}

/// Visual flips implied by a selection outcome. The delayed win notice is not
/// included.
pub fn flip_events(outcome: SelectOutcome) -> Vec<GameEvent> {
    let flip = |index, face_up| GameEvent::CardFlipped { index, face_up };
    match outcome {
        SelectOutcome::Flipped(index) => vec![flip(index, true)],
        SelectOutcome::Unflipped(index) => vec![flip(index, false)],
        SelectOutcome::Won { first, second } => vec![flip(first, true), flip(second, true)],
        SelectOutcome::Replaced { unflipped, flipped } => {
            vec![flip(unflipped, false), flip(flipped, true)]
        }
        SelectOutcome::GameAlreadyWon => Vec::new(),
    }
}
