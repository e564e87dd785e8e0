//! The round state machine: slot table, the single face-up selection and the
//! terminal winner. All mutation happens from one sequential context; this
//! type is deliberately not shared across tasks.

use rand::{seq::SliceRandom, Rng};
use shared::{
    domain::{Generation, ImageId, SlotIndex},
    error::{DealError, SelectError},
};
use tracing::debug;

use crate::{
    config::DealStrategy,
    loader::LoadCompletion,
    slot::{CardFace, CardSlot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Flipped(SlotIndex),
    /// The face-up card was tapped again and turned back down.
    Unflipped(SlotIndex),
    /// Both cards stay face up; the round is over.
    Won {
        first: SlotIndex,
        second: SlotIndex,
    },
    Replaced {
        unflipped: SlotIndex,
        flipped: SlotIndex,
    },
    GameAlreadyWon,
}

#[derive(Debug, Default)]
pub struct GameStateMachine {
    slots: Vec<CardSlot>,
    selected: Option<SlotIndex>,
    winner: Option<SlotIndex>,
    generation: Generation,
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[CardSlot] {
        &self.slots
    }

    pub fn slot(&self, index: SlotIndex) -> Option<&CardSlot> {
        self.slots.get(index.0)
    }

    pub fn selected(&self) -> Option<SlotIndex> {
        self.selected
    }

    pub fn winner(&self) -> Option<SlotIndex> {
        self.winner
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_won(&self) -> bool {
        self.winner.is_some()
    }

    pub fn face_up_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.face_up).count()
    }

    /// Builds a fresh board of `slot_count` slots over a catalog of
    /// `catalog_len` images. On error the current board is left untouched.
    pub fn deal<R: Rng + ?Sized>(
        &mut self,
        catalog_len: usize,
        slot_count: usize,
        strategy: DealStrategy,
        rng: &mut R,
    ) -> Result<Generation, DealError> {
        validate_shape(catalog_len, slot_count)?;
        let layout = match strategy {
            DealStrategy::Paired => paired_layout(catalog_len, slot_count, rng),
            DealStrategy::IndependentDraw => (0..slot_count)
                .map(|_| ImageId(rng.gen_range(0..catalog_len)))
                .collect(),
        };
        Ok(self.install(layout))
    }

    /// Deals an explicit layout, one image id per slot in index order.
    pub fn deal_layout(
        &mut self,
        layout: Vec<ImageId>,
        catalog_len: usize,
    ) -> Result<Generation, DealError> {
        validate_shape(catalog_len, layout.len())?;
        if let Some(out_of_range) = layout.iter().find(|id| id.0 >= catalog_len) {
            return Err(DealError::ImageOutOfRange {
                image: out_of_range.0,
                catalog_len,
            });
        }
        Ok(self.install(layout))
    }

    fn install(&mut self, layout: Vec<ImageId>) -> Generation {
        self.generation = self.generation.next();
        let generation = self.generation;
        self.slots = layout
            .into_iter()
            .enumerate()
            .map(|(index, image_id)| CardSlot::new(SlotIndex(index), image_id, generation))
            .collect();
        self.selected = None;
        self.winner = None;
        debug!(generation = generation.0, slots = self.slots.len(), "dealt board");
        generation
    }

    /// Drops the board entirely. Outstanding loads become stale.
    pub fn clear(&mut self) {
        self.generation = self.generation.next();
        self.slots.clear();
        self.selected = None;
        self.winner = None;
    }

    /// Clears selection and winner and turns every card face down. The slot
    /// set and loaded images are kept.
    pub fn reset(&mut self) {
        self.selected = None;
        self.winner = None;
        for slot in &mut self.slots {
            slot.face_up = false;
        }
    }

    pub fn select(&mut self, index: SlotIndex) -> Result<SelectOutcome, SelectError> {
        if self.winner.is_some() {
            return Ok(SelectOutcome::GameAlreadyWon);
        }
        if index.0 >= self.slots.len() {
            return Err(SelectError::UnknownSlot(index));
        }

        let outcome = match self.selected {
            None => {
                self.slots[index.0].face_up = true;
                self.selected = Some(index);
                SelectOutcome::Flipped(index)
            }
            Some(current) if current == index => {
                self.slots[index.0].face_up = false;
                self.selected = None;
                SelectOutcome::Unflipped(index)
            }
            Some(current) if self.slots[current.0].image_id == self.slots[index.0].image_id => {
                self.slots[current.0].face_up = true;
                self.slots[index.0].face_up = true;
                self.selected = None;
                self.winner = Some(index);
                SelectOutcome::Won {
                    first: current,
                    second: index,
                }
            }
            Some(current) => {
                self.slots[current.0].face_up = false;
                self.slots[index.0].face_up = true;
                self.selected = Some(index);
                SelectOutcome::Replaced {
                    unflipped: current,
                    flipped: index,
                }
            }
        };
        debug!(?outcome, "card selected");
        Ok(outcome)
    }

    /// Applies a finished image load. Returns the new face when the result
    /// belongs to the current board, `None` when it is stale and was dropped.
    pub fn apply_load(&mut self, completion: LoadCompletion) -> Option<CardFace> {
        if completion.generation != self.generation {
            debug!(
                slot = completion.slot.0,
                stale = completion.generation.0,
                current = self.generation.0,
                "dropping image load from a previous round"
            );
            return None;
        }
        let slot = self.slots.get_mut(completion.slot.0)?;
        if slot.generation != completion.generation {
            return None;
        }
        match completion.result {
            Ok(image) => slot.mark_loaded(image),
            Err(_) => slot.mark_failed(),
        }
        slot.face()
    }
}

fn validate_shape(catalog_len: usize, slot_count: usize) -> Result<(), DealError> {
    if catalog_len == 0 {
        return Err(DealError::EmptyCatalog);
    }
    if slot_count == 0 || slot_count % 2 != 0 {
        return Err(DealError::InvalidSlotCount(slot_count));
    }
    Ok(())
}

fn paired_layout<R: Rng + ?Sized>(
    catalog_len: usize,
    slot_count: usize,
    rng: &mut R,
) -> Vec<ImageId> {
    let pair_count = slot_count / 2;
    let picks: Vec<usize> = if catalog_len >= pair_count {
        rand::seq::index::sample(rng, catalog_len, pair_count).into_vec()
    } else {
        (0..pair_count).map(|_| rng.gen_range(0..catalog_len)).collect()
    };

    let mut layout: Vec<ImageId> = picks
        .into_iter()
        .flat_map(|id| [ImageId(id), ImageId(id)])
        .collect();
    layout.shuffle(rng);
    layout
}

#[cfg(test)]
#[path = "tests/game_tests.rs"]
mod tests;
