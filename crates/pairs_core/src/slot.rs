use std::sync::Arc;

use shared::domain::{Generation, ImageId, LoadStatus, SlotIndex};

use crate::loader::DecodedImage;

/// What a face-up card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFace {
    Image(Arc<DecodedImage>),
    /// Neutral stand-in for a card whose image could not be loaded.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct CardSlot {
    pub index: SlotIndex,
    pub image_id: ImageId,
    pub generation: Generation,
    pub loaded_image: Option<Arc<DecodedImage>>,
    pub load_status: LoadStatus,
    pub face_up: bool,
}

impl CardSlot {
    pub fn new(index: SlotIndex, image_id: ImageId, generation: Generation) -> Self {
        Self {
            index,
            image_id,
            generation,
            loaded_image: None,
            load_status: LoadStatus::Pending,
            face_up: false,
        }
    }

    /// `None` while the image is still pending.
    pub fn face(&self) -> Option<CardFace> {
        match (self.load_status, &self.loaded_image) {
            (LoadStatus::Loaded, Some(image)) => Some(CardFace::Image(Arc::clone(image))),
            (LoadStatus::Pending, _) => None,
            _ => Some(CardFace::Placeholder),
        }
    }

    pub(crate) fn mark_loaded(&mut self, image: Arc<DecodedImage>) {
        self.loaded_image = Some(image);
        self.load_status = LoadStatus::Loaded;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.loaded_image = None;
        self.load_status = LoadStatus::Failed;
    }
}
