use thiserror::Error;

use crate::domain::SlotIndex;

/// Failure to obtain a usable image catalog. Fatal to starting a round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog connection failed: {0}")]
    Connection(String),
    #[error("catalog response carried no readable data: {0}")]
    InvalidData(String),
    #[error("catalog response could not be parsed: {0}")]
    Parsing(String),
    #[error("catalog contains no images")]
    EmptyResult,
}

/// Failure to load one card image. Recovered locally with a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("image request failed: {0}")]
    Network(String),
    #[error("image request returned status {0}")]
    Status(u16),
    #[error("image could not be decoded: {0}")]
    Decode(String),
    #[error("image load was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealError {
    #[error("cannot deal from an empty catalog")]
    EmptyCatalog,
    #[error("slot count must be even and non-zero, got {0}")]
    InvalidSlotCount(usize),
    #[error("layout references image {image} outside a catalog of {catalog_len}")]
    ImageOutOfRange { image: usize, catalog_len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no slot {0} on the current board")]
    UnknownSlot(SlotIndex),
}
