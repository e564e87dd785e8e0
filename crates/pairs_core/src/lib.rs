//! Core of the pairs memory game: image catalog, per-card image loading, the
//! round state machine and the session controller that ties them together.

pub mod catalog;
pub mod config;
pub mod events;
pub mod game;
pub mod loader;
pub mod session;
pub mod slot;

pub use catalog::{HttpImageCatalog, ImageCatalog};
pub use config::{load_settings, DealStrategy, Settings};
pub use events::{GameEvent, SessionError};
pub use game::{GameStateMachine, SelectOutcome};
pub use loader::{CardImageLoader, DecodedImage, HttpImageSource, ImageSource, LoadCompletion};
pub use session::GameSession;
pub use slot::{CardFace, CardSlot};
