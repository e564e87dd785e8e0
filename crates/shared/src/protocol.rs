use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::SlotIndex;

pub const FILE_FIELD: &str = "file";

/// Body returned by the image catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub images: Vec<HashMap<String, String>>,
}

impl CatalogResponse {
    /// `file` values in service order; records without one are left out.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.images
            .iter()
            .filter_map(|record| record.get(FILE_FIELD).map(String::as_str))
    }

    pub fn records_missing_file(&self) -> usize {
        self.images
            .iter()
            .filter(|record| !record.contains_key(FILE_FIELD))
            .count()
    }
}

/// Requests the presentation layer sends into a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UiRequest {
    RequestNewGame,
    CardTapped { index: SlotIndex },
    CardVisible { index: SlotIndex },
}
