use serde::{Deserialize, Serialize};

macro_rules! index_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
            Deserialize,
        )]
        pub struct $name(pub $inner);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

index_newtype!(SlotIndex, usize);
index_newtype!(ImageId, usize);
index_newtype!(Generation, u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// One usable entry of the image catalog. `file` is the raw value reported by
/// the service, `url` is where the image bytes are actually fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    pub file: String,
    pub url: String,
}

impl ImageReference {
    pub fn new(file: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    Pending,
    Loaded,
    Failed,
}
