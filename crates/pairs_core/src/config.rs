use std::time::Duration;

const DEFAULT_CATALOG_URL: &str = match option_env!("PAIRS_BUILD_CATALOG_URL") {
    Some(url) => url,
    None => "http://homework.shoany.com/images/",
};
const DEFAULT_AUTH_TOKEN: &str = match option_env!("PAIRS_BUILD_AUTH_TOKEN") {
    Some(token) => token,
    None => "308358df7811aa81e103a4b926cadf6f7f0dca2a",
};
const DEFAULT_VERIFY_HEADER: &str = "X-SHO-verify";
const DEFAULT_VERIFY_VALUE: &str = "homework";
const DEFAULT_GRID_SIDE: usize = 4;
const DEFAULT_WIN_REVEAL_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 512;

/// How image ids are laid out over the slots of a fresh board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DealStrategy {
    /// N/2 ids, each placed on exactly two slots, then shuffled.
    #[default]
    Paired,
    /// Every slot draws its id on its own; a matching pair is not guaranteed.
    IndependentDraw,
}

impl DealStrategy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "paired" => Some(Self::Paired),
            "independent" | "independent_draw" => Some(Self::IndependentDraw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub catalog_url: String,
    pub auth_token: String,
    pub verify_header: String,
    pub verify_value: String,
    pub grid_side: usize,
    pub deal_strategy: DealStrategy,
    pub win_reveal_delay: Duration,
    pub max_image_dimension: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.into(),
            auth_token: DEFAULT_AUTH_TOKEN.into(),
            verify_header: DEFAULT_VERIFY_HEADER.into(),
            verify_value: DEFAULT_VERIFY_VALUE.into(),
            grid_side: DEFAULT_GRID_SIDE,
            deal_strategy: DealStrategy::default(),
            win_reveal_delay: DEFAULT_WIN_REVEAL_DELAY,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

impl Settings {
    pub fn slot_count(&self) -> usize {
        self.grid_side * self.grid_side
    }
}

/// Build-time defaults with process environment overrides applied.
pub fn load_settings() -> Settings {
    apply_overrides(Settings::default(), |key| std::env::var(key).ok())
}

pub(crate) fn apply_overrides(
    mut settings: Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Settings {
    if let Some(v) = lookup("PAIRS_CATALOG_URL") {
        settings.catalog_url = v;
    }

    if let Some(v) = lookup("PAIRS_AUTH_TOKEN") {
        settings.auth_token = v;
    }

    if let Some(v) = lookup("PAIRS_WIN_REVEAL_DELAY_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.win_reveal_delay = Duration::from_millis(parsed);
        }
    }

    if let Some(v) = lookup("PAIRS_DEAL_STRATEGY") {
        if let Some(strategy) = DealStrategy::parse(&v) {
            settings.deal_strategy = strategy;
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_describe_a_four_by_four_board() {
        let settings = Settings::default();
        assert_eq!(settings.slot_count(), 16);
        assert_eq!(settings.deal_strategy, DealStrategy::Paired);
        assert_eq!(settings.win_reveal_delay, Duration::from_millis(500));
        assert_eq!(settings.verify_header, "X-SHO-verify");
    }

    #[test]
    fn overrides_replace_endpoint_and_timing() {
        let settings = apply_overrides(
            Settings::default(),
            lookup_from(&[
                ("PAIRS_CATALOG_URL", "http://127.0.0.1:9000/images/"),
                ("PAIRS_AUTH_TOKEN", "secret"),
                ("PAIRS_WIN_REVEAL_DELAY_MS", "20"),
                ("PAIRS_DEAL_STRATEGY", "Independent"),
            ]),
        );
        assert_eq!(settings.catalog_url, "http://127.0.0.1:9000/images/");
        assert_eq!(settings.auth_token, "secret");
        assert_eq!(settings.win_reveal_delay, Duration::from_millis(20));
        assert_eq!(settings.deal_strategy, DealStrategy::IndependentDraw);
    }

    #[test]
    fn malformed_overrides_are_ignored() {
        let settings = apply_overrides(
            Settings::default(),
            lookup_from(&[
                ("PAIRS_WIN_REVEAL_DELAY_MS", "soon"),
                ("PAIRS_DEAL_STRATEGY", "whatever"),
            ]),
        );
        assert_eq!(settings.win_reveal_delay, DEFAULT_WIN_REVEAL_DELAY);
        assert_eq!(settings.deal_strategy, DealStrategy::Paired);
    }
}
