//! Image catalog fetching: one GET against the catalog endpoint, parsed into a
//! freshly shuffled list of [`ImageReference`]s.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use shared::{domain::ImageReference, error::CatalogError, protocol::CatalogResponse};
use tracing::{debug, warn};
use url::Url;

const CATALOG_CONTENT_TYPE: &str = "multipart/form-data;";

#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Returns the catalog in a new random order on every call. Never retries.
    async fn fetch(&self) -> Result<Vec<ImageReference>, CatalogError>;
}

pub struct HttpImageCatalog {
    http: Client,
    catalog_url: String,
    auth_token: String,
    verify_header: String,
    verify_value: String,
}

impl HttpImageCatalog {
    pub fn new(
        http: Client,
        catalog_url: impl Into<String>,
        auth_token: impl Into<String>,
        verify_header: impl Into<String>,
        verify_value: impl Into<String>,
    ) -> Self {
        Self {
            http,
            catalog_url: catalog_url.into(),
            auth_token: auth_token.into(),
            verify_header: verify_header.into(),
            verify_value: verify_value.into(),
        }
    }

    pub fn from_settings(http: Client, settings: &crate::config::Settings) -> Self {
        Self::new(
            http,
            settings.catalog_url.clone(),
            settings.auth_token.clone(),
            settings.verify_header.clone(),
            settings.verify_value.clone(),
        )
    }

    fn headers(&self) -> Result<HeaderMap, CatalogError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.auth_token))
            .map_err(|err| CatalogError::Connection(format!("invalid auth token: {err}")))?;
        let verify_name = HeaderName::from_bytes(self.verify_header.as_bytes())
            .map_err(|err| CatalogError::Connection(format!("invalid verify header: {err}")))?;
        let verify_value = HeaderValue::from_str(&self.verify_value)
            .map_err(|err| CatalogError::Connection(format!("invalid verify value: {err}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(verify_name, verify_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CATALOG_CONTENT_TYPE));
        Ok(headers)
    }
}

#[async_trait]
impl ImageCatalog for HttpImageCatalog {
    async fn fetch(&self) -> Result<Vec<ImageReference>, CatalogError> {
        let base = Url::parse(&self.catalog_url).map_err(|err| {
            CatalogError::Connection(format!("invalid catalog url '{}': {err}", self.catalog_url))
        })?;

        let res = self
            .http
            .get(base.clone())
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|err| CatalogError::Connection(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            warn!(%status, url = %base, "catalog request rejected");
            return Err(CatalogError::Connection(format!(
                "catalog responded with status {status}"
            )));
        }

        let body = res
            .bytes()
            .await
            .map_err(|err| CatalogError::InvalidData(err.to_string()))?;
        if body.is_empty() {
            return Err(CatalogError::InvalidData("empty response body".into()));
        }

        let mut images = parse_catalog(&base, &body)?;
        images.shuffle(&mut rand::thread_rng());
        debug!(count = images.len(), "catalog fetched");
        Ok(images)
    }
}

/// Parses a catalog body into image references in service order.
pub fn parse_catalog(base: &Url, body: &[u8]) -> Result<Vec<ImageReference>, CatalogError> {
    let parsed: CatalogResponse =
        serde_json::from_slice(body).map_err(|err| CatalogError::Parsing(err.to_string()))?;

    let skipped = parsed.records_missing_file();
    if skipped > 0 {
        warn!(skipped, "catalog records without a file field were skipped");
    }
    if let Some(count) = parsed.count {
        if count >= 0 && count as usize != parsed.images.len() {
            debug!(
                reported = count,
                actual = parsed.images.len(),
                "catalog count disagrees with image list"
            );
        }
    }

    let mut images = Vec::new();
    for file in parsed.files() {
        match resolve_image_url(base, file) {
            Some(url) => images.push(ImageReference::new(file, url.to_string())),
            None => warn!(file, "skipping catalog record with unresolvable file"),
        }
    }

    if images.is_empty() {
        return Err(CatalogError::EmptyResult);
    }
    Ok(images)
}

/// Re-roots the last path segment of `file` under the catalog base URL.
/// Dot segments, plain or percent-encoded, resolve to `None`, as does any
/// name that would land outside the base directory.
pub fn resolve_image_url(base: &Url, file: &str) -> Option<Url> {
    let name = file.trim().rsplit('/').next().filter(|name| !name.is_empty())?;
    if is_dot_segment(name) {
        return None;
    }

    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.set_query(None);
    root.set_fragment(None);

    let resolved = root.join(name).ok()?;
    let stays_under_root = resolved.origin() == root.origin()
        && resolved.path().starts_with(root.path())
        && resolved.path().len() > root.path().len();
    stays_under_root.then_some(resolved)
}

fn is_dot_segment(name: &str) -> bool {
    let decoded = name.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
