//! Where payloads come from.
//!
//! In the browser that is the `/get_model_data/{id}` endpoint, fetched with `gloo-net`.
//! Native builds read the same JSON from a directory laid out like the server's URL space.

use futures::FutureExt as _;

use crate::error::PreviewError;
use crate::payload::PreviewPayload;
#[cfg(target_arch = "wasm32")]
use crate::payload::server_error_message;

#[cfg(target_arch = "wasm32")]
pub type PayloadFuture =
    futures::future::LocalBoxFuture<'static, Result<PreviewPayload, PreviewError>>;
#[cfg(not(target_arch = "wasm32"))]
pub type PayloadFuture = futures::future::BoxFuture<'static, Result<PreviewPayload, PreviewError>>;

/// Something that can answer "what should be shown for this id?".
pub trait PayloadSource: Send + Sync {
    fn fetch(&self, id: &str) -> PayloadFuture;
}

/// Answers from a fixed table. Handy for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: Vec<(String, Result<String, PreviewError>)>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `id`, as if the server answered 200.
    pub fn with_body(mut self, id: &str, body: impl Into<String>) -> Self {
        self.entries.push((id.to_owned(), Ok(body.into())));
        self
    }

    /// Fail requests for `id` with `error`.
    pub fn with_error(mut self, id: &str, error: PreviewError) -> Self {
        self.entries.push((id.to_owned(), Err(error)));
        self
    }
}

impl PayloadSource for StaticSource {
    fn fetch(&self, id: &str) -> PayloadFuture {
        let answer = self
            .entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| Err(PreviewError::http_status(404, "Order not found")));
        let fut = async move { PreviewPayload::from_json(&answer?) };
        #[cfg(target_arch = "wasm32")]
        return fut.boxed_local();
        #[cfg(not(target_arch = "wasm32"))]
        return fut.boxed();
    }
}

/// `GET {base}/get_model_data/{id}`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: String,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

#[cfg(target_arch = "wasm32")]
impl PayloadSource for HttpSource {
    fn fetch(&self, id: &str) -> PayloadFuture {
        use gloo_net::http::Request;

        let url = format!("{}/get_model_data/{id}", self.base.trim_end_matches('/'));
        async move {
            log::debug!("GET {url}");
            let response = Request::get(&url)
                .send()
                .await
                .map_err(|e| PreviewError::transport(e.to_string()))?;
            let status = response.status();
            log::debug!("response status: {status}");
            let body = response
                .text()
                .await
                .map_err(|e| PreviewError::transport(e.to_string()))?;
            if !response.ok() {
                return Err(PreviewError::http_status(
                    status,
                    server_error_message(&body).unwrap_or_default(),
                ));
            }
            PreviewPayload::from_json(&body)
        }
        .boxed_local()
    }
}

/// Reads `{root}/get_model_data/{id}` or `{root}/{id}.json`; images live under
/// `{root}/static/uploads`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl DirectorySource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Prefix for image URIs, understood by the `file://` image loader.
    pub fn asset_base(&self) -> String {
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        format!("file://{}", root.display())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PayloadSource for DirectorySource {
    fn fetch(&self, id: &str) -> PayloadFuture {
        if !is_plain_id(id) {
            let err = PreviewError::http_status(400, format!("invalid model id {id:?}"));
            return async move { Err(err) }.boxed();
        }
        let candidates = [
            self.root.join("get_model_data").join(id),
            self.root.join(format!("{id}.json")),
        ];
        let id = id.to_owned();
        async move {
            let Some(path) = candidates.iter().find(|p| p.is_file()) else {
                return Err(PreviewError::http_status(404, format!("no model data for {id}")));
            };
            log::debug!("reading {}", path.display());
            let body = std::fs::read_to_string(path)
                .map_err(|e| PreviewError::transport(format!("{}: {e}", path.display())))?;
            PreviewPayload::from_json(&body)
        }
        .boxed()
    }
}

/// An id names exactly one entry inside the data directory.
#[cfg(not(target_arch = "wasm32"))]
fn is_plain_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', ':', '\0'])
}
