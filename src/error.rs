/// Everything that can stop a preview from reaching the screen.
///
/// All variants end up as the viewport's fallback message; nothing here is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreviewError {
    /// Network failure or a non-2xx response from the model-data endpoint.
    #[error("{}", describe_transport(.status, .message))]
    Transport { status: Option<u16>, message: String },

    /// The response body was not JSON, or matched neither payload shape.
    #[error("invalid model data: {0}")]
    MalformedPayload(String),

    /// Geometry could not be turned into something renderable.
    #[error("could not build 3D model: {0}")]
    RenderConstruction(String),
}

impl PreviewError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { status: None, message: message.into() }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport { status: Some(status), message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::RenderConstruction(message.into())
    }
}

fn describe_transport(status: &Option<u16>, message: &str) -> String {
    match (*status, message.is_empty()) {
        (Some(code), true) => format!("HTTP error, status {code}"),
        (Some(code), false) => format!("HTTP error, status {code}: {message}"),
        (None, _) => format!("network error: {message}"),
    }
}
