use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentifyError {
    #[error("identification request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("identification service answered {0}")]
    Status(u16),
    #[error("identification response is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Remote face identification.
///
/// Takes one JPEG-encoded face crop and returns the person's display name,
/// or `None` when the service does not recognise the face.
pub trait IdentificationClient: Send + Sync {
    fn identify(&self, jpeg: &[u8]) -> Result<Option<String>, IdentifyError>;
}
