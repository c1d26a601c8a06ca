use serde_json::Value;

use crate::identification::domain::identification_client::{IdentificationClient, IdentifyError};
use crate::shared::constants::{FULL_NAME_FIELD, IDENTIFY_PATH};

/// Posts raw JPEG bytes to `<endpoint>/identify` and reads `FullName` from
/// the JSON reply. No retries and no authentication.
pub struct HttpIdentificationClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpIdentificationClient {
    pub fn new(endpoint: &str) -> Result<Self, IdentifyError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| IdentifyError::Transport(Box::new(e)))?;
        Ok(Self {
            client,
            url: identify_url(endpoint),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl IdentificationClient for HttpIdentificationClient {
    fn identify(&self, jpeg: &[u8]) -> Result<Option<String>, IdentifyError> {
        let response = self
            .client
            .post(&self.url)
            .body(jpeg.to_vec())
            .send()
            .map_err(|e| IdentifyError::Transport(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentifyError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .map_err(|e| IdentifyError::Transport(Box::new(e)))?;
        let value: Value = serde_json::from_slice(&body)?;
        Ok(value
            .get(FULL_NAME_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned))
    }
}

fn identify_url(endpoint: &str) -> String {
    format!("{}{IDENTIFY_PATH}", endpoint.trim_end_matches('/'))
}
