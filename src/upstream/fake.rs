//! Fake vision client
//!
//! Returns canned responses, matched by a substring of the user's note.
//! Lets the analysis flow run without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::UpstreamError;
use super::VisionClient;

#[derive(Debug, Default)]
pub struct FakeVisionClient {
    /// Note substring -> response
    responses: RwLock<HashMap<String, String>>,
    default_response: Option<String>,
    /// When set, every call fails with this transport message
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FakeVisionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that answers every request with `response`
    pub fn with_response(response: &str) -> Self {
        Self {
            default_response: Some(response.to_string()),
            ..Self::default()
        }
    }

    /// Client whose every call fails
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Answer with `response` when the user note contains `note_contains`
    pub fn add_response(&self, note_contains: &str, response: &str) {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(note_contains.to_string(), response.to_string());
        }
    }

    /// Number of analyze calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for FakeVisionClient {
    async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
        user_note: Option<&str>,
    ) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(bytes = image.len(), mime_type, "Fake vision analyze");

        if let Some(message) = &self.failure {
            return Err(UpstreamError::Transport(message.clone()));
        }

        if let Some(note) = user_note {
            let responses = self
                .responses
                .read()
                .map_err(|_| UpstreamError::Transport("fake client lock poisoned".to_string()))?;
            if let Some((_, response)) = responses.iter().find(|(k, _)| note.contains(k.as_str())) {
                return Ok(response.clone());
            }
        }

        self.default_response
            .clone()
            .ok_or_else(|| UpstreamError::Transport("no fake response registered".to_string()))
    }

    fn model_name(&self) -> &str {
        "fake-vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_note_match_beats_default() {
        let client = FakeVisionClient::with_response("Total Calories: 100");
        client.add_response("keto", "Total Calories: 700");

        let keto = client.analyze(b"img", "image/png", Some("I'm on a keto diet")).await.unwrap();
        assert_eq!(keto, "Total Calories: 700");

        let plain = client.analyze(b"img", "image/png", None).await.unwrap();
        assert_eq!(plain, "Total Calories: 100");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = FakeVisionClient::failing("connection reset");
        let err = client.analyze(b"img", "image/jpeg", None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(m) if m == "connection reset"));
    }

    #[tokio::test]
    async fn test_no_response_registered() {
        let client = FakeVisionClient::new();
        assert!(client.analyze(b"", "image/jpeg", Some("hello")).await.is_err());
    }
}
