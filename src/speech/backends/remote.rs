//! Network TTS backend using the Google Translate speech endpoint
//!
//! The endpoint returns MP3 for at most 100 characters per request, so
//! longer text is split into chunks and the MP3 segments are written
//! back to back into one file (MP3 frames concatenate cleanly).

use crate::speech::{RemoteEngine, RemoteRequest};
use crate::text::{ensure_parent_dir, split_into_chunks};
use crate::{Result, TtsError};
use log::debug;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Longest text the endpoint accepts per request
pub const MAX_CHUNK_CHARS: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// The endpoint rejects clients that don't look like a browser
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Google Translate TTS client
pub struct GoogleTranslateEngine {
    client: Client,
}

impl GoogleTranslateEngine {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TtsError::Synthesis(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn endpoint(region: &str) -> String {
        format!("https://translate.google.{}/translate_tts", region)
    }

    fn query(
        request: &RemoteRequest<'_>,
        chunk: &str,
        idx: usize,
        total: usize,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("ie", "UTF-8".to_string()),
            ("client", "tw-ob".to_string()),
            ("tl", request.lang.to_string()),
            ("q", chunk.to_string()),
            ("idx", idx.to_string()),
            ("total", total.to_string()),
            ("textlen", chunk.chars().count().to_string()),
        ];
        if request.slow {
            query.push(("ttsspeed", "0.3".to_string()));
        }
        query
    }

    fn fetch_chunk(
        &self,
        request: &RemoteRequest<'_>,
        chunk: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>> {
        debug!("Fetching chunk {}/{} ({} chars)", idx + 1, total, chunk.chars().count());

        let response = self
            .client
            .get(Self::endpoint(request.region))
            .query(&Self::query(request, chunk, idx, total))
            .send()
            .map_err(|e| TtsError::Synthesis(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::Synthesis(format!(
                "Speech service returned {} for language '{}'",
                status, request.lang
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| TtsError::Synthesis(format!("Failed to read audio: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

impl RemoteEngine for GoogleTranslateEngine {
    fn render(&self, request: &RemoteRequest<'_>, path: &Path) -> Result<()> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(TtsError::Synthesis("No text to speak".to_string()));
        }

        let chunks = split_into_chunks(text, MAX_CHUNK_CHARS);
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(request, chunk, idx, chunks.len())?);
        }

        ensure_parent_dir(path)?;
        fs::write(path, &audio)?;
        debug!("Wrote {} bytes of MP3 to {:?}", audio.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slow: bool) -> RemoteRequest<'static> {
        RemoteRequest {
            text: "Bonjour",
            lang: "fr",
            region: "fr",
            slow,
        }
    }

    #[test]
    fn test_endpoint_uses_region() {
        assert_eq!(
            GoogleTranslateEngine::endpoint("co.uk"),
            "https://translate.google.co.uk/translate_tts"
        );
    }

    #[test]
    fn test_query_parameters() {
        let query = GoogleTranslateEngine::query(&request(false), "Bonjour", 0, 1);
        assert!(query.contains(&("tl", "fr".to_string())));
        assert!(query.contains(&("q", "Bonjour".to_string())));
        assert!(query.contains(&("client", "tw-ob".to_string())));
        assert!(query.contains(&("textlen", "7".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "ttsspeed"));
    }

    #[test]
    fn test_slow_adds_speed() {
        let query = GoogleTranslateEngine::query(&request(true), "Bonjour", 0, 1);
        assert!(query.contains(&("ttsspeed", "0.3".to_string())));
    }

    #[test]
    fn test_blank_text_is_rejected_offline() {
        let engine = GoogleTranslateEngine::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp3");
        let blank = RemoteRequest {
            text: "   ",
            ..request(false)
        };

        assert!(matches!(engine.render(&blank, &path), Err(TtsError::Synthesis(_))));
        assert!(!path.exists());
    }
}
