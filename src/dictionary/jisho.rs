use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::DictionaryProvider;
use crate::core::KotomineError;

#[derive(Debug, Deserialize)]
struct JishoResponse {
    #[serde(default)]
    data: Vec<JishoResult>,
}

#[derive(Debug, Deserialize)]
struct JishoResult {
    #[serde(default)]
    senses: Vec<JishoSense>,
}

#[derive(Debug, Deserialize)]
struct JishoSense {
    #[serde(default)]
    english_definitions: Vec<String>,
}

/// Online dictionary provider over the Jisho search API. A fixed delay is
/// slept before every request as a courtesy rate limit; network errors and
/// non-success responses are misses, never errors.
pub struct JishoProvider {
    client: Client,
    api_url: String,
    delay: Duration,
}

impl JishoProvider {
    pub fn new(api_url: String, delay: Duration) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        JishoProvider { client, api_url, delay }
    }

    fn format_response(response: JishoResponse) -> Option<String> {
        // Only the first result, capped at five senses
        let first = response.data.into_iter().next()?;

        let definitions: Vec<String> = first
            .senses
            .iter()
            .take(5)
            .enumerate()
            .filter(|(_, sense)| !sense.english_definitions.is_empty())
            .map(|(i, sense)| format!("{}. {}", i + 1, sense.english_definitions.join("; ")))
            .collect();

        if definitions.is_empty() {
            None
        } else {
            Some(definitions.join("<br>"))
        }
    }
}

#[async_trait]
impl DictionaryProvider for JishoProvider {
    fn name(&self) -> &str {
        "Jisho API"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn load(&mut self) -> Result<(), KotomineError> {
        Ok(())
    }

    async fn lookup(&self, word: &str) -> Option<String> {
        tokio::time::sleep(self.delay).await;

        let response = match self
            .client
            .get(&self.api_url)
            .query(&[("keyword", word)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(word, error = %e, "Jisho request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(word, status = %response.status(), "Jisho returned non-success");
            return None;
        }

        match response.json::<JishoResponse>().await {
            Ok(parsed) => Self::format_response(parsed),
            Err(e) => {
                debug!(word, error = %e, "Jisho response was not valid JSON");
                None
            }
        }
    }
}
