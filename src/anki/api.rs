use std::{
    collections::HashMap,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};

use crate::core::KotomineError;

/// AnkiConnect response envelope: `error` non-null is the universal
/// failure signal.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NoteField {
    pub value: String,
    pub order: u32,
}

/// Subset of `notesInfo` output the pipeline reads.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    pub note_id: u64,
    pub model_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub fields: HashMap<String, NoteField>,
}

/// One note for `addNote`/`addNotes`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub deck_name: String,
    pub model_name: String,
    pub fields: HashMap<String, String>,
    pub tags: Vec<String>,
}

/// The AnkiConnect actions the pipeline consumes, as typed methods over the
/// `{action, version: 6, params}` envelope.
#[async_trait]
pub trait AnkiConnect: Send + Sync {
    async fn version(&self) -> Result<u32, KotomineError>;

    async fn deck_names(&self) -> Result<Vec<String>, KotomineError>;

    async fn model_names(&self) -> Result<Vec<String>, KotomineError>;

    async fn find_notes(&self, query: &str) -> Result<Vec<u64>, KotomineError>;

    async fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<NoteInfo>, KotomineError>;

    /// Store a base64-encoded media file under the given filename.
    async fn store_media_file(&self, filename: &str, data_b64: &str)
        -> Result<(), KotomineError>;

    /// Returns the created note id, or None when the note was rejected
    /// (e.g. as a duplicate) without an API error.
    async fn add_note(&self, note: NoteInput) -> Result<Option<u64>, KotomineError>;

    /// Returns one entry per submitted note; null entries are rejected
    /// notes (duplicates), not errors.
    async fn add_notes(&self, notes: Vec<NoteInput>) -> Result<Vec<Option<u64>>, KotomineError>;

    async fn delete_notes(&self, note_ids: &[u64]) -> Result<(), KotomineError>;
}

/// HTTP client for a local AnkiConnect endpoint.
pub struct HttpAnkiConnect {
    client: Client,
    url: String,
}

impl HttpAnkiConnect {
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        HttpAnkiConnect { client, url }
    }

    /// POST one action. Connection failures and undecodable responses are
    /// `AnkiConnection` (the caller cannot tell what state the store is
    /// in); an `error` field is `AnkiApi`; other transport failures keep
    /// their reqwest error.
    async fn invoke<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<Option<T>, KotomineError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), serde_json::Value::String(action.to_string()));
        body.insert("version".to_string(), serde_json::Value::Number(6.into()));
        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                KotomineError::AnkiConnection(
                    "Cannot connect to AnkiConnect. Is Anki running?".to_string(),
                )
            } else {
                KotomineError::from(e)
            }
        })?;

        let api: ApiResponse<T> = response.json().await.map_err(|e| {
            KotomineError::AnkiConnection(format!("Malformed AnkiConnect response: {}", e))
        })?;

        if let Some(error) = api.error {
            return Err(KotomineError::AnkiApi(error));
        }

        Ok(api.result)
    }
}

#[async_trait]
impl AnkiConnect for HttpAnkiConnect {
    async fn version(&self) -> Result<u32, KotomineError> {
        self.invoke("version", None, Some(Duration::from_secs(5))).await?.ok_or_else(|| {
            KotomineError::AnkiConnection("AnkiConnect version response missing result".to_string())
        })
    }

    async fn deck_names(&self) -> Result<Vec<String>, KotomineError> {
        Ok(self.invoke("deckNames", None, None).await?.unwrap_or_default())
    }

    async fn model_names(&self) -> Result<Vec<String>, KotomineError> {
        Ok(self.invoke("modelNames", None, None).await?.unwrap_or_default())
    }

    async fn find_notes(&self, query: &str) -> Result<Vec<u64>, KotomineError> {
        let params = serde_json::json!({ "query": query });
        Ok(self.invoke("findNotes", Some(params), None).await?.unwrap_or_default())
    }

    async fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<NoteInfo>, KotomineError> {
        let params = serde_json::json!({ "notes": note_ids });
        // Large collections can be slow to serialize on the Anki side
        let timeout = Some(Duration::from_secs(60));
        Ok(self.invoke("notesInfo", Some(params), timeout).await?.unwrap_or_default())
    }

    async fn store_media_file(
        &self,
        filename: &str,
        data_b64: &str,
    ) -> Result<(), KotomineError> {
        let params = serde_json::json!({ "filename": filename, "data": data_b64 });
        self.invoke::<String>("storeMediaFile", Some(params), None).await?;
        Ok(())
    }

    async fn add_note(&self, note: NoteInput) -> Result<Option<u64>, KotomineError> {
        let params = serde_json::json!({ "note": note });
        Ok(self.invoke("addNote", Some(params), None).await?.flatten())
    }

    async fn add_notes(
        &self,
        notes: Vec<NoteInput>,
    ) -> Result<Vec<Option<u64>>, KotomineError> {
        let params = serde_json::json!({ "notes": notes });
        let timeout = Some(Duration::from_secs(60));
        Ok(self.invoke("addNotes", Some(params), timeout).await?.unwrap_or_default())
    }

    async fn delete_notes(&self, note_ids: &[u64]) -> Result<(), KotomineError> {
        let params = serde_json::json!({ "notes": note_ids });
        self.invoke::<serde_json::Value>("deleteNotes", Some(params), None).await?;
        Ok(())
    }
}
