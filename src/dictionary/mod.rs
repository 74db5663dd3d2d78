pub mod jisho;
pub mod jmdict;

use async_trait::async_trait;

pub use jisho::JishoProvider;
pub use jmdict::JmdictProvider;

use crate::core::{
    KotomineError,
    MinerConfig,
    ProgressSink,
};

/// A dictionary backend that can resolve a word to a definition. Providers
/// are a closed set selected at construction time (offline file, online
/// API); the service below composes them.
#[async_trait]
pub trait DictionaryProvider: Send + Sync {
    /// Human-readable name, e.g. "JMdict (offline)".
    fn name(&self) -> &str;

    /// Whether the provider is ready to serve lookups.
    fn is_available(&self) -> bool;

    /// Load the provider's data. A missing or unparseable source fails with
    /// a setup error; the provider stays unavailable.
    async fn load(&mut self) -> Result<(), KotomineError>;

    /// Resolve one word to an HTML-formatted definition, or None if the
    /// provider has no entry. Never errors; transient failures are misses.
    async fn lookup(&self, word: &str) -> Option<String>;
}

enum ProviderChain {
    /// Classic first-match chain: every available provider is tried in
    /// order until one yields a definition.
    FirstMatch(Vec<Box<dyn DictionaryProvider>>),
    /// Legacy default-configuration policy: a loaded offline dictionary is
    /// authoritative, so an offline miss does NOT fall through to the
    /// online provider. Only a disabled (None) or unloaded offline
    /// provider sends lookups online.
    OfflineAuthoritative {
        offline: Option<Box<dyn DictionaryProvider>>,
        online: Box<dyn DictionaryProvider>,
    },
}

/// Resolves words to definitions through a provider chain.
pub struct DefinitionService {
    chain: ProviderChain,
}

impl DefinitionService {
    /// Build an explicit first-match chain.
    pub fn with_providers(providers: Vec<Box<dyn DictionaryProvider>>) -> Self {
        DefinitionService { chain: ProviderChain::FirstMatch(providers) }
    }

    /// Build the offline-authoritative pairing from arbitrary providers.
    /// `offline = None` means the offline dictionary is disabled.
    pub fn offline_authoritative(
        offline: Option<Box<dyn DictionaryProvider>>,
        online: Box<dyn DictionaryProvider>,
    ) -> Self {
        DefinitionService { chain: ProviderChain::OfflineAuthoritative { offline, online } }
    }

    /// Build from configuration defaults: JMdict offline (if enabled) with
    /// the Jisho API behind it, under the offline-authoritative policy.
    pub fn from_config(config: &MinerConfig) -> Self {
        let offline: Option<Box<dyn DictionaryProvider>> = config
            .use_offline_dict
            .then(|| {
                Box::new(JmdictProvider::new(config.jmdict_path.clone()))
                    as Box<dyn DictionaryProvider>
            });
        let online = Box::new(JishoProvider::new(
            config.jisho_api_url.clone(),
            std::time::Duration::from_secs_f64(config.jisho_delay),
        ));
        DefinitionService::offline_authoritative(offline, online)
    }

    /// Load every provider in the chain. Setup errors propagate; a caller
    /// that tolerates them can continue, leaving the failed provider
    /// unavailable (which routes lookups to the remaining providers).
    pub async fn load(&mut self) -> Result<(), KotomineError> {
        match &mut self.chain {
            ProviderChain::FirstMatch(providers) => {
                for provider in providers {
                    provider.load().await?;
                }
            }
            ProviderChain::OfflineAuthoritative { offline, online } => {
                online.load().await?;
                if let Some(offline) = offline {
                    offline.load().await?;
                }
            }
        }
        Ok(())
    }

    pub async fn get_definition(&self, word: &str) -> Option<String> {
        match &self.chain {
            ProviderChain::FirstMatch(providers) => {
                for provider in providers {
                    if !provider.is_available() {
                        continue;
                    }
                    if let Some(definition) = provider.lookup(word).await {
                        return Some(definition);
                    }
                }
                None
            }
            ProviderChain::OfflineAuthoritative { offline, online } => {
                if let Some(offline) = offline {
                    if offline.is_available() {
                        // A loaded offline dictionary is trusted: a miss
                        // here is final.
                        return offline.lookup(word).await;
                    }
                }
                online.lookup(word).await
            }
        }
    }

    /// Resolve a list of words, preserving input order and reporting
    /// per-word progress.
    pub async fn get_definitions_batch(
        &self,
        words: &[String],
        progress: Option<&dyn ProgressSink>,
    ) -> Vec<Option<String>> {
        if let Some(progress) = progress {
            progress.on_start(words.len(), "Fetching definitions");
        }

        let mut definitions = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let definition = self.get_definition(word).await;

            if let Some(progress) = progress {
                let message = if definition.is_some() {
                    format!("Definition found: {}", word)
                } else {
                    format!("No definition: {}", word)
                };
                progress.on_progress(i + 1, &message);
            }

            definitions.push(definition);
        }

        if let Some(progress) = progress {
            progress.on_complete();
        }

        definitions
    }
}
