//! Producer Module
//!
//! The computation behind every cached artifact, and the registry mapping key
//! families to their producer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::CacheKey;
use crate::error::ProducerError;

// == Producer ==
/// Computes the artifact for a key.
///
/// Must be a pure function of `key` and `args` so it can be re-run by the
/// sweeper without any request context.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, key: &CacheKey, args: &[String]) -> Result<Bytes, ProducerError>;
}

// == Fn Producer ==
/// Adapts an async closure into a [`Producer`].
pub struct FnProducer<F> {
    func: F,
}

impl<F, Fut> FnProducer<F>
where
    F: Fn(CacheKey, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, ProducerError>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Producer for FnProducer<F>
where
    F: Fn(CacheKey, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, ProducerError>> + Send + 'static,
{
    async fn produce(&self, key: &CacheKey, args: &[String]) -> Result<Bytes, ProducerError> {
        (self.func)(key.clone(), args.to_vec()).await
    }
}

/// Wraps an async closure as a shareable producer.
pub fn producer_fn<F, Fut>(func: F) -> Arc<dyn Producer>
where
    F: Fn(CacheKey, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, ProducerError>> + Send + 'static,
{
    Arc::new(FnProducer::new(func))
}

// == Producer Registry ==
/// Producers by key family (the key's view).
#[derive(Clone, Default)]
pub struct ProducerRegistry {
    producers: HashMap<String, Arc<dyn Producer>>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `producer` for every key whose view is `family`.
    pub fn register(&mut self, family: impl Into<String>, producer: Arc<dyn Producer>) -> &mut Self {
        self.producers.insert(family.into(), producer);
        self
    }

    pub fn get(&self, family: &str) -> Result<Arc<dyn Producer>, ProducerError> {
        self.producers
            .get(family)
            .cloned()
            .ok_or_else(|| ProducerError::Unregistered(family.to_string()))
    }

    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = self.producers.keys().map(String::as_str).collect();
        families.sort_unstable();
        families
    }
}

impl std::fmt::Debug for ProducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerRegistry")
            .field("families", &self.families())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_producer_receives_key_and_args() {
        let producer = producer_fn(|key: CacheKey, args: Vec<String>| async move {
            Ok(Bytes::from(format!("{}|{}", key, args.join(","))))
        });

        let key = CacheKey::new("home", "fi", None, 0);
        let value = producer
            .produce(&key, &["fi".to_string(), "0".to_string()])
            .await
            .unwrap();
        assert_eq!(value, Bytes::from_static(b"home_fi_0|fi,0"));
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = ProducerRegistry::new();
        registry.register(
            "home",
            producer_fn(|_, _| async { Ok(Bytes::from_static(b"ok")) }),
        );

        assert!(registry.get("home").is_ok());
        assert_eq!(registry.families(), vec!["home"]);
        assert!(matches!(
            registry.get("cat"),
            Err(ProducerError::Unregistered(family)) if family == "cat"
        ));
    }
}
