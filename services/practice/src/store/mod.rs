//! Key-value persistence for practice records.
//!
//! # Purpose
//! Every record lives as a JSON blob under a string key whose prefix names the
//! entity type (`booking_`, `blog_article_`). Listing is a prefix scan.
//!
//! # Notes
//! There are no cross-key transactions and no compare-and-swap: concurrent
//! writers to the same key race and the last write wins.
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("malformed record at {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
    /// Values of every key starting with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<Value>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Typed view over one key namespace of a [`KvStore`].
pub struct Collection<T> {
    store: Arc<dyn KvStore>,
    prefix: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            prefix: self.prefix,
            _record: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KvStore>, prefix: &'static str) -> Self {
        Self {
            store,
            prefix,
            _record: PhantomData,
        }
    }

    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        let key = self.key(id);
        match self.store.get(&key).await? {
            Some(value) => decode(&key, value).map(Some),
            None => Ok(None),
        }
    }

    pub async fn put(&self, id: &str, record: &T) -> StoreResult<()> {
        let key = self.key(id);
        let value = serde_json::to_value(record).map_err(|source| StoreError::Serialization {
            key: key.clone(),
            source,
        })?;
        self.store.set(&key, value).await
    }

    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&self.key(id)).await
    }

    pub async fn list(&self) -> StoreResult<Vec<T>> {
        self.store
            .scan_prefix(self.prefix)
            .await?
            .into_iter()
            .map(|value| decode(self.prefix, value))
            .collect()
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}
