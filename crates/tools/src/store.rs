//! Blob storage seam.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("storage error ({code}): {message}")]
    Service { code: String, message: String },
}

impl StoreError {
    fn service<E>(err: &aws_sdk_s3::error::SdkError<E>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        Self::Service {
            code: err.code().unwrap_or("Unknown").to_string(),
            message: DisplayErrorContext(err).to_string(),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Size in bytes of the object.
    async fn content_length(&self, bucket: &str, key: &str) -> Result<u64, StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &[(&str, &str)],
    ) -> Result<(), StoreError>;
}

// ── S3 ───────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn content_length(&self, bucket: &str, key: &str) -> Result<u64, StoreError> {
        let head = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_not_found() => StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                },
                _ => StoreError::service(&err),
            })?;
        Ok(head.content_length().unwrap_or(0).max(0) as u64)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_no_such_key() => StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                },
                _ => StoreError::service(&err),
            })?;
        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Service {
                code: "BodyRead".to_string(),
                message: e.to_string(),
            })?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &[(&str, &str)],
    ) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body));
        for (k, v) in metadata {
            request = request.metadata(*k, *v);
        }
        request
            .send()
            .await
            .map_err(|err| StoreError::service(&err))?;
        Ok(())
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "test-support"))]
pub use memory::{InMemoryObjectStore, StoredObject};

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StoredObject {
        pub body: Vec<u8>,
        pub content_type: Option<String>,
        pub metadata: HashMap<String, String>,
    }

    /// Map-backed store for tests.  `fail_puts` makes every `put` fail with a
    /// service error.
    #[derive(Default)]
    pub struct InMemoryObjectStore {
        objects: Mutex<HashMap<(String, String), StoredObject>>,
        fail_puts: bool,
    }

    impl InMemoryObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_puts() -> Self {
            Self {
                fail_puts: true,
                ..Self::default()
            }
        }

        pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
            self.lock().insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    body: body.into(),
                    content_type: None,
                    metadata: HashMap::new(),
                },
            );
        }

        pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
            self.lock()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }

        pub fn text(&self, bucket: &str, key: &str) -> Option<String> {
            self.object(bucket, key)
                .and_then(|o| String::from_utf8(o.body).ok())
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), StoredObject>> {
            self.objects.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn missing(bucket: &str, key: &str) -> StoreError {
            StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for InMemoryObjectStore {
        async fn content_length(&self, bucket: &str, key: &str) -> Result<u64, StoreError> {
            self.object(bucket, key)
                .map(|o| o.body.len() as u64)
                .ok_or_else(|| Self::missing(bucket, key))
        }

        async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
            self.object(bucket, key)
                .map(|o| o.body)
                .ok_or_else(|| Self::missing(bucket, key))
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            body: Vec<u8>,
            content_type: &str,
            metadata: &[(&str, &str)],
        ) -> Result<(), StoreError> {
            if self.fail_puts {
                return Err(StoreError::Service {
                    code: "AccessDenied".to_string(),
                    message: format!("put denied for s3://{bucket}/{key}"),
                });
            }
            self.lock().insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    body,
                    content_type: Some(content_type.to_string()),
                    metadata: metadata
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips_metadata() {
        let store = InMemoryObjectStore::new();
        store
            .put("b", "k", b"hello".to_vec(), "text/plain", &[("a", "1")])
            .await
            .unwrap();
        assert_eq!(store.content_length("b", "k").await.unwrap(), 5);
        let obj = store.object("b", "k").unwrap();
        assert_eq!(obj.content_type.as_deref(), Some("text/plain"));
        assert_eq!(obj.metadata.get("a").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn missing_objects_report_location() {
        let store = InMemoryObjectStore::new();
        let err = store.get("b", "nope.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.to_string(), "object not found: s3://b/nope.txt");
    }
}
