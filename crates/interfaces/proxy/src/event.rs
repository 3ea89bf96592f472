//! The parts of an S3 event notification the proxy reads.
//!
//! Every field is optional: a malformed record is reported per record
//! instead of failing the whole batch.

use docsum_core::decode_event_key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3EventNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: Option<S3Bucket>,
    #[serde(default)]
    pub object: Option<S3Object>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Object {
    /// URL-encoded as delivered by S3 (`+` for spaces).
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl S3EventRecord {
    /// Bucket name, or `""` when absent.
    pub fn bucket_name(&self) -> String {
        self.s3
            .as_ref()
            .and_then(|s3| s3.bucket.as_ref())
            .and_then(|b| b.name.clone())
            .unwrap_or_default()
    }

    /// Decoded object key, or `""` when absent.
    pub fn object_key(&self) -> String {
        self.s3
            .as_ref()
            .and_then(|s3| s3.object.as_ref())
            .and_then(|o| o.key.as_deref())
            .map(decode_event_key)
            .unwrap_or_default()
    }
}
