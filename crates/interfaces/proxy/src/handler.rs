//! Turns one S3 event notification into runtime invocations.

use docsum_core::{
    InvocationMode, InvocationRequest, TaskStatus, file_extension, is_supported_extension,
    is_upload_key,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::event::{S3EventNotification, S3EventRecord};
use crate::invoker::RuntimeInvoker;

pub const NO_RECORDS_MESSAGE: &str = "no records to process";
const MISSING_LOCATION: &str = "bucket name or object key missing";

/// Lambda response.  `body` is the [`ProcessingReport`] as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub processed: Vec<ProcessedEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    pub bucket: String,
    pub key: String,
    pub summary_key: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub bucket: String,
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub bucket: String,
    pub key: String,
    pub error: String,
}

impl ProcessingReport {
    /// 207 (Multi-Status) as soon as one record failed.
    pub fn status_code(&self) -> u16 {
        if self.errors.is_empty() { 200 } else { 207 }
    }

    pub fn into_response(self) -> ProxyResponse {
        let status_code = self.status_code();
        let body = serde_json::to_string(&self).unwrap_or_else(|e| {
            format!(r#"{{"processed":[],"skipped":[],"errors":[{{"bucket":"","key":"","error":"report encoding failed: {e}"}}]}}"#)
        });
        ProxyResponse { status_code, body }
    }
}

enum Outcome {
    Processed(ProcessedEntry),
    Skipped(SkippedEntry),
    Failed(ErrorEntry),
}

/// Forward every eligible upload in `notification` to the runtime.
///
/// Records are handled one after another; a failing record never stops
/// the rest of the batch.
pub async fn handle_event(
    notification: &S3EventNotification,
    invoker: &dyn RuntimeInvoker,
    mode: InvocationMode,
) -> ProxyResponse {
    info!(records = notification.records.len(), mode = mode.as_str(), "event received");

    if notification.records.is_empty() {
        warn!("{NO_RECORDS_MESSAGE}");
        return ProcessingReport {
            message: Some(NO_RECORDS_MESSAGE.to_string()),
            ..Default::default()
        }
        .into_response();
    }

    let mut report = ProcessingReport::default();
    for record in &notification.records {
        match process_record(record, invoker, mode).await {
            Outcome::Processed(entry) => report.processed.push(entry),
            Outcome::Skipped(entry) => report.skipped.push(entry),
            Outcome::Failed(entry) => report.errors.push(entry),
        }
    }

    info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        errors = report.errors.len(),
        "event handled"
    );
    report.into_response()
}

async fn process_record(
    record: &S3EventRecord,
    invoker: &dyn RuntimeInvoker,
    mode: InvocationMode,
) -> Outcome {
    let bucket = record.bucket_name();
    let key = record.object_key();
    info!(%bucket, %key, "record");

    if bucket.is_empty() || key.is_empty() {
        error!(%bucket, %key, "{MISSING_LOCATION}");
        return Outcome::Failed(ErrorEntry {
            bucket,
            key,
            error: MISSING_LOCATION.to_string(),
        });
    }

    if !is_supported_extension(&key) {
        let reason = format!("unsupported file extension: {:?}", file_extension(&key));
        info!(%bucket, %key, %reason, "skipping");
        return Outcome::Skipped(SkippedEntry { bucket, key, reason });
    }

    if !is_upload_key(&key) {
        let reason = "not under an uploads/ directory".to_string();
        info!(%bucket, %key, %reason, "skipping");
        return Outcome::Skipped(SkippedEntry { bucket, key, reason });
    }

    let request = InvocationRequest::new(bucket.clone(), key.clone(), mode);
    match invoker.invoke(&request).await {
        Ok(result) if result.success => {
            info!(%bucket, %key, summary_key = result.summary_key.as_deref().unwrap_or(""), "runtime accepted document");
            Outcome::Processed(ProcessedEntry {
                bucket,
                key,
                summary_key: result.summary_key,
                status: result.status,
            })
        }
        Ok(result) => {
            error!(%bucket, %key, message = %result.message, "runtime reported failure");
            Outcome::Failed(ErrorEntry {
                bucket,
                key,
                error: result.message,
            })
        }
        Err(e) => {
            error!(%bucket, %key, error = %format!("{e:#}"), "runtime invocation failed");
            Outcome::Failed(ErrorEntry {
                bucket,
                key,
                error: format!("{e:#}"),
            })
        }
    }
}
