//! Shared types for the docsum pipeline: S3 key conventions and the
//! invocation payloads exchanged between the proxy and the agent runtime.

pub mod invocation;
pub mod key;

pub use invocation::{InvocationMode, InvocationRequest, InvocationResult, TaskStatus};
pub use key::{
    KeyError, ObjectKey, SUPPORTED_EXTENSIONS, decode_event_key, file_extension,
    is_supported_extension, is_upload_key, memory_namespace,
};
