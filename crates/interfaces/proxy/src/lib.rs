//! S3 upload notifications in, agent runtime invocations out.
//!
//! The Lambda function receives `ObjectCreated` notifications, filters out
//! everything that is not a `.txt`/`.md` upload, and asks the runtime to
//! summarize the rest.  The runtime is reached either through the signed
//! AgentCore API ([`AgentCoreRuntimeInvoker`]) or over plain HTTP
//! ([`HttpRuntimeInvoker`]).

pub mod event;
pub mod handler;
pub mod invoker;

pub use event::{S3EventNotification, S3EventRecord};
pub use handler::{ProcessingReport, ProxyResponse, handle_event};
pub use invoker::{AgentCoreRuntimeInvoker, HttpRuntimeInvoker, RuntimeInvoker};
