//! The docsum agent runtime.
//!
//! An HTTP service following the AgentCore Runtime contract.  Each
//! invocation names one uploaded document; the [`Summarizer`] reads it
//! through the model's tools, writes the summary back to S3 and feeds the
//! exchange to long-term memory.

pub mod prompt;
pub mod server;
pub mod summarizer;
pub mod tasks;
pub mod tool_loop;

#[cfg(test)]
mod testing;

pub use server::{AppState, handle_invocation, router, serve};
pub use summarizer::{Summarizer, SummarizerSettings};
pub use tasks::{PingResponse, PingStatus, TaskTracker};
pub use tool_loop::{ToolExecution, ToolLoopResult, run_tool_loop};
