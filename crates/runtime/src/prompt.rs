//! Prompt assembly for the summarization conversation.

use docsum_tools::{READ_TEXT_FILE, SAVE_SUMMARY};

// ─── public entry points ─────────────────────────────────────────────────────

/// System prompt carrying the summary rules and the output layout.
pub fn system_prompt(language: &str) -> String {
    format!(
        "You are a document summarization assistant. Write every summary in {language}.\n\n\
         RULES:\n\
         - Keep the summary to about 300 characters.\n\
         - Use bullet points for key points.\n\
         - State only facts found in the document. Do not speculate.\n\
         - When related facts from earlier documents are given, point out what \
         changed or contradicts them.\n\
         - Use the {READ_TEXT_FILE} tool to read the document and the {SAVE_SUMMARY} \
         tool to store the finished summary.\n\n\
         OUTPUT FORMAT:\n\
         ## Summary\n\
         <about 300 characters>\n\n\
         ## Key points\n\
         - <point>\n\n\
         ## Extracted facts\n\
         - <one short, self-contained fact per line>"
    )
}

/// First user turn: which document to read and where the summary goes.
///
/// `facts_block` is inserted verbatim ahead of the instructions; pass an
/// empty string when no facts were retrieved.
pub fn user_prompt(bucket: &str, key: &str, summary_key: &str, facts_block: &str) -> String {
    let mut prompt = String::new();
    if !facts_block.is_empty() {
        prompt.push_str(facts_block);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "Summarize the document s3://{bucket}/{key}.\n\
         1. Read it with {READ_TEXT_FILE} (bucket: \"{bucket}\", key: \"{key}\").\n\
         2. Write the summary in the required format.\n\
         3. Save it with {SAVE_SUMMARY} (bucket: \"{bucket}\", key: \"{summary_key}\").\n\
         Reply with the summary once it is saved."
    ));
    prompt
}
