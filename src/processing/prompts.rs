//! Instructions sent to the language model.

use crate::llm::CompletionRequest;

const SUMMARY_SYSTEM: &str = "You are a helpful assistant that creates concise, informative \
summaries of web content.
Your summaries should:
- Be clear and concise
- Be 2-3 paragraphs long
- Capture the main points and key takeaways
- Be written in a clear, professional tone";

const TAGS_SYSTEM: &str = "You are a helpful assistant that extracts relevant tags from \
content summaries. Answer with a comma-separated list only.";

/// Request a streamed summary of `content`.
pub(crate) fn summary_request(content: &str) -> CompletionRequest {
    CompletionRequest {
        system: SUMMARY_SYSTEM.to_string(),
        prompt: format!("Please summarize the following content:\n\n{content}"),
    }
}

/// Request 3-5 tags describing `summary`.
pub(crate) fn tags_request(summary: &str) -> CompletionRequest {
    CompletionRequest {
        system: TAGS_SYSTEM.to_string(),
        prompt: format!(
            "Extract 3-5 short, relevant tags from this summary. Return only the tags separated \
             by commas, with no numbering or extra text.\n\nSummary: {summary}"
        ),
    }
}
