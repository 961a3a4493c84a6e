use kbase_core::error::Result;
use kbase_core::traits::AnswerGenerator;

pub const NOT_FOUND_ANSWER: &str = "No relevant information was found in the uploaded documents.";

/// Prompt for an LLM that must answer from `context` only. Meant for
/// model-backed [`AnswerGenerator`] implementations; [`OfflineGenerator`]
/// answers without a prompt.
pub fn build_prompt(question: &str, context: &[String]) -> String {
    let context_text = if context.is_empty() {
        "(no documents matched)".to_string()
    } else {
        context.join("\n\n")
    };
    format!(
        "You are a helpful assistant. Use the CONTEXT below to answer the question concisely.\n\
         If the answer is not in the context, reply exactly: \"{NOT_FOUND_ANSWER}\"\n\n\
         CONTEXT:\n{context_text}\n\n\
         QUESTION:\n{}\n",
        question.trim()
    )
}

/// Generator used when no language model is wired in: quotes the best
/// matching chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl AnswerGenerator for OfflineGenerator {
    fn generate(&self, _question: &str, context: &[String]) -> Result<String> {
        Ok(match context.first() {
            Some(best) => format!("Most relevant passage from the uploaded documents:\n\n{best}"),
            None => NOT_FOUND_ANSWER.to_string(),
        })
    }
}
