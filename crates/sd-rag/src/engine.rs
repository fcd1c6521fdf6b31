use std::sync::Arc;

use sd_protocol::RetrievedMatch;

use crate::embeddings::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::index::FlatIndex;
use crate::llm::ChatModel;

const SYSTEM_PROMPT: &str = "You answer questions about a business using ONLY the spreadsheet \
context provided. If the context does not contain the answer, say you don't know and reference \
the closest rows by their [Row N] tags. Do not invent facts.";

/// A generated answer plus the rows it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub matches: Vec<RetrievedMatch>,
}

/// Immutable retrieval + generation engine over one built index.
///
/// A new engine is constructed for every rebuild; instances are shared
/// read-only behind an `Arc` and never mutated.
pub struct AnswerEngine {
    index: FlatIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    top_k: usize,
    temperature: f32,
}

impl AnswerEngine {
    pub fn new(
        index: FlatIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        top_k: usize,
        temperature: f32,
    ) -> RagResult<Self> {
        if !index.is_compatible(embedder.model_name()) {
            return Err(RagError::Incompatible(format!(
                "index built with '{}', embedder is '{}'",
                index.model(),
                embedder.model_name()
            )));
        }
        Ok(Self {
            index,
            embedder,
            chat,
            top_k: top_k.max(1),
            temperature,
        })
    }

    pub fn indexed_rows(&self) -> usize {
        self.index.len()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The `k` rows closest to `question`, best first.
    pub async fn retrieve(&self, question: &str, k: usize) -> RagResult<Vec<RetrievedMatch>> {
        let query = self.embedder.embed(question).await?;
        self.index.search(&query, k)
    }

    /// Retrieve context and ask the chat model to answer from it alone.
    pub async fn ask(&self, question: &str) -> RagResult<Answer> {
        let matches = self.retrieve(question, self.top_k).await?;
        let user = user_prompt(question, &matches);
        let text = self
            .chat
            .complete(SYSTEM_PROMPT, &user, self.temperature)
            .await?;
        tracing::debug!(matches = matches.len(), "answer generated");
        Ok(Answer { text, matches })
    }
}

fn context_block(matches: &[RetrievedMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("[Row {}] {}", m.row, m.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn user_prompt(question: &str, matches: &[RetrievedMatch]) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\nProvide a concise answer with row refs.",
        context_block(matches),
        question.trim()
    )
}
