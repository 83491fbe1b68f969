use sha2::{Digest, Sha256};

/// What came back from one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// The request exceeded its deadline.
    Timeout,
    /// Transport or protocol failure.
    Failed(String),
}

impl Generation {
    /// Generated text; empty for timeouts and failures.
    pub fn text(&self) -> &str {
        match self {
            Generation::Text(t) => t,
            Generation::Timeout | Generation::Failed(_) => "",
        }
    }
}

pub trait TestGenerator {
    /// One request, no retries.
    fn generate(&self, code: &str, instruction: &str) -> Generation;
}

pub fn hash_prompt(prompt: &str) -> String {
    let mut h = Sha256::new();
    h.update(prompt.as_bytes());
    hex::encode(h.finalize())
}
