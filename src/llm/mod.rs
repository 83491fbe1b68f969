pub mod backend;
pub mod ollama;
pub mod prompt;
