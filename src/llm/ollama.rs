use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::llm::backend::{Generation, TestGenerator};
use crate::llm::prompt::build_prompt;

/// Blocking client for a local Ollama `/api/generate` endpoint.
pub struct Ollama {
    client: Client,
    endpoint: String,
    model: String,
}

impl Ollama {
    pub fn new(cfg: &LlmConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str) -> Generation {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let resp = match self.client.post(&self.endpoint).json(&body).send() {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Generation::Timeout,
            Err(e) => return Generation::Failed(e.to_string()),
        };

        let status = resp.status();
        let raw = match resp.text() {
            Ok(t) => t,
            Err(e) if e.is_timeout() => return Generation::Timeout,
            Err(e) => return Generation::Failed(e.to_string()),
        };

        if !status.is_success() {
            return Generation::Failed(format!("LLM error {}: {}", status, raw.trim()));
        }

        let json: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => return Generation::Failed(format!("invalid JSON from model: {}", e)),
        };

        match json.get("response").and_then(Value::as_str) {
            Some(text) => Generation::Text(text.to_string()),
            None => Generation::Failed("model reply has no `response` field".into()),
        }
    }
}

impl TestGenerator for Ollama {
    fn generate(&self, code: &str, instruction: &str) -> Generation {
        self.request(&build_prompt(instruction, code))
    }
}
