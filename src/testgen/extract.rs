//! extract.rs
//!
//! Pulls test code out of a model reply and decides whether it is safe to
//! write over the existing test file.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    /// Only reject empty code.
    Lenient,
    /// Must start with `#include` and define `main(`.
    #[default]
    Strict,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n(.*?)```").expect("fence regex")
    })
}

fn entry_point_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmain\s*\(").expect("entry point regex"))
}

/// Payload of the last fenced block, or the whole reply when there is none.
/// Always trimmed.
pub fn extract_code(reply: &str) -> String {
    match fence_re().captures_iter(reply).last() {
        Some(caps) => caps[1].trim().to_string(),
        None => reply.trim().to_string(),
    }
}

/// Returns the reason the code was rejected, if any.
pub fn validate(code: &str, level: Validation) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("empty test code".into());
    }

    if level == Validation::Lenient {
        return Ok(());
    }

    if !code.trim_start().starts_with("#include") {
        return Err("does not begin with an #include directive".into());
    }

    if !entry_point_re().is_match(code) {
        return Err("no main() entry point".into());
    }

    Ok(())
}
