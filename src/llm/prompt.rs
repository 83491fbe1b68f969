use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Instruction block loaded from the prompt YAML.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PromptSpec {
    pub language: Option<String>,
    pub objective: Option<String>,
    pub requirements: Option<Vec<String>>,
}

impl PromptSpec {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read prompt file {}: {}", path.display(), e))?;
        Self::parse(&raw).map_err(|e| format!("Invalid prompt file {}: {}", path.display(), e))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| e.to_string())
    }

    /// Labeled plain-text form, requirements kept in file order.
    pub fn flatten(&self) -> String {
        let mut parts = Vec::new();

        if let Some(lang) = &self.language {
            parts.push(format!("Language: {}", lang));
        }
        if let Some(obj) = &self.objective {
            parts.push(format!("Objective: {}", obj));
        }
        if let Some(reqs) = &self.requirements {
            parts.push("Requirements:".to_string());
            parts.extend(reqs.iter().map(|r| format!("- {}", r)));
        }

        parts.join("\n")
    }
}

/* ============================================================
   Model prompts
   ============================================================ */

/// Instruction followed by the source in a fenced block.
pub fn build_prompt(instruction: &str, code: &str) -> String {
    format!("{}\n\n```c\n{}\n```", instruction, code)
}

pub fn repair_instruction(code: &str, broken_test: &str, compiler_logs: &str) -> String {
    format!(
        "The following C unit test code failed to compile. Please correct it.\n\
         \n\
         ### Original Code\n\
         {code}\n\
         \n\
         ### Broken Test Code\n\
         {broken_test}\n\
         \n\
         ### Compiler Logs\n\
         {compiler_logs}\n\
         \n\
         Return corrected C unit tests using assert.h wrapped in int main(). No explanation.\n"
    )
}

/// Last `max` characters of `s`, on a char boundary.
pub fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }

    let skip = count - max;
    let start = s
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_labels_and_order() {
        let spec = PromptSpec::parse(
            r#"
language: C
objective: Write unit tests for every function
requirements:
  - Use assert.h
  - Wrap tests in int main()
  - Do not redefine functions under test
"#,
        )
        .unwrap();

        assert_eq!(
            spec.flatten(),
            "Language: C\n\
             Objective: Write unit tests for every function\n\
             Requirements:\n\
             - Use assert.h\n\
             - Wrap tests in int main()\n\
             - Do not redefine functions under test"
        );
    }

    #[test]
    fn absent_fields_are_omitted() {
        let spec = PromptSpec::parse("objective: cover edge cases\n").unwrap();
        assert_eq!(spec.flatten(), "Objective: cover edge cases");

        assert_eq!(PromptSpec::parse("").unwrap().flatten(), "");
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(PromptSpec::parse("requirements: [unterminated").is_err());
    }

    #[test]
    fn prompt_fences_source() {
        let p = build_prompt("Language: C", "int add(int a, int b);");
        assert_eq!(p, "Language: C\n\n```c\nint add(int a, int b);\n```");
    }

    #[test]
    fn repair_instruction_embeds_all_parts() {
        let p = repair_instruction("int add();", "int main( {", "error: expected ')'");

        assert!(p.starts_with("The following C unit test code failed to compile."));
        assert!(p.contains("### Original Code\nint add();\n"));
        assert!(p.contains("### Broken Test Code\nint main( {\n"));
        assert!(p.contains("### Compiler Logs\nerror: expected ')'\n"));
        assert!(p.trim_end().ends_with("No explanation."));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail_chars("short", 10), "short");
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ééééé", 2), "éé");

        let long = "x".repeat(5000);
        assert_eq!(tail_chars(&long, 1000).len(), 1000);
    }
}
