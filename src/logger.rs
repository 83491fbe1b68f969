use crate::state::{LogLevel, LogLine, PipelineState, MAX_LOGS};

pub fn log(state: &mut PipelineState, level: LogLevel, msg: impl Into<String>) {
    if state.logs.len() >= MAX_LOGS {
        state.logs.pop_front();
    }

    let text = msg.into();
    if state.echo {
        println!("{} {}", prefix(level), text);
    }

    state.logs.push_back(LogLine { level, text });
}

/// Multi-line tool output (compiler diagnostics, test stdout) printed under a heading.
pub fn log_block(state: &mut PipelineState, level: LogLevel, heading: &str, body: &str) {
    let body = body.trim_end();
    if body.is_empty() {
        log(state, level, format!("{heading}: <empty>"));
    } else {
        log(state, level, format!("{heading}:\n{body}"));
    }
}

fn prefix(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "•",
        LogLevel::Success => "✅",
        LogLevel::Warn => "⚠️ ",
        LogLevel::Error => "❌",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_buffer_is_bounded() {
        let mut state = PipelineState::new();
        state.echo = false;

        for i in 0..(MAX_LOGS + 5) {
            log(&mut state, LogLevel::Info, format!("line {i}"));
        }

        assert_eq!(state.logs.len(), MAX_LOGS);
        assert_eq!(state.logs.front().unwrap().text, "line 5");
    }

    #[test]
    fn empty_block_is_marked() {
        let mut state = PipelineState::new();
        state.echo = false;

        log_block(&mut state, LogLevel::Info, "STDOUT", "  \n");
        assert_eq!(state.logs.back().unwrap().text, "STDOUT: <empty>");
    }
}
