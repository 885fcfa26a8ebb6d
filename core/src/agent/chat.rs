use crate::agent::AgentLoop;
use std::collections::VecDeque;
use std::io::Write;
use tracing::error;

pub const QUIT_SENTINEL: &str = "quit";
pub const USER_PROMPT: &str = "\n🧑 You: ";

/// Where the interactive loop gets its lines from. `None` means end of input.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Pre-scripted input, consumed front to back.
impl LineSource for VecDeque<String> {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.pop_front()
    }
}

pub fn is_quit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(QUIT_SENTINEL)
}

/// Reads queries until `quit` or end of input. Failures are printed inline and the
/// loop keeps prompting.
pub async fn run_chat_loop<S, W>(
    agent: &AgentLoop,
    source: &mut S,
    out: &mut W,
    thread_id: Option<&str>,
) -> std::io::Result<usize>
where
    S: LineSource + ?Sized,
    W: Write + ?Sized,
{
    writeln!(out, "Type your question, or '{QUIT_SENTINEL}' to exit.")?;
    let mut answered = 0;

    while let Some(line) = source.read_line(USER_PROMPT) {
        let query = line.trim();
        if is_quit(query) {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let result = match thread_id {
            Some(thread) => agent.process_in_thread(query, thread).await,
            None => agent.process(query).await,
        };

        match result {
            Ok(completion) => {
                answered += 1;
                writeln!(out, "\n🤖 AI: {}", completion.answer)?;
            }
            Err(e) => {
                error!("query failed: {e}");
                writeln!(out, "\n⚠️ Error: {e}")?;
            }
        }
        out.flush()?;
    }

    writeln!(out, "\n👋 Goodbye!")?;
    Ok(answered)
}
