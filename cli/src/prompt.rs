use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use toolloop_core::agent::LineSource;
use toolloop_core::agent::chat::QUIT_SENTINEL;
use tracing::warn;

/// Terminal line editing with history persisted under the toolloop directory.
pub struct ReadlineSource {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl ReadlineSource {
    pub fn new(history: Option<PathBuf>) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history {
            // First run has no history yet.
            let _ = editor.load_history(path);
        }
        Ok(Self { editor, history })
    }
}

impl LineSource for ReadlineSource {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Some(line)
            }
            // Ctrl-C behaves like typing the quit word.
            Err(ReadlineError::Interrupted) => Some(QUIT_SENTINEL.to_string()),
            Err(ReadlineError::Eof) => None,
            Err(e) => {
                warn!("input error: {e}");
                None
            }
        }
    }
}

impl Drop for ReadlineSource {
    fn drop(&mut self) {
        if let Some(path) = &self.history
            && let Err(e) = self.editor.save_history(path)
        {
            warn!("failed to save history to {}: {e}", path.display());
        }
    }
}
