//! Interactive REPL — readline editing with persistent history.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};

use quill_agent::AgentLoop;

use crate::helpers;

/// Exit commands (case-insensitive).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Run the interactive loop until the user exits.
pub async fn run(agent: AgentLoop) -> Result<()> {
    helpers::print_banner();
    println!("Type a message, or \"exit\" to quit.");
    println!();

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }

        let _ = editor.add_history_entry(&input);

        helpers::print_thinking();
        let response = agent.process_direct(trimmed).await;
        helpers::clear_thinking();
        helpers::print_response(&response);
    }

    save_history(&mut editor);
    Ok(())
}

fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let path = history_path();
    if path.exists() {
        let _ = editor.load_history(&path);
    }
    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = editor.save_history(&path);
}

fn history_path() -> std::path::PathBuf {
    quill_core::utils::get_data_path().join("history").join("cli_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands_match_case_insensitively() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("Quit"));
        assert!(is_exit_command("/EXIT"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("exits"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn history_lives_under_data_dir() {
        let path = history_path();
        assert!(path.ends_with("history/cli_history"));
    }
}
