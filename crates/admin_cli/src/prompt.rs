//! Confirmation prompts read key by key with the terminal in raw mode.
use std::{error::Error, io::Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};

type PromptResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> PromptResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read one line from the terminal, echoing what is typed.
pub fn read_line(prompt: &str) -> PromptResult<String> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Esc => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Ok(String::new());
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print(ch))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

/// Yes/no question. Anything but an explicit yes counts as a refusal.
pub fn confirm(question: &str) -> PromptResult<bool> {
    let answer = read_line(&format!("{question} [y/N] "))?;
    Ok(is_yes(&answer))
}

/// Ask the user to retype `phrase` exactly.
pub fn confirm_phrase(warning: &str, phrase: &str) -> PromptResult<bool> {
    let mut out = std::io::stderr();
    execute!(out, Print(format!("{warning}\r\n")))?;
    let typed = read_line(&format!("Type \"{phrase}\" to continue: "))?;
    Ok(typed.trim() == phrase)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
