//! Operator prompts. Everything interactive goes through [`Prompter`] so the
//! session flow can be driven by a script in tests.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

pub trait Prompter {
    /// Yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, question: &str) -> bool;
    /// Pick one of `options`; `None` when the operator gave no valid answer.
    fn choose(&mut self, title: &str, options: &[String]) -> Option<usize>;
    /// Secret input; `None` on end of input or when the operator cancelled.
    fn password(&mut self, prompt: &str) -> Option<String>;
    /// Block until the operator presses Enter.
    fn pause(&mut self, message: &str);
}

/// Prompts on stdout, answers from stdin. With `assume_yes` confirmations,
/// choices and pauses answer themselves; passwords are still asked.
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> bool {
        if self.assume_yes {
            println!("{question} (y/n): y");
            return true;
        }
        print!("{question} (y/n): ");
        let _ = io::stdout().flush();
        self.read_line()
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }

    fn choose(&mut self, title: &str, options: &[String]) -> Option<usize> {
        println!("{title}");
        for (idx, option) in options.iter().enumerate() {
            println!("{}. {}", idx + 1, option);
        }
        if self.assume_yes {
            println!("Using 1. {}", options.first()?);
            return Some(0);
        }
        print!("Enter editor number: ");
        let _ = io::stdout().flush();
        let choice = parse_choice(&self.read_line()?, options.len());
        if choice.is_none() {
            println!("Invalid choice");
        }
        choice
    }

    fn password(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = io::stdout().flush();
        if !io::stdin().is_terminal() {
            return self.read_line();
        }
        let secret = read_hidden().ok();
        println!();
        secret
    }

    fn pause(&mut self, message: &str) {
        if self.assume_yes {
            return;
        }
        print!("{message}");
        let _ = io::stdout().flush();
        let _ = self.read_line();
    }
}

/// One-based menu answer to a zero-based index.
pub fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let number: usize = answer.trim().parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}

fn read_hidden() -> io::Result<String> {
    terminal::enable_raw_mode()?;
    let secret = read_hidden_keys();
    terminal::disable_raw_mode()?;
    secret
}

fn read_hidden_keys() -> io::Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"));
            }
            KeyCode::Esc => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"));
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

/// Replays canned answers. Running out of answers behaves like end of input.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    pub confirms: std::collections::VecDeque<bool>,
    pub choices: std::collections::VecDeque<Option<usize>>,
    pub passwords: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn with_passwords<const N: usize>(passwords: [&str; N]) -> Self {
        Self {
            passwords: passwords.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.confirms.pop_front().unwrap_or(false)
    }

    fn choose(&mut self, title: &str, _options: &[String]) -> Option<usize> {
        self.asked.push(title.to_string());
        self.choices.pop_front().flatten()
    }

    fn password(&mut self, prompt: &str) -> Option<String> {
        self.asked.push(prompt.to_string());
        self.passwords.pop_front()
    }

    fn pause(&mut self, message: &str) {
        self.asked.push(message.to_string());
    }
}
