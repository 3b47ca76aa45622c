//! User interaction.
//!
//! Operations never touch stdin directly; they ask a [`Prompter`]. The
//! terminal implementation reads answers line by line, [`AutoConfirm`] answers
//! yes to every confirmation and is selected by `--yes`.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::PromptError;

/// Result of an operation that asks before doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Declined,
}

pub trait Prompter {
    /// Print informational text (menus, warnings addressed to the user).
    fn show(&mut self, text: &str) -> Result<(), PromptError>;

    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError>;

    /// Ask the user to type `phrase` exactly, for irreversible actions.
    fn confirm_phrase(&mut self, question: &str, phrase: &str) -> Result<bool, PromptError>;

    /// Read one line of input. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError>;
}

/// Line-oriented prompter over any reader/writer pair.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
    attached: bool,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let attached = stdin.is_terminal();
        Self::new(stdin.lock(), io::stdout(), attached)
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// `attached` says whether a person is on the other end; confirmations
    /// fail with [`PromptError::NoInteractiveTerminal`] when it is false.
    pub fn new(input: R, output: W, attached: bool) -> Self {
        Self {
            input,
            output,
            attached,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Consume the prompter, returning what was written to it.
    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<String>, PromptError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn show(&mut self, text: &str) -> Result<(), PromptError> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        if !self.attached {
            return Err(PromptError::NoInteractiveTerminal);
        }
        let answer = self.ask(&format!("{question} [y/N] "))?;
        Ok(matches!(
            answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }

    fn confirm_phrase(&mut self, question: &str, phrase: &str) -> Result<bool, PromptError> {
        if !self.attached {
            return Err(PromptError::NoInteractiveTerminal);
        }
        let answer = self.ask(&format!("{question}\nType {phrase} to continue: "))?;
        Ok(answer.as_deref() == Some(phrase))
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError> {
        self.ask(prompt)
    }
}

/// Answers yes to every confirmation; menu input still comes from `inner`.
pub struct AutoConfirm<P> {
    inner: P,
}

impl<P: Prompter> AutoConfirm<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Prompter> Prompter for AutoConfirm<P> {
    fn show(&mut self, text: &str) -> Result<(), PromptError> {
        self.inner.show(text)
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        log::info!("{question} [assuming yes]");
        Ok(true)
    }

    fn confirm_phrase(&mut self, question: &str, _phrase: &str) -> Result<bool, PromptError> {
        log::info!("{question} [assuming yes]");
        Ok(true)
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError> {
        self.inner.read_line(prompt)
    }
}
