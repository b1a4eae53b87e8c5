//! Password retries for encrypted archives.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal};

/// Attempts allowed per archive.
pub const MAX_PASSWORD_ATTEMPTS: u32 = 3;

/// Where an archive's password retry loop stands.
///
/// `NoAttempt → Trying(1) → … → Trying(max) → Success | Exhausted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    NoAttempt,
    /// The n-th attempt (1-based) is in flight.
    Trying(u32),
    Success(String),
    Exhausted,
}

#[derive(Debug)]
pub struct PasswordAttempts {
    state: AttemptState,
    max: u32,
}

impl PasswordAttempts {
    pub fn new(max: u32) -> Self {
        Self {
            state: AttemptState::NoAttempt,
            max,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Start the next attempt, returning its 1-based number, or `None` once
    /// the loop has finished.
    pub fn begin(&mut self) -> Option<u32> {
        let next = match self.state {
            AttemptState::NoAttempt => 1,
            AttemptState::Trying(n) if n < self.max => n + 1,
            AttemptState::Trying(_) => {
                self.state = AttemptState::Exhausted;
                return None;
            }
            AttemptState::Success(_) | AttemptState::Exhausted => return None,
        };
        self.state = AttemptState::Trying(next);
        Some(next)
    }

    /// The attempt in flight worked with `password`.
    pub fn succeed(&mut self, password: String) {
        if matches!(self.state, AttemptState::Trying(_)) {
            self.state = AttemptState::Success(password);
        }
    }

    /// The attempt in flight failed. Returns the attempts left.
    pub fn fail(&mut self) -> u32 {
        match self.state {
            AttemptState::Trying(n) if n >= self.max => {
                self.state = AttemptState::Exhausted;
                0
            }
            AttemptState::Trying(n) => self.max - n,
            _ => 0,
        }
    }

    /// Give up without using the remaining attempts.
    pub fn exhaust(&mut self) {
        if !matches!(self.state, AttemptState::Success(_)) {
            self.state = AttemptState::Exhausted;
        }
    }
}

/// Supplies password candidates on demand.
pub trait PasswordSource {
    /// The next candidate, or `None` when the source has run dry.
    fn next_password(&mut self, prompt: &str) -> Option<String>;
}

/// The next non-empty candidate from `source`; empty answers are asked again
/// without using up an attempt.
pub fn next_non_empty(source: &mut dyn PasswordSource, prompt: &str) -> Option<String> {
    std::iter::from_fn(|| source.next_password(prompt)).find(|p| !p.is_empty())
}

/// Candidates given with `--password`, in order.
#[derive(Debug, Default)]
pub struct ListSource {
    passwords: VecDeque<String>,
}

impl ListSource {
    pub fn new(passwords: impl IntoIterator<Item = String>) -> Self {
        Self {
            passwords: passwords.into_iter().collect(),
        }
    }
}

impl PasswordSource for ListSource {
    fn next_password(&mut self, _prompt: &str) -> Option<String> {
        self.passwords.pop_front()
    }
}

/// Hidden terminal prompt.
#[derive(Debug, Default)]
pub struct PromptSource;

impl PasswordSource for PromptSource {
    fn next_password(&mut self, prompt: &str) -> Option<String> {
        rpassword::prompt_password(prompt).ok()
    }
}

/// One password per line from a reader; dry at end of input.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> PasswordSource for ReaderSource<R> {
    fn next_password(&mut self, _prompt: &str) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Command-line candidates first, then an interactive source.
pub struct ChainedSource {
    sources: Vec<Box<dyn PasswordSource>>,
}

impl ChainedSource {
    pub fn new(sources: Vec<Box<dyn PasswordSource>>) -> Self {
        Self { sources }
    }

    /// `--password` values, then a terminal prompt when stdin is a terminal
    /// or lines read from stdin otherwise.
    pub fn from_cli(passwords: Vec<String>) -> Self {
        let interactive: Box<dyn PasswordSource> = if io::stdin().is_terminal() {
            Box::new(PromptSource)
        } else {
            Box::new(ReaderSource::new(io::stdin().lock()))
        };
        Self::new(vec![Box::new(ListSource::new(passwords)), interactive])
    }
}

impl PasswordSource for ChainedSource {
    fn next_password(&mut self, prompt: &str) -> Option<String> {
        self.sources
            .iter_mut()
            .find_map(|source| source.next_password(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_capped() {
        let mut attempts = PasswordAttempts::new(MAX_PASSWORD_ATTEMPTS);
        assert_eq!(attempts.state(), &AttemptState::NoAttempt);

        assert_eq!(attempts.begin(), Some(1));
        assert_eq!(attempts.fail(), 2);
        assert_eq!(attempts.begin(), Some(2));
        assert_eq!(attempts.fail(), 1);
        assert_eq!(attempts.begin(), Some(3));
        assert_eq!(attempts.fail(), 0);
        assert_eq!(attempts.state(), &AttemptState::Exhausted);
        assert_eq!(attempts.begin(), None);
    }

    #[test]
    fn success_ends_the_loop() {
        let mut attempts = PasswordAttempts::new(MAX_PASSWORD_ATTEMPTS);
        attempts.begin();
        attempts.fail();
        attempts.begin();
        attempts.succeed("123456".into());
        assert_eq!(attempts.state(), &AttemptState::Success("123456".into()));
        assert_eq!(attempts.begin(), None);

        attempts.exhaust();
        assert_eq!(attempts.state(), &AttemptState::Success("123456".into()));
    }

    #[test]
    fn exhaust_skips_remaining_attempts() {
        let mut attempts = PasswordAttempts::new(MAX_PASSWORD_ATTEMPTS);
        attempts.begin();
        attempts.exhaust();
        assert_eq!(attempts.state(), &AttemptState::Exhausted);
        assert_eq!(attempts.begin(), None);
    }

    #[test]
    fn list_source_pops_in_order() {
        let mut source = ListSource::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(source.next_password("?").as_deref(), Some("a"));
        assert_eq!(source.next_password("?").as_deref(), Some("b"));
        assert_eq!(source.next_password("?"), None);
    }

    #[test]
    fn reader_source_strips_line_endings() {
        let mut source = ReaderSource::new(&b"123456\r\n\nlast"[..]);
        assert_eq!(source.next_password("?").as_deref(), Some("123456"));
        assert_eq!(source.next_password("?").as_deref(), Some(""));
        assert_eq!(source.next_password("?").as_deref(), Some("last"));
        assert_eq!(source.next_password("?"), None);
    }

    #[test]
    fn chained_source_falls_through() {
        let mut source = ChainedSource::new(vec![
            Box::new(ListSource::new(vec!["cli".to_string()])),
            Box::new(ReaderSource::new(&b"stdin\n"[..])),
        ]);
        assert_eq!(source.next_password("?").as_deref(), Some("cli"));
        assert_eq!(source.next_password("?").as_deref(), Some("stdin"));
        assert_eq!(source.next_password("?"), None);
    }

    #[test]
    fn empty_answers_are_asked_again() {
        let mut source = ListSource::new(["".to_string(), String::new(), "123456".to_string()]);
        assert_eq!(next_non_empty(&mut source, "pw: "), Some("123456".to_string()));
        assert_eq!(next_non_empty(&mut source, "pw: "), None);

        let mut only_empty = ListSource::new([String::new()]);
        assert_eq!(next_non_empty(&mut only_empty, "pw: "), None);
    }
}
