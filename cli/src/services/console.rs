use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented user input. `Ok(None)` means end of input.
#[async_trait]
pub trait Console: Send {
    async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

/// Interactive console on stdin/stdout.
pub struct StdinConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for StdinConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl Console for StdinConsole {
    async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;
        Ok(self.lines.next_line().await?)
    }
}

/// Console fed from a fixed script, for tests and piped sessions.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.inputs.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_console_replays_then_ends() {
        let mut console = ScriptedConsole::new(["1", "aapl"]);
        assert_eq!(console.read_line("> ").await.unwrap().as_deref(), Some("1"));
        assert_eq!(console.read_line("Symbols: ").await.unwrap().as_deref(), Some("aapl"));
        assert_eq!(console.read_line("> ").await.unwrap(), None);
        assert_eq!(console.prompts().len(), 3);
    }
}
