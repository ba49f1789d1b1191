use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use promptlayer_chat::conversation::UserInput;

/// Reads follow-up questions from stdin, one per line.
pub struct StdinInput {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserInput for StdinInput {
    async fn next_question(&mut self) -> Option<String> {
        print!("you> ");
        let _ = std::io::stdout().flush();
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(err) => {
                log::warn!("failed to read stdin: {err}");
                None
            }
        }
    }
}
