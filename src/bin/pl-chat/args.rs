use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pl-chat",
    about = "Multi-turn, tool-calling chat against a hosted prompt template"
)]
pub struct CliArgs {
    /// Config file (defaults to ~/.config/pl-chat/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Prompt template to run
    #[arg(long, short = 't')]
    pub template: Option<String>,
    #[arg(long)]
    pub max_turns: Option<usize>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    /// Tag attached to every run; repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Ask a single question and exit
    #[arg(long, short = 'p')]
    pub prompt: Option<String>,
    /// Dispatch the tool calls of one message concurrently
    #[arg(long)]
    pub parallel_tools: bool,
}
