use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use promptlayer_chat::builder::{PromptLayerBuilder, API_KEY_ENV, BASE_URL_ENV};
use promptlayer_chat::chat::Message;
use promptlayer_chat::conversation::{
    Conversation, ConversationConfig, ConversationOutcome, NoFurtherInput, TurnOutcome,
};
use promptlayer_chat::run::PromptRunner;

use crate::args::CliArgs;
use crate::config::{load_config, AppConfig};
use crate::input::StdinInput;
use crate::logging::init_logging;
use crate::tools::CannedToolsConfig;

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let loaded = load_config(args.config.clone())?;
    let _logger = init_logging(&loaded.config.logging, &loaded.paths)?;

    let conversation_config = conversation_config(&args, &loaded.config)?;
    let runner = build_runner(&args, &loaded.config)?;
    let tools = CannedToolsConfig::load(&loaded.paths.tools_file())?
        .into_registry(loaded.config.tools.timeout_ms);
    log::info!(
        "starting conversation with {} ({} tools)",
        conversation_config.template_name,
        tools.len()
    );

    let mut conversation = Conversation::new(runner, Arc::new(tools), conversation_config);
    match args.prompt.clone() {
        Some(prompt) => {
            let outcome = conversation.run(prompt, &mut NoFurtherInput).await;
            report(outcome)
        }
        None => interactive(&mut conversation).await,
    }
}

fn conversation_config(args: &CliArgs, app: &AppConfig) -> anyhow::Result<ConversationConfig> {
    let mut config = app.conversation.clone();
    if let Some(template) = &args.template {
        config.template_name = template.clone();
    }
    if let Some(max_turns) = args.max_turns {
        config.max_turns = Some(max_turns);
    }
    if !args.tags.is_empty() {
        config.tags = args.tags.clone();
    }
    if args.parallel_tools {
        config.parallel_tool_calls = true;
    }
    config
        .validate()
        .context("set a template with --template or [conversation] template_name")?;
    Ok(config)
}

fn build_runner(args: &CliArgs, app: &AppConfig) -> anyhow::Result<Arc<dyn PromptRunner>> {
    let api_key = args
        .api_key
        .clone()
        .or_else(|| app.api_key.clone())
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .with_context(|| format!("no API key: pass --api-key or set {API_KEY_ENV}"))?;
    let mut builder = PromptLayerBuilder::new()
        .api_key(api_key)
        .resilient(app.resilient);
    if let Some(url) = args
        .base_url
        .clone()
        .or_else(|| app.base_url.clone())
        .or_else(|| std::env::var(BASE_URL_ENV).ok())
    {
        builder = builder.base_url(url);
    }
    if let Some(timeout) = app.timeout_seconds {
        builder = builder.timeout_seconds(timeout);
    }
    Ok(Arc::from(builder.build()?))
}

async fn interactive(conversation: &mut Conversation) -> anyhow::Result<()> {
    let mut input = StdinInput::new();
    println!("Type a question; an empty line quits.");
    while let Some(question) = conversation.next_question(&mut input).await {
        match conversation.send(&question).await {
            Ok(TurnOutcome::Replied(message)) => print_reply(&message),
            Ok(TurnOutcome::Ended(_)) => {
                println!("[conversation ended by the assistant]");
                return Ok(());
            }
            Err(err) => {
                log::error!("turn failed: {err}");
                eprintln!("error: {err}");
            }
        }
    }
    if conversation.turn_limit_reached() {
        println!("[turn limit reached after {} turns]", conversation.completed_turns());
    }
    Ok(())
}

fn report(outcome: ConversationOutcome) -> anyhow::Result<()> {
    if let Some(message) = outcome.last_message() {
        print_reply(message);
    }
    match outcome {
        ConversationOutcome::Failed { error, .. } => Err(error.into()),
        ConversationOutcome::TurnLimitReached { turns, .. } => {
            println!("[turn limit reached after {turns} turns]");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn print_reply(message: &Message) {
    let text = message.text();
    if !text.is_empty() {
        println!("assistant> {text}");
    }
}
