#[path = "pl-chat/app.rs"]
mod app;
#[path = "pl-chat/args.rs"]
mod args;
#[path = "pl-chat/config/mod.rs"]
mod config;
#[path = "pl-chat/input.rs"]
mod input;
#[path = "pl-chat/logging.rs"]
mod logging;
#[path = "pl-chat/tools.rs"]
mod tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
