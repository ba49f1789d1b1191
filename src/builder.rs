#[path = "builder/promptlayer_builder.rs"]
mod promptlayer_builder;

#[path = "builder/state.rs"]
mod state;

#[path = "builder/resilience.rs"]
mod resilience;

#[path = "builder/build.rs"]
mod build;

pub use promptlayer_builder::{PromptLayerBuilder, API_KEY_ENV, BASE_URL_ENV};
