pub mod error;
pub mod config;
pub mod request;
pub mod presets;
pub mod prompt;
pub mod providers;
pub mod tracker;
pub mod chat;
pub mod auth;
pub mod client;
pub mod relay;

pub use client::AstraBackend;
pub use error::Error;
pub use presets::Persona;
pub use tracker::{RequestState, RequestTracker};

/*

ASTRA-X request orchestration: compose persona prompts, send them to
a chat-completions service (directly, or through the first-party
proxy function that holds the credential), and track loading, error
and usage state for the dashboard widgets.

astrax/
├── src/
│   ├── lib.rs          # Backend command interface and re-exports
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # JSON + env configuration
│   ├── request.rs      # Messages, results and wire formats
│   ├── presets.rs      # Persona presets and model catalog
│   ├── prompt.rs       # Message composition
│   ├── providers/      # Transport trait + direct and proxy clients
│   ├── tracker.rs      # Request state tracking
│   ├── chat.rs         # Chat console conversation
│   ├── auth.rs         # Hosted session collaborator
│   ├── client.rs       # Fire-and-forget backend task
│   ├── relay.rs        # Server-side chat function
│   └── bin/            # CLI and proxy function server
└── tests/

*/

pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// ASTRA-X BACKEND INTERFACE:

// ===== Generate =====

pub type GenerateReply = Result<String>;
pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateReply>;

pub struct GenerateArgs
{   pub prompt: String
  , pub context: Option<String>
  , pub persona: crate::Persona
  , pub model: Option<String>
  , pub reply: GenerateReplySender
}

// ===== GetState =====

pub type GetStateReply = Result<crate::RequestState>;
pub type GetStateReplySender
  = tokio::sync::mpsc::UnboundedSender<GetStateReply>;

pub struct GetStateArgs
{   pub reply: GetStateReplySender
}

// ===== GetModelLists =====

pub type GetModelListsReply
  = Result<Vec<crate::presets::ModelInfo>>;
pub type GetModelListsReplySender
  = tokio::sync::mpsc::UnboundedSender<GetModelListsReply>;

pub struct GetModelListsArgs
{   pub reply: GetModelListsReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<()>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== AstraHand (sender side) =====

pub struct AstraHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub get_state_tx
      : tokio::sync::mpsc::UnboundedSender<GetStateArgs>
  , pub get_model_lists_tx
      : tokio::sync::mpsc::UnboundedSender<GetModelListsArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== AstraFoot (receiver side) =====

pub struct AstraFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub get_state_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetStateArgs>
  , pub get_model_lists_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetModelListsArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
