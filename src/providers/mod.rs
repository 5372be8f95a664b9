//! Transports that carry a completion request to a model

pub mod openrouter;
pub mod proxy;

use std::sync::Arc;
use async_trait::async_trait;
use log::info;
use crate::config::AstraConfig;
use crate::error::Error;
use crate::request::{CompletionRequest, CompletionResult};

// Re-export for convenience
pub use openrouter::OpenRouterClient;
pub use proxy::ProxyClient;

/// One request, one attempt. Implementations never retry.
#[async_trait]
pub trait Transport: Send + Sync
{   /// Short name used in logs
    fn name(&self) -> &str;

    async fn send(&self, request: &CompletionRequest)
      -> Result<CompletionResult, Error>;
}

/// Pick the transport a deployment is configured for.
///
/// The proxy wins whenever a function URL is configured, unless
/// `direct` forces the server-side client.
pub fn from_config(config: &AstraConfig, direct: bool)
  -> Result<Arc<dyn Transport>, Error>
{   match (&config.proxy.function_url, direct)
    {   (Some(_), false) => {
          info!("Using proxy transport");
          let client = ProxyClient::from_config(
            &config.proxy, config.transport.timeout_secs
          )?;
          Ok(Arc::new(client) as Arc<dyn Transport>)
        }
      , _ => {
          info!("Using direct transport to {}", config.transport.api_base);
          let client = OpenRouterClient::from_env(&config.transport)?;
          Ok(Arc::new(client) as Arc<dyn Transport>)
        }
    }
}
