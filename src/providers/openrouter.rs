use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, trace};
use crate::config::TransportConfig;
use crate::error::Error;
use crate::request::{
  ChatCompletionBody, ChatCompletionResponse, CompletionRequest,
  CompletionResult
};

/// Direct chat-completions client.
///
/// Holds the provider credential, so it belongs on the server side of
/// a deployment; browser-facing callers go through the proxy.
pub struct OpenRouterClient
{   api_key: String
  , api_base: String
  , referer: String
  , title: String
  , http_client: reqwest::Client
}

impl OpenRouterClient
{   pub fn new(api_key: String, config: &TransportConfig)
      -> Result<Self, Error>
    {   debug!("Creating OpenRouterClient for {}", config.api_base);
        if api_key.trim().is_empty()
        {   error!("Empty API key");
            return Err(Error::Configuration(
              "API key is empty".to_string()
            ));
        }
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          Error::Configuration(format!("HTTP client: {}", e))
        })?;
        Ok(OpenRouterClient
        {   api_key
          , api_base: config.api_base.trim_end_matches('/').to_string()
          , referer: config.referer.clone()
          , title: config.title.clone()
          , http_client
        })
    }

    /// Build from the env var named by `config.api_key_env`
    pub fn from_env(config: &TransportConfig) -> Result<Self, Error>
    {   let key = std::env::var(&config.api_key_env).map_err(|_| {
          error!("No API key in {}", config.api_key_env);
          Error::Configuration(format!(
            "{} is not set", config.api_key_env
          ))
        })?;
        Self::new(key, config)
    }

    fn endpoint(&self) -> String
    {   format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl super::Transport for OpenRouterClient
{   fn name(&self) -> &str
    {   "openrouter"
    }

    async fn send(&self, request: &CompletionRequest)
      -> Result<CompletionResult, Error>
    {   if request.messages.is_empty()
        {   return Err(Error::InvalidRequest(
              "message list is empty".to_string()
            ));
        }
        debug!(
          "Sending {} messages to {}",
          request.messages.len(), request.model
        );

        let body = ChatCompletionBody::from(request);
        trace!("Completion request: {:?}", body);

        let response = self.http_client
          .post(self.endpoint())
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .header("HTTP-Referer", &self.referer)
          .header("X-Title", &self.title)
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::network(e.to_string())
          })?;

        let status = response.status();
        trace!("Completion response status: {}", status);

        if !status.is_success()
        {   error!("Completion API error: {}", status);
            return Err(Error::http_status(
              status.as_u16(),
              status.canonical_reason().unwrap_or("")
            ));
        }

        let raw = response.text().await.map_err(|e| {
          error!("Body read error: {}", e);
          Error::network(e.to_string())
        })?;
        let parsed: ChatCompletionResponse
          = serde_json::from_str(&raw).map_err(|e| {
            error!("Parse error: {}", e);
            Error::malformed(Some(status.as_u16()), e.to_string())
          })?;

        let result = parsed.into_result(&request.model);
        if result.placeholder
        {   debug!("No choice in response, using placeholder");
        }
        Ok(result)
    }
}
