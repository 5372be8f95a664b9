use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, trace};
use crate::config::ProxyConfig;
use crate::error::Error;
use crate::prompt::split_turns;
use crate::request::{
  CompletionRequest, CompletionResult, ProxyRequestBody,
  ProxyResponseBody, Usage
};

/// Client for the first-party chat function.
///
/// The function owns the provider credential and persona; this side
/// only forwards the user turn and its context.
pub struct ProxyClient
{   function_url: String
  , anon_key: Option<String>
  , http_client: reqwest::Client
}

impl ProxyClient
{   pub fn new(function_url: String, anon_key: Option<String>) -> Self
    {   debug!("Creating ProxyClient for {}", function_url);
        ProxyClient
        {   function_url
          , anon_key
          , http_client: reqwest::Client::new()
        }
    }

    pub fn from_config(config: &ProxyConfig, timeout_secs: Option<u64>)
      -> Result<Self, Error>
    {   let url = config.function_url.clone().ok_or_else(|| {
          Error::Configuration("proxy function_url is not set".to_string())
        })?;
        let mut client = ProxyClient::new(url, config.anon_key.clone());
        if let Some(secs) = timeout_secs
        {   client.http_client = reqwest::Client::builder()
              .timeout(Duration::from_secs(secs))
              .build()
              .map_err(|e| Error::Configuration(
                format!("HTTP client: {}", e)
              ))?;
        }
        Ok(client)
    }
}

#[async_trait]
impl super::Transport for ProxyClient
{   fn name(&self) -> &str
    {   "proxy"
    }

    async fn send(&self, request: &CompletionRequest)
      -> Result<CompletionResult, Error>
    {   let (context, message) = split_turns(&request.messages)
          .ok_or_else(|| Error::InvalidRequest(
            "message list must end with a user turn".to_string()
          ))?;
        let body = ProxyRequestBody
        {   message: message.to_string()
          , context: Some(context).filter(|c| !c.is_empty())
        };
        trace!("Proxy request: {:?}", body);

        let mut builder = self.http_client
          .post(&self.function_url)
          .header("Content-Type", "application/json");
        if let Some(key) = &self.anon_key
        {   builder = builder
              .header("apikey", key)
              .header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("Proxy HTTP error: {}", e);
            Error::network(e.to_string())
          })?;

        let status = response.status();
        trace!("Proxy response status: {}", status);
        let raw = response.text().await.map_err(|e| {
          Error::network(e.to_string())
        })?;

        // Error bodies carry a message worth surfacing over the status line
        let parsed: Result<ProxyResponseBody, _> = serde_json::from_str(&raw);
        match (status.is_success(), parsed)
        {   (_, Ok(ProxyResponseBody::Failure { error })) => {
              error!("Proxy function error: {}", error);
              Err(Error::Transport
              {   status: Some(status.as_u16())
                , message: error
              })
            }
          , (false, _) => {
              error!("Proxy function status: {}", status);
              Err(Error::http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
              ))
            }
          , (true, Ok(ProxyResponseBody::Success { response, model, tokens })) => {
              let placeholder = response.is_empty();
              Ok(CompletionResult
              {   text: if placeholder
                  {   crate::request::EMPTY_RESULT_TEXT.to_string()
                  } else
                  {   response
                  }
                , usage: tokens.map(|total_tokens| Usage
                  {   total_tokens
                    , ..Usage::default()
                  })
                , model
                , placeholder
              })
            }
          , (true, Err(e)) => {
              error!("Proxy parse error: {}", e);
              Err(Error::malformed(Some(status.as_u16()), e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::presets::Persona;
    use crate::prompt::compose;
    use std::sync::Arc;
    use crate::providers::Transport;
    use crate::tracker::{RequestDefaults, RequestTracker};
    use httpmock::prelude::*;

    fn request(prompt: &str, context: Option<&str>) -> CompletionRequest
    {   CompletionRequest
        {   model: "ignored".to_string()
          , messages: compose(prompt, context, Persona::MissionAssistant)
              .unwrap()
          , temperature: 0.7
          , max_tokens: 500
        }
    }

    #[tokio::test]
    async fn test_forwards_message_and_context()
    {   let server = MockServer::start();
        let mock = server.mock(|when, then| {
          when.method(POST)
            .path("/functions/v1/chat-ai")
            .header("apikey", "anon")
            .json_body(serde_json::json!({
              "message": "Fuel status?",
              "context": "Mars orbit insertion"
            }));
          then.status(200)
            .body(r#"{"response":"Fuel at 82%.","model":"GPT-4.1","tokens":33}"#);
        });

        let client = ProxyClient::new(
          server.url("/functions/v1/chat-ai"),
          Some("anon".to_string())
        );
        let result = client
          .send(&request("Fuel status?", Some("Mars orbit insertion")))
          .await
          .unwrap();

        mock.assert();
        assert_eq!(result.text, "Fuel at 82%.");
        assert_eq!(result.model, "GPT-4.1");
        assert_eq!(
          result.usage_snapshot().map(|u| u.tokens),
          Some(33)
        );
    }

    #[tokio::test]
    async fn test_omits_blank_context()
    {   let server = MockServer::start();
        let mock = server.mock(|when, then| {
          when.method(POST)
            .path("/chat")
            .json_body(serde_json::json!({ "message": "Fuel status?" }));
          then.status(200)
            .body(r#"{"response":"Fuel at 82%.","model":"GPT-4.1"}"#);
        });

        let client = ProxyClient::new(server.url("/chat"), None);
        let result = client.send(&request("Fuel status?", None)).await.unwrap();
        mock.assert();
        assert_eq!(result.usage, None);
    }

    #[tokio::test]
    async fn test_reply_without_tokens_keeps_last_usage()
    {   let server = MockServer::start();
        server.mock(|when, then| {
          when.method(POST).path("/chat").body_contains("first");
          then.status(200)
            .body(r#"{"response":"one","model":"GPT-4.1","tokens":33}"#);
        });
        server.mock(|when, then| {
          when.method(POST).path("/chat").body_contains("second");
          then.status(200).body(r#"{"response":"two","model":"GPT-4.1"}"#);
        });

        let tracker = RequestTracker::new(
          Arc::new(ProxyClient::new(server.url("/chat"), None)),
          RequestDefaults::default()
        );
        tracker.generate("first", None, Persona::MissionAssistant, None)
          .await
          .unwrap();
        let text = tracker
          .generate("second", None, Persona::MissionAssistant, None)
          .await
          .unwrap();

        assert_eq!(text, "two");
        assert_eq!(tracker.state().last_usage.map(|u| u.tokens), Some(33));
    }

    #[tokio::test]
    async fn test_error_body_becomes_transport_error()
    {   let server = MockServer::start();
        server.mock(|when, then| {
          when.method(POST).path("/chat");
          then.status(500)
            .body(r#"{"error":"OpenAI API key not configured"}"#);
        });

        let client = ProxyClient::new(server.url("/chat"), None);
        let err = client.send(&request("hi", None)).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.display_message(), "OpenAI API key not configured");
    }

    #[tokio::test]
    async fn test_bare_status_error()
    {   let server = MockServer::start();
        server.mock(|when, then| {
          when.method(POST).path("/chat");
          then.status(502);
        });

        let client = ProxyClient::new(server.url("/chat"), None);
        let err = client.send(&request("hi", None)).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_rejects_request_without_user_turn()
    {   let client = ProxyClient::new("http://127.0.0.1:65534".to_string(), None);
        let req = CompletionRequest
        {   model: "m".to_string()
          , messages: vec![]
          , temperature: 0.7
          , max_tokens: 10
        };
        let err = client.send(&req).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
