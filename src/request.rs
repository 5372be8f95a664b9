//! Unified request and response types for ASTRA-X

use serde::{Deserialize, Serialize};

/// Placeholder text returned when the service answers without a choice
pub const EMPTY_RESULT_TEXT: &str = "No response received";

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::Assistant, content: content.into() }
    }
}

/// One generation call, transport agnostic
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: u32
}

/// Token accounting as reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   #[serde(default)]
    pub prompt_tokens: u64
  , #[serde(default)]
    pub completion_tokens: u64
  , #[serde(default)]
    pub total_tokens: u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult
{   /// Generated text, or the placeholder
    pub text: String
  , pub usage: Option<Usage>
  , /// Model the service says it served
    pub model: String
  , /// Set when the service returned no usable choice
    pub placeholder: bool
}

impl CompletionResult
{   /// Usage summary kept by the tracker, if any was reported
    pub fn usage_snapshot(&self) -> Option<UsageSnapshot>
    {   self.usage.map(|u| UsageSnapshot
        {   tokens: u.total_tokens
          , model: self.model.clone()
        })
    }
}

/// Last recorded usage: total tokens plus the served model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot
{   pub tokens: u64
  , pub model: String
}

// ===== Chat-completions wire format =====

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionBody<'a>
{   pub model: &'a str
  , pub messages: &'a [ChatMessage]
  , pub temperature: f32
  , pub max_tokens: u32
  , pub stream: bool
}

impl<'a> From<&'a CompletionRequest> for ChatCompletionBody<'a>
{   fn from(req: &'a CompletionRequest) -> Self
    {   ChatCompletionBody
        {   model: &req.model
          , messages: &req.messages
          , temperature: req.temperature
          , max_tokens: req.max_tokens
          , stream: false
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
  , pub usage: Option<Usage>
  , #[serde(default)]
    pub model: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub message: Option<ChoiceMessage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage
{   #[serde(default)]
    pub role: Option<String>
  , #[serde(default)]
    pub content: Option<String>
}

impl ChatCompletionResponse
{   /// First choice's content, if non-empty
    pub fn first_content(&self) -> Option<&str>
    {   self.choices.first()
          .and_then(|c| c.message.as_ref())
          .and_then(|m| m.content.as_deref())
          .filter(|s| !s.is_empty())
    }

    pub fn into_result(self, requested_model: &str) -> CompletionResult
    {   let (text, placeholder) = match self.first_content()
        {   Some(text) => (text.to_string(), false)
          , None => (EMPTY_RESULT_TEXT.to_string(), true)
        };
        CompletionResult
        {   text
          , usage: self.usage
          , model: self.model
              .unwrap_or_else(|| requested_model.to_string())
          , placeholder
        }
    }
}

// ===== Proxy function wire format =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRequestBody
{   pub message: String
  , /// Absent, null and empty all mean "no context"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>
}

/// Either `{response, model, tokens}` or `{error}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyResponseBody
{   Failure
    {   error: String
    }
  , Success
    {   response: String
      , model: String
      , /// Absent when the upstream reported no usage
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens: Option<u64>
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_body_serializes_stream_false()
    {   let req = CompletionRequest
        {   model: "m".to_string()
          , messages: vec![ChatMessage::user("hi")]
          , temperature: 0.7
          , max_tokens: 1000
        };
        let json = serde_json::to_value(ChatCompletionBody::from(&req))
          .unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_empty_choices_yield_placeholder()
    {   let resp: ChatCompletionResponse
          = serde_json::from_str(r#"{"choices":[],"model":"x"}"#)
            .unwrap();
        let result = resp.into_result("fallback");
        assert!(result.placeholder);
        assert_eq!(result.text, EMPTY_RESULT_TEXT);
        assert_eq!(result.model, "x");
        assert!(result.usage_snapshot().is_none());
    }

    #[test]
    fn test_usage_snapshot_uses_total()
    {   let resp: ChatCompletionResponse = serde_json::from_str(
          r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}],
              "usage":{"prompt_tokens":30,"completion_tokens":12,"total_tokens":42}}"#
        ).unwrap();
        let result = resp.into_result("req-model");
        assert_eq!(result.text, "ok");
        assert_eq!(result.model, "req-model");
        assert_eq!(
          result.usage_snapshot(),
          Some(UsageSnapshot { tokens: 42, model: "req-model".to_string() })
        );
    }

    #[test]
    fn test_proxy_request_null_context()
    {   let body: ProxyRequestBody = serde_json::from_str(
          r#"{"message":"Fuel status?","context":null}"#
        ).unwrap();
        assert_eq!(body.message, "Fuel status?");
        assert_eq!(body.context, None);

        let body: ProxyRequestBody
          = serde_json::from_str(r#"{"message":"Fuel status?"}"#).unwrap();
        assert_eq!(body.context, None);
    }

    #[test]
    fn test_proxy_body_variants()
    {   let ok: ProxyResponseBody = serde_json::from_str(
          r#"{"response":"hello","model":"GPT-4.1","tokens":7}"#
        ).unwrap();
        assert!(matches!(ok, ProxyResponseBody::Success { tokens: Some(7), .. }));

        let bare: ProxyResponseBody
          = serde_json::from_str(r#"{"response":"x","model":"m"}"#).unwrap();
        assert!(matches!(bare, ProxyResponseBody::Success { tokens: None, .. }));

        let err: ProxyResponseBody
          = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(
          err,
          ProxyResponseBody::Failure { error: "boom".to_string() }
        );
    }
}
