//! Server-side chat function
//!
//! Accepts `{message, context}` from the dashboard, composes the
//! mission-assistant prompt and forwards it with the credential that
//! only this process holds. Answers `{response, model, tokens}`, or
//! `{error}` with status 500.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, State},
  http::{header, HeaderName, Method, StatusCode},
  routing::post,
  Json, Router,
};
use log::{debug, error};
use tower_http::cors::{Any, CorsLayer};
use crate::error::Error;
use crate::presets::Persona;
use crate::prompt::compose;
use crate::providers::Transport;
use crate::request::{CompletionRequest, ProxyRequestBody, ProxyResponseBody};
use crate::tracker::RequestDefaults;

pub struct RelayState
{   /// None when the provider key is not configured
    pub transport: Option<Arc<dyn Transport>>
  , pub persona: Persona
  , pub defaults: RequestDefaults
}

/// Build the router: POST `/` with permissive CORS
pub fn router(state: Arc<RelayState>) -> Router
{   let cors = CorsLayer::new()
      .allow_origin(Any)
      .allow_methods([Method::POST, Method::OPTIONS])
      .allow_headers([
        header::AUTHORIZATION
      , header::CONTENT_TYPE
      , HeaderName::from_static("x-client-info")
      , HeaderName::from_static("apikey")
      ]);

    Router::new()
      .route("/", post(handle_chat))
      .layer(cors)
      .with_state(state)
}

async fn handle_chat(
  State(state): State<Arc<RelayState>>
, body: Result<Json<ProxyRequestBody>, JsonRejection>
) -> (StatusCode, Json<ProxyResponseBody>)
{   let outcome = match body
    {   Ok(Json(body)) => answer(&state, body).await
      , Err(rejection) => Err(Error::InvalidRequest(rejection.body_text()))
    };
    match outcome
    {   Ok(reply) => (StatusCode::OK, Json(reply))
      , Err(e) => {
          error!("Error in chat function: {}", e);
          (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ProxyResponseBody::Failure { error: e.display_message() })
          )
        }
    }
}

/// Produce the reply body for one request
pub async fn answer(state: &RelayState, body: ProxyRequestBody)
  -> Result<ProxyResponseBody, Error>
{   let transport = state.transport.as_ref().ok_or_else(|| {
      Error::Configuration("API key not configured".to_string())
    })?;

    let messages = compose(
      &body.message,
      body.context.as_deref(),
      state.persona
    )?;
    debug!("Relaying {} messages via {}", messages.len(), transport.name());

    let request = CompletionRequest
    {   model: state.defaults.model.clone()
          .unwrap_or_else(|| state.persona.preset().default_model)
      , messages
      , temperature: state.defaults.temperature
      , max_tokens: state.defaults.max_tokens
    };
    let result = transport.send(&request).await?;

    Ok(ProxyResponseBody::Success
    {   tokens: result.usage.map(|u| u.total_tokens)
      , response: result.text
      , model: result.model
    })
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use crate::request::{CompletionResult, Usage};

    /// Answers every request and keeps the last one it saw
    struct FixedTransport
    {   tokens: Option<u64>
      , seen: Mutex<Option<CompletionRequest>>
    }

    impl FixedTransport
    {   fn new(tokens: Option<u64>) -> Arc<Self>
        {   Arc::new(FixedTransport { tokens, seen: Mutex::new(None) })
        }

        fn seen(&self) -> CompletionRequest
        {   self.seen.lock().unwrap().clone().expect("no request seen")
        }
    }

    #[async_trait]
    impl Transport for FixedTransport
    {   fn name(&self) -> &str { "fixed" }

        async fn send(&self, request: &CompletionRequest)
          -> Result<CompletionResult, Error>
        {   *self.seen.lock().unwrap() = Some(request.clone());
            Ok(CompletionResult
            {   text: "Trajectory nominal.".to_string()
              , usage: self.tokens
                  .map(|t| Usage { total_tokens: t, ..Usage::default() })
              , model: request.model.clone()
              , placeholder: false
            })
        }
    }

    fn state(transport: Option<Arc<dyn Transport>>) -> RelayState
    {   RelayState
        {   transport
          , persona: Persona::MissionAssistant
          , defaults: RequestDefaults
            {   max_tokens: 500
              , ..RequestDefaults::default()
            }
        }
    }

    #[tokio::test]
    async fn test_answer_success()
    {   let fixed = FixedTransport::new(Some(21));
        let state = state(Some(fixed.clone() as Arc<dyn Transport>));
        let reply = answer(&state, ProxyRequestBody
        {   message: "Check trajectory".to_string()
          , context: Some("Lunar transfer".to_string())
        }).await.unwrap();
        assert_eq!(reply, ProxyResponseBody::Success
        {   response: "Trajectory nominal.".to_string()
          , model: Persona::MissionAssistant.preset().default_model
          , tokens: Some(21)
        });
        let seen = fixed.seen();
        assert_eq!(seen.messages.len(), 3);
        assert_eq!(seen.max_tokens, 500);
    }

    #[tokio::test]
    async fn test_configured_model_overrides_preset()
    {   let fixed = FixedTransport::new(None);
        let mut state = state(Some(fixed.clone() as Arc<dyn Transport>));
        state.defaults.model = Some("relay-model".to_string());
        let reply = answer(&state, ProxyRequestBody
        {   message: "Check trajectory".to_string()
          , context: None
        }).await.unwrap();
        assert_eq!(fixed.seen().model, "relay-model");
        assert_eq!(reply, ProxyResponseBody::Success
        {   response: "Trajectory nominal.".to_string()
          , model: "relay-model".to_string()
          , tokens: None
        });
    }

    #[tokio::test]
    async fn test_null_context_is_accepted()
    {   let fixed = FixedTransport::new(Some(4));
        let app = router(Arc::new(
          state(Some(fixed.clone() as Arc<dyn Transport>))
        ));
        let response = app
          .oneshot(
            Request::post("/")
              .header(header::CONTENT_TYPE, "application/json")
              .body(Body::from(r#"{"message":"Fuel status?","context":null}"#))
              .unwrap()
          )
          .await
          .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
          .await
          .unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["response"], "Trajectory nominal.");
        assert_eq!(reply["tokens"], 4);

        // system prompt and the question, no context turn
        let seen = fixed.seen();
        assert_eq!(seen.messages.len(), 2);
        assert_eq!(seen.messages[1].content, "Fuel status?");
    }

    #[tokio::test]
    async fn test_absent_usage_omits_tokens()
    {   let fixed = FixedTransport::new(None);
        let state = state(Some(fixed as Arc<dyn Transport>));
        let reply = answer(&state, ProxyRequestBody
        {   message: "Check trajectory".to_string()
          , context: None
        }).await.unwrap();
        let json = serde_json::to_value(&reply).unwrap();
        assert!(json.get("tokens").is_none());
        assert_eq!(json["response"], "Trajectory nominal.");
    }

    #[tokio::test]
    async fn test_missing_key_is_reported()
    {   let state = state(None);
        let err = answer(&state, ProxyRequestBody
        {   message: "hi".to_string()
          , context: None
        }).await.unwrap_err();
        assert_eq!(
          err.display_message(),
          "Configuration error: API key not configured"
        );
    }
}
