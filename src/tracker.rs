//! Request state tracking around a transport call
//!
//! Every call is tagged with a sequence number when it is issued.
//! Only the latest issued call may write the shared state when it
//! settles; older calls still hand their outcome back to their own
//! caller. A drop guard returns `is_loading` to false on every exit
//! path, including a panicking transport or a dropped future.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::Notify;
use crate::config::TransportConfig;
use crate::error::Error;
use crate::presets::{Persona, DEFAULT_MODEL};
use crate::prompt::compose;
use crate::providers::Transport;
use crate::request::{ChatMessage, CompletionRequest, CompletionResult, UsageSnapshot};

/// Observable state of one tracker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestState
{   pub is_loading: bool
  , pub last_error: Option<String>
  , pub last_usage: Option<UsageSnapshot>
}

/// Sampling parameters applied to every call
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults
{   /// Configured model; when unset the persona preset's model is used
    pub model: Option<String>
  , pub temperature: f32
  , pub max_tokens: u32
}

impl Default for RequestDefaults
{   fn default() -> Self
    {   RequestDefaults
        {   model: None
          , temperature: 0.7
          , max_tokens: 1000
        }
    }
}

impl From<&TransportConfig> for RequestDefaults
{   fn from(config: &TransportConfig) -> Self
    {   RequestDefaults
        {   model: Some(config.default_model.clone())
          , temperature: config.temperature
          , max_tokens: config.max_tokens
        }
    }
}

struct Inner
{   state: RequestState
  , latest: u64
}

pub struct RequestTracker
{   transport: Arc<dyn Transport>
  , defaults: RequestDefaults
  , inner: Mutex<Inner>
  , cancelled: AtomicBool
  , cancel_notify: Notify
}

impl RequestTracker
{   pub fn new(
      transport: Arc<dyn Transport>
    , defaults: RequestDefaults
    ) -> Self
    {   debug!("Creating RequestTracker over {}", transport.name());
        RequestTracker
        {   transport
          , defaults
          , inner: Mutex::new(Inner
            {   state: RequestState::default()
              , latest: 0
            })
          , cancelled: AtomicBool::new(false)
          , cancel_notify: Notify::new()
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RequestState
    {   self.lock().state.clone()
    }

    /// Tear down: in-flight calls resolve to `Cancelled` without
    /// touching state, later calls are refused.
    pub fn cancel(&self)
    {   if !self.cancelled.swap(true, Ordering::SeqCst)
        {   info!("RequestTracker cancelled");
            self.cancel_notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool
    {   self.cancelled.load(Ordering::SeqCst)
    }

    /// Compose with a persona and send; returns the reply text.
    ///
    /// Model order: explicit, then configured, then the preset's.
    pub async fn generate(
      &self
    , prompt: &str
    , context: Option<&str>
    , persona: Persona
    , model: Option<&str>
    ) -> Result<String, Error>
    {   let messages = compose(prompt, context, persona)?;
        let preset = persona.preset();
        let model = model
          .or(self.defaults.model.as_deref())
          .unwrap_or(preset.default_model.as_str());
        self.send(messages, Some(model)).await
    }

    /// Send a prepared message list; returns the reply text
    pub async fn send(
      &self
    , messages: Vec<ChatMessage>
    , model: Option<&str>
    ) -> Result<String, Error>
    {   self.complete(messages, model).await.map(|r| r.text)
    }

    /// Send a prepared message list; returns the full result
    pub async fn complete(
      &self
    , messages: Vec<ChatMessage>
    , model: Option<&str>
    ) -> Result<CompletionResult, Error>
    {   if self.is_cancelled()
        {   return Err(Error::Cancelled);
        }
        if messages.is_empty()
        {   return Err(Error::InvalidRequest(
              "message list is empty".to_string()
            ));
        }

        let request = CompletionRequest
        {   model: model
              .or(self.defaults.model.as_deref())
              .unwrap_or(DEFAULT_MODEL)
              .to_string()
          , messages
          , temperature: self.defaults.temperature
          , max_tokens: self.defaults.max_tokens
        };

        let seq = self.begin();
        let mut guard = SettleGuard { tracker: self, seq, armed: true };
        debug!("Request {} issued to {}", seq, self.transport.name());

        let outcome = tokio::select!
        {   result = self.transport.send(&request) => result
          , _ = self.wait_cancelled() => {
              debug!("Request {} dropped on cancel", seq);
              return Err(Error::Cancelled);
            }
        };

        if self.is_cancelled()
        {   debug!("Request {} settled after cancel, dropping", seq);
            return Err(Error::Cancelled);
        }

        guard.armed = false;
        self.settle(seq, &outcome);
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, Inner>
    {   self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self) -> u64
    {   let mut inner = self.lock();
        inner.latest += 1;
        inner.state.is_loading = true;
        inner.state.last_error = None;
        inner.latest
    }

    fn settle(&self, seq: u64, outcome: &Result<CompletionResult, Error>)
    {   let mut inner = self.lock();
        if inner.latest != seq
        {   debug!(
              "Request {} is stale (latest {}), state untouched",
              seq, inner.latest
            );
            return;
        }
        inner.state.is_loading = false;
        match outcome
        {   Ok(result) => {
              if let Some(usage) = result.usage_snapshot()
              {   debug!("Request {} used {} tokens", seq, usage.tokens);
                  inner.state.last_usage = Some(usage);
              }
            }
          , Err(e) => {
              error!("Request {} failed: {}", seq, e);
              inner.state.last_error = Some(e.display_message());
            }
        }
    }

    fn release(&self, seq: u64)
    {   let mut inner = self.lock();
        if inner.latest == seq
        {   warn!("Request {} ended without settling", seq);
            inner.state.is_loading = false;
        }
    }

    async fn wait_cancelled(&self)
    {   loop
        {   let notified = self.cancel_notify.notified();
            if self.is_cancelled()
            {   return;
            }
            notified.await;
        }
    }
}

/// Clears `is_loading` if a call exits without settling
struct SettleGuard<'a>
{   tracker: &'a RequestTracker
  , seq: u64
  , armed: bool
}

impl Drop for SettleGuard<'_>
{   fn drop(&mut self)
    {   if self.armed
        {   self.tracker.release(self.seq);
        }
    }
}
