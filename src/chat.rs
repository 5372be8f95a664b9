//! Mission chat console conversation

use std::sync::Arc;
use log::{debug, warn};
use serde::Serialize;
use crate::presets::Persona;
use crate::request::Role;
use crate::tracker::RequestTracker;

/// Bubble shown when a reply could not be produced
pub const FALLBACK_REPLY: &str
  = "Sorry, I encountered an error processing your request. Please try again.";

pub const GREETING: &str
  = "ASTRA-X online. Mission control assistant ready. How can I help?";

/// One visible bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry
{   pub role: Role
  , pub content: String
  , /// Tokens reported for this reply, if any
    pub tokens: Option<u64>
  , /// Set on fallback bubbles
    pub failed: bool
}

/// Conversation bound to one tracker.
///
/// Dropping the log cancels the tracker so replies that arrive
/// afterwards are discarded.
pub struct ChatLog
{   tracker: Arc<RequestTracker>
  , persona: Persona
  , mission_context: String
  , entries: Vec<ChatEntry>
}

impl ChatLog
{   pub fn new(
      tracker: Arc<RequestTracker>
    , persona: Persona
    , mission_context: impl Into<String>
    ) -> Self
    {   ChatLog
        {   tracker
          , persona
          , mission_context: mission_context.into()
          , entries: vec![ChatEntry
            {   role: Role::Assistant
              , content: GREETING.to_string()
              , tokens: None
              , failed: false
            }]
        }
    }

    pub fn entries(&self) -> &[ChatEntry]
    {   &self.entries
    }

    pub fn tracker(&self) -> &RequestTracker
    {   &self.tracker
    }

    pub fn set_mission_context(&mut self, context: impl Into<String>)
    {   self.mission_context = context.into();
    }

    /// Submit a user turn and append the reply (or the fallback).
    /// Returns the appended assistant entry; blank input is ignored.
    pub async fn submit(&mut self, input: &str) -> Option<&ChatEntry>
    {   let input = input.trim();
        if input.is_empty()
        {   return None;
        }
        self.entries.push(ChatEntry
        {   role: Role::User
          , content: input.to_string()
          , tokens: None
          , failed: false
        });

        let reply = self.tracker
          .generate(
            input,
            Some(self.mission_context.as_str()),
            self.persona,
            None
          )
          .await;

        let entry = match reply
        {   Ok(text) => {
              debug!("Chat reply received");
              ChatEntry
              {   role: Role::Assistant
                , content: text
                , tokens: self.tracker.state().last_usage.map(|u| u.tokens)
                , failed: false
              }
            }
          , Err(e) => {
              warn!("Chat reply failed: {}", e);
              ChatEntry
              {   role: Role::Assistant
                , content: FALLBACK_REPLY.to_string()
                , tokens: None
                , failed: true
              }
            }
        };
        self.entries.push(entry);
        self.entries.last()
    }
}

impl Drop for ChatLog
{   fn drop(&mut self)
    {   self.tracker.cancel();
    }
}
