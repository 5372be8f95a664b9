//! Builds the ordered message list sent to the model

use log::trace;
use crate::error::Error;
use crate::presets::Persona;
use crate::request::{ChatMessage, Role};

/// Prefix marking the synthetic context turn
pub const CONTEXT_PREFIX: &str = "Context: ";

/// Compose `[system, context?, user]` for one generation call.
///
/// The context turn is only inserted when `context` has
/// non-whitespace content.
pub fn compose(
  user_prompt: &str
, context: Option<&str>
, persona: Persona
) -> Result<Vec<ChatMessage>, Error>
{   if user_prompt.trim().is_empty()
    {   return Err(Error::InvalidRequest(
          "user prompt is empty".to_string()
        ));
    }

    let mut messages = Vec::with_capacity(3);
    messages.push(ChatMessage::system(persona.preset().system_prompt));
    if let Some(ctx) = context.filter(|c| !c.trim().is_empty())
    {   messages.push(ChatMessage::user(format!("{}{}", CONTEXT_PREFIX, ctx)));
    }
    messages.push(ChatMessage::user(user_prompt));

    trace!(
      "Composed {} messages for persona {}",
      messages.len(), persona.id()
    );
    Ok(messages)
}

/// Recover `(context, prompt)` from a composed list.
///
/// The prompt is the last user turn; context turns are the user
/// turns between the system message and the prompt, joined by
/// newlines with the prefix stripped.
pub fn split_turns(messages: &[ChatMessage])
  -> Option<(String, &str)>
{   let (last, rest) = messages.split_last()?;
    if last.role != Role::User
    {   return None;
    }
    let context: Vec<&str> = rest.iter()
      .filter(|m| m.role == Role::User)
      .map(|m| m.content.strip_prefix(CONTEXT_PREFIX)
        .unwrap_or(&m.content))
      .collect();
    Some((context.join("\n"), last.content.as_str()))
}
