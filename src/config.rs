//! Configuration for transports, the session service and personas

use std::path::Path;
use serde::{Deserialize, Serialize};
use log::debug;
use crate::error::Error;
use crate::presets::{Persona, DEFAULT_MODEL};

/// Direct chat-completions transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig
{   /// API base URL, without the `/chat/completions` suffix
    pub api_base: String
  , /// Model used when the caller names none
    pub default_model: String
  , pub temperature: f32
  , pub max_tokens: u32
  , /// Sent as `HTTP-Referer`
    pub referer: String
  , /// Sent as `X-Title`
    pub title: String
  , /// Request timeout in seconds; None leaves the client default
    pub timeout_secs: Option<u64>
  , /// Name of the env var holding the provider key
    pub api_key_env: String
}

impl Default for TransportConfig
{   fn default() -> Self
    {   TransportConfig
        {   api_base: "https://openrouter.ai/api/v1".to_string()
          , default_model: DEFAULT_MODEL.to_string()
          , temperature: 0.7
          , max_tokens: 1000
          , referer: "http://localhost".to_string()
          , title: "Astra-X Space Exploration AI".to_string()
          , timeout_secs: None
          , api_key_env: "OPENROUTER_API_KEY".to_string()
        }
    }
}

/// First-party proxy function configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig
{   /// Full URL of the chat function; None selects the direct transport
    pub function_url: Option<String>
  , /// Public project key, not a provider secret
    pub anon_key: Option<String>
}

/// Hosted session service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig
{   pub url: Option<String>
  , pub anon_key: Option<String>
}

/// ASTRA-X configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AstraConfig
{   pub transport: TransportConfig
  , pub proxy: ProxyConfig
  , pub auth: AuthConfig
  , /// Persona used when the caller names none
    pub persona: Persona
}

impl AstraConfig
{   /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| {
          Error::Configuration(
            format!("cannot read {}: {}", path.display(), e)
          )
        })?;
        let config: AstraConfig = serde_json::from_str(&raw)
          .map_err(|e| Error::Configuration(
            format!("invalid config {}: {}", path.display(), e)
          ))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `ASTRAX_*` environment variables
    pub fn apply_env(mut self) -> Self
    {   self.apply_vars(|name| std::env::var(name).ok());
        self
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>)
    {   if let Some(v) = get("ASTRAX_API_BASE")
        {   self.transport.api_base = v;
        }
        if let Some(v) = get("ASTRAX_MODEL")
        {   self.transport.default_model = v;
        }
        if let Some(v) = get("ASTRAX_PROXY_URL")
        {   self.proxy.function_url = Some(v);
        }
        if let Some(v) = get("ASTRAX_AUTH_URL")
        {   self.auth.url = Some(v);
        }
        if let Some(v) = get("ASTRAX_ANON_KEY")
        {   self.proxy.anon_key = Some(v.clone());
            self.auth.anon_key = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), Error>
    {   let t = &self.transport;
        if t.default_model.trim().is_empty()
        {   return Err(Error::Configuration(
              "default_model is empty".to_string()
            ));
        }
        if !(0.0..=2.0).contains(&t.temperature)
        {   return Err(Error::Configuration(format!(
              "temperature {} outside 0..=2", t.temperature
            )));
        }
        if t.max_tokens == 0
        {   return Err(Error::Configuration(
              "max_tokens must be positive".to_string()
            ));
        }
        if t.api_base.trim().is_empty()
        {   return Err(Error::Configuration(
              "api_base is empty".to_string()
            ));
        }
        Ok(())
    }
}
