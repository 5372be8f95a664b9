//! Hosted auth/session collaborator
//!
//! Only two capabilities are consumed: reading the current session's
//! user and signing out. Token storage and refresh stay with the host.

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use crate::config::AuthConfig;
use crate::error::Error;

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity
{   pub id: String
  , #[serde(default)]
    pub email: Option<String>
  , #[serde(default)]
    pub user_metadata: serde_json::Value
}

impl UserIdentity
{   /// `full_name` from the sign-up metadata, if present
    pub fn full_name(&self) -> Option<&str>
    {   self.user_metadata.get("full_name").and_then(|v| v.as_str())
    }
}

#[async_trait]
pub trait SessionService: Send + Sync
{   /// None when nobody is signed in or the session expired
    async fn current_session(&self) -> Result<Option<UserIdentity>, Error>;

    async fn sign_out(&self) -> Result<(), Error>;
}

/// REST client for a Supabase-style auth endpoint
pub struct SupabaseSession
{   base_url: String
  , anon_key: String
  , access_token: Option<String>
  , http_client: reqwest::Client
}

impl SupabaseSession
{   pub fn new(
      base_url: String
    , anon_key: String
    , access_token: Option<String>
    ) -> Self
    {   debug!("Creating SupabaseSession for {}", base_url);
        SupabaseSession
        {   base_url: base_url.trim_end_matches('/').to_string()
          , anon_key
          , access_token
          , http_client: reqwest::Client::new()
        }
    }

    pub fn from_config(config: &AuthConfig, access_token: Option<String>)
      -> Result<Self, Error>
    {   let url = config.url.clone().ok_or_else(|| {
          Error::Configuration("auth url is not set".to_string())
        })?;
        let key = config.anon_key.clone().ok_or_else(|| {
          Error::Configuration("auth anon_key is not set".to_string())
        })?;
        Ok(SupabaseSession::new(url, key, access_token))
    }

    fn endpoint(&self, path: &str) -> String
    {   format!("{}/auth/v1/{}", self.base_url, path)
    }
}

#[async_trait]
impl SessionService for SupabaseSession
{   async fn current_session(&self) -> Result<Option<UserIdentity>, Error>
    {   let Some(token) = &self.access_token else
        {   debug!("No access token, no session");
            return Ok(None);
        };

        let response = self.http_client
          .get(self.endpoint("user"))
          .header("apikey", &self.anon_key)
          .header("Authorization", format!("Bearer {}", token))
          .send()
          .await
          .map_err(|e| {
            error!("Session lookup failed: {}", e);
            Error::Auth(e.to_string())
          })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
          || status == reqwest::StatusCode::FORBIDDEN
        {   debug!("Session rejected: {}", status);
            return Ok(None);
        }
        if !status.is_success()
        {   error!("Session lookup status: {}", status);
            return Err(Error::Auth(format!("session lookup: {}", status)));
        }

        let user: UserIdentity = response.json().await.map_err(|e| {
          error!("Session parse error: {}", e);
          Error::Auth(e.to_string())
        })?;
        debug!("Session for user {}", user.id);
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<(), Error>
    {   let Some(token) = &self.access_token else
        {   return Ok(());
        };

        let response = self.http_client
          .post(self.endpoint("logout"))
          .header("apikey", &self.anon_key)
          .header("Authorization", format!("Bearer {}", token))
          .send()
          .await
          .map_err(|e| {
            error!("Sign out failed: {}", e);
            Error::Auth(e.to_string())
          })?;

        let status = response.status();
        // an already-expired token means the session is gone anyway
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED
        {   info!("Signed out");
            Ok(())
        } else
        {   error!("Sign out status: {}", status);
            Err(Error::Auth(format!("sign out: {}", status)))
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_current_session_returns_user()
    {   let server = MockServer::start();
        server.mock(|when, then| {
          when.method(GET)
            .path("/auth/v1/user")
            .header("apikey", "anon")
            .header("authorization", "Bearer tok");
          then.status(200).body(
            r#"{"id":"u-1","email":"pilot@astra.x","user_metadata":{"full_name":"Ada Pilot"}}"#
          );
        });

        let session = SupabaseSession::new(
          server.base_url(), "anon".to_string(), Some("tok".to_string())
        );
        let user = session.current_session().await.unwrap().unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.full_name(), Some("Ada Pilot"));
    }

    #[tokio::test]
    async fn test_expired_session_is_none()
    {   let server = MockServer::start();
        server.mock(|when, then| {
          when.method(GET).path("/auth/v1/user");
          then.status(401);
        });

        let session = SupabaseSession::new(
          server.base_url(), "anon".to_string(), Some("old".to_string())
        );
        assert_eq!(session.current_session().await, Ok(None));
    }

    #[tokio::test]
    async fn test_no_token_skips_network()
    {   let session = SupabaseSession::new(
          "http://127.0.0.1:65534".to_string(), "anon".to_string(), None
        );
        assert_eq!(session.current_session().await, Ok(None));
        assert_eq!(session.sign_out().await, Ok(()));
    }

    #[tokio::test]
    async fn test_sign_out_posts_logout()
    {   let server = MockServer::start();
        let mock = server.mock(|when, then| {
          when.method(POST).path("/auth/v1/logout");
          then.status(204);
        });

        let session = SupabaseSession::new(
          server.base_url(), "anon".to_string(), Some("tok".to_string())
        );
        session.sign_out().await.unwrap();
        mock.assert();
    }

    #[test]
    fn test_from_config_requires_url()
    {   let err = SupabaseSession::from_config(&AuthConfig::default(), None)
          .err()
          .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
