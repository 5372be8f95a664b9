use std::fmt;

/// Custom error type for ASTRA-X operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Credential missing or configuration rejected
    Configuration(String)
  , /// Network failure, non-2xx status or malformed body.
    /// `status` is None when no response was received.
    Transport
    {   status: Option<u16>
      , message: String
    }
  , /// Request rejected before dispatch
    InvalidRequest(String)
  , /// Result arrived after the owning tracker was torn down
    Cancelled
  , /// Hosted session service failure
    Auth(String)
  , /// Backend task is gone
    Disconnected
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl Error
{   /// Transport failure for a response that carried a status
    pub fn http_status(status: u16, status_text: &str) -> Self
    {   Error::Transport
        {   status: Some(status)
          , message: format!("API Error: {} {}", status, status_text)
        }
    }

    /// Transport failure before any response was received
    pub fn network(msg: impl Into<String>) -> Self
    {   Error::Transport
        {   status: None
          , message: msg.into()
        }
    }

    /// Transport failure while decoding a response body
    pub fn malformed(status: Option<u16>, msg: impl Into<String>) -> Self
    {   Error::Transport
        {   status
          , message: format!("Malformed response: {}", msg.into())
        }
    }

    pub fn is_transport(&self) -> bool
    {   matches!(self, Error::Transport { .. })
    }

    /// HTTP status if the remote answered at all
    pub fn status(&self) -> Option<u16>
    {   match self
        {   Error::Transport { status, .. } => *status
          , _ => None
        }
    }

    /// Human-readable text recorded as the tracker's last error
    pub fn display_message(&self) -> String
    {   match self
        {   Error::Transport { message, .. } => message.clone()
          , other => other.to_string()
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Configuration(msg) => {
              write!(f, "Configuration error: {}", msg)
            }
          , Error::Transport { status: Some(code), message } => {
              write!(f, "Transport error ({}): {}", code, message)
            }
          , Error::Transport { status: None, message } => {
              write!(f, "Transport error: {}", message)
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::Cancelled => {
              write!(f, "Request cancelled")
            }
          , Error::Auth(msg) => {
              write!(f, "Auth error: {}", msg)
            }
          , Error::Disconnected => {
              write!(f, "Backend disconnected")
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_http_status_message()
    {   let err = Error::http_status(500, "Internal Server Error");
        assert!(err.is_transport());
        assert_eq!(err.status(), Some(500));
        assert_eq!(
          err.display_message(),
          "API Error: 500 Internal Server Error"
        );
    }

    #[test]
    fn test_network_has_no_status()
    {   let err = Error::network("connection refused");
        assert!(err.is_transport());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_display_message_for_non_transport()
    {   let err = Error::Configuration("missing key".to_string());
        assert_eq!(
          err.display_message(),
          "Configuration error: missing key"
        );
    }
}
