//! Credentials attached to signing-service calls.

use reqwest::RequestBuilder;

/// Header carrying an API key in place of OAuth credentials.
pub const API_KEY_HEADER: &str = "WebReview-Api-Key";

/// How the client authenticates to the signing service.
///
/// Obtaining and refreshing tokens is the caller's concern; the session is
/// handed to the client at construction and never shared process-wide.
#[derive(Clone, Default)]
pub enum Session {
    /// No credentials; only useful against development servers.
    #[default]
    Anonymous,
    ApiKey(String),
    /// OAuth2 access token, sent as a bearer token.
    AccessToken(String),
}

impl Session {
    pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Session::Anonymous => builder,
            Session::ApiKey(key) => builder.header(API_KEY_HEADER, key),
            Session::AccessToken(token) => builder.bearer_auth(token),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Session::Anonymous)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::Anonymous => f.write_str("Anonymous"),
            Session::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Session::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}
