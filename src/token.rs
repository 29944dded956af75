//! Credential escalation: short-lived user token → long-lived user token →
//! page-scoped access token. Strictly ordered, first failure is terminal.

use std::fmt;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::graph::{GraphApi, GraphError};

/// Raw input credentials for one harvest operation. Owned by the caller,
/// never cached.
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub user_access_token: String,
    pub page_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("page_id", &self.page_id)
            .finish_non_exhaustive()
    }
}

/// Authentication state produced by [`setup`] and threaded into every
/// harvester call. Holds only the page token; the intermediate long-lived
/// token is dropped once the escalation completes.
#[derive(Clone, Default)]
pub struct TokenState {
    page_token: Option<String>,
}

impl TokenState {
    /// The unconfigured state: harvesting against it yields nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Deliberate out-of-band escape hatch: wraps a page token the caller
    /// already holds (prior [`setup`] run, test fixture, operator tooling).
    /// [`setup`] is the only path that mints one from raw credentials.
    pub fn with_page_token(token: impl Into<String>) -> Self {
        Self {
            page_token: Some(token.into()),
        }
    }

    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.page_token.is_some()
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

/// One terminal outcome per escalation stage. No retries, no partial credit.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("initial token verification failed")]
    VerificationFailed,
    #[error("failed to get long-lived token")]
    LongLivedExchangeFailed(#[source] GraphError),
    #[error("failed to get page access token")]
    PageTokenExchangeFailed(#[source] GraphError),
}

/// Escalation progress. The long-lived token lives only inside the machine;
/// a page token can exist only after the long-lived stage carried one.
#[derive(Debug)]
enum Escalation {
    Init,
    Verified,
    LongLivedExchanged(String),
    PageTokenObtained(String),
}

/// Introspect a token against the platform. True only on a 200 answer; any
/// transport or API failure is logged and collapses to false.
pub async fn verify(graph: &dyn GraphApi, token: &str) -> bool {
    match graph.debug_token(token, token).await {
        Ok(()) => true,
        Err(err) => {
            warn!(?err, "token verification failed");
            false
        }
    }
}

/// Run the full escalation: verify → long-lived exchange → page-token
/// exchange, short-circuiting at the first broken stage. Success yields a
/// [`TokenState`] holding only the page access token.
#[instrument(skip_all)]
pub async fn setup(graph: &dyn GraphApi, creds: &Credentials) -> Result<TokenState, SetupError> {
    let mut stage = Escalation::Init;
    loop {
        stage = match stage {
            Escalation::Init => {
                if !verify(graph, &creds.user_access_token).await {
                    return Err(SetupError::VerificationFailed);
                }
                Escalation::Verified
            }
            Escalation::Verified => {
                let token = graph
                    .exchange_long_lived(
                        &creds.app_id,
                        &creds.app_secret,
                        &creds.user_access_token,
                    )
                    .await
                    .map_err(SetupError::LongLivedExchangeFailed)?;
                Escalation::LongLivedExchanged(token)
            }
            Escalation::LongLivedExchanged(long_lived) => {
                let token = graph
                    .page_access_token(&creds.page_id, &long_lived)
                    .await
                    .map_err(SetupError::PageTokenExchangeFailed)?;
                Escalation::PageTokenObtained(token)
            }
            Escalation::PageTokenObtained(token) => {
                info!("token setup completed");
                return Ok(TokenState::with_page_token(token));
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_is_unconfigured() {
        let state = TokenState::empty();
        assert!(!state.is_configured());
        assert_eq!(state.page_token(), None);
    }

    #[test]
    fn populated_state_exposes_token() {
        let state = TokenState::with_page_token("page-token");
        assert!(state.is_configured());
        assert_eq!(state.page_token(), Some("page-token"));
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let creds = Credentials {
            app_id: "app-1".into(),
            app_secret: "s3cret".into(),
            user_access_token: "user-token".into(),
            page_id: "page-1".into(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("app-1"));
        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("user-token"));

        let state = TokenState::with_page_token("page-token");
        assert!(!format!("{state:?}").contains("page-token"));
    }
}
