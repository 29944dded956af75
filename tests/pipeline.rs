//! Escalation ordering and short-circuit behavior of the token pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use fb_pageharvest::graph::{Conversation, GraphApi, GraphError, Message, Page};
use fb_pageharvest::token::{self, Credentials, SetupError};

#[derive(Clone, Default)]
struct RecordingGraph {
    verify_ok: bool,
    long_lived: Option<&'static str>,
    page_token: Option<&'static str>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingGraph {
    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

fn api_error() -> GraphError {
    GraphError::Api {
        status: 400,
        message: "bad request".into(),
    }
}

#[async_trait]
impl GraphApi for RecordingGraph {
    async fn debug_token(&self, input_token: &str, access_token: &str) -> Result<(), GraphError> {
        self.calls
            .lock()
            .await
            .push(format!("debug_token({input_token},{access_token})"));
        if self.verify_ok {
            Ok(())
        } else {
            Err(api_error())
        }
    }

    async fn exchange_long_lived(
        &self,
        client_id: &str,
        _client_secret: &str,
        user_token: &str,
    ) -> Result<String, GraphError> {
        self.calls
            .lock()
            .await
            .push(format!("exchange_long_lived({client_id},{user_token})"));
        self.long_lived
            .map(str::to_owned)
            .ok_or_else(api_error)
    }

    async fn page_access_token(
        &self,
        page_id: &str,
        long_lived_token: &str,
    ) -> Result<String, GraphError> {
        self.calls
            .lock()
            .await
            .push(format!("page_access_token({page_id},{long_lived_token})"));
        self.page_token
            .map(str::to_owned)
            .ok_or(GraphError::MissingField("access_token"))
    }

    async fn conversations(
        &self,
        _page_token: &str,
        _page_id: &str,
        _limit: u32,
        _after: Option<&str>,
    ) -> Result<Page<Conversation>, GraphError> {
        self.calls.lock().await.push("conversations".into());
        Err(api_error())
    }

    async fn messages(
        &self,
        _page_token: &str,
        _conversation_id: &str,
        _limit: u32,
        _after: Option<&str>,
    ) -> Result<Page<Message>, GraphError> {
        self.calls.lock().await.push("messages".into());
        Err(api_error())
    }
}

fn creds() -> Credentials {
    Credentials {
        app_id: "app-1".into(),
        app_secret: "s3cret".into(),
        user_access_token: "short-lived".into(),
        page_id: "page-1".into(),
    }
}

#[tokio::test]
async fn failed_verification_stops_before_any_exchange() {
    let graph = RecordingGraph {
        verify_ok: false,
        ..Default::default()
    };

    let err = token::setup(&graph, &creds()).await.unwrap_err();
    assert!(matches!(err, SetupError::VerificationFailed));

    let calls = graph.calls().await;
    assert_eq!(calls, vec!["debug_token(short-lived,short-lived)"]);
}

#[tokio::test]
async fn failed_long_lived_exchange_never_touches_page_endpoint() {
    let graph = RecordingGraph {
        verify_ok: true,
        long_lived: None,
        ..Default::default()
    };

    let err = token::setup(&graph, &creds()).await.unwrap_err();
    assert!(matches!(err, SetupError::LongLivedExchangeFailed(_)));

    let calls = graph.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], "exchange_long_lived(app-1,short-lived)");
}

#[tokio::test]
async fn failed_page_exchange_is_terminal() {
    let graph = RecordingGraph {
        verify_ok: true,
        long_lived: Some("long-lived"),
        page_token: None,
        ..Default::default()
    };

    let err = token::setup(&graph, &creds()).await.unwrap_err();
    assert!(matches!(err, SetupError::PageTokenExchangeFailed(_)));

    let calls = graph.calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2], "page_access_token(page-1,long-lived)");
}

#[tokio::test]
async fn full_escalation_threads_the_long_lived_token_through() {
    let graph = RecordingGraph {
        verify_ok: true,
        long_lived: Some("long-lived"),
        page_token: Some("page-token"),
        ..Default::default()
    };

    let tokens = token::setup(&graph, &creds()).await.unwrap();
    assert!(tokens.is_configured());
    assert_eq!(tokens.page_token(), Some("page-token"));

    let calls = graph.calls().await;
    assert_eq!(
        calls,
        vec![
            "debug_token(short-lived,short-lived)",
            "exchange_long_lived(app-1,short-lived)",
            "page_access_token(page-1,long-lived)",
        ]
    );
}

#[tokio::test]
async fn verify_collapses_transport_failure_to_false() {
    let graph = RecordingGraph::default();
    assert!(!token::verify(&graph, "token").await);

    let graph = RecordingGraph {
        verify_ok: true,
        ..Default::default()
    };
    assert!(token::verify(&graph, "token").await);
}
