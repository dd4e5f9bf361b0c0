//! Loopback redirect listener for the authorization-code flow.
//!
//! Binds a short-lived HTTP server on localhost, waits for the browser to be
//! redirected to `/callback` with the authorization code, hands the code back
//! over a channel, and shuts down.

use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tokio::sync::mpsc;

/// How long to wait for the user to complete the browser flow.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of the browser redirect.
#[derive(Debug)]
pub struct CallbackResult {
    pub code: String,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSender = mpsc::Sender<Result<CallbackResult, String>>;

async fn handle_callback(
    State(tx): State<CallbackSender>,
    Query(query): Query<CallbackQuery>,
) -> Html<String> {
    if let Some(code) = query.code {
        let _ = tx.send(Ok(CallbackResult { code, state: query.state })).await;
        return Html(
            r#"<html>
<body>
<h1>Authorization Successful!</h1>
<p>You can close this window and return to the terminal.</p>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#
                .to_string(),
        );
    }

    let error = query.error.unwrap_or_else(|| "missing authorization code".to_string());
    let _ = tx.send(Err(error.clone())).await;

    Html(format!(
        r"<html>
<body>
<h1>Authorization Failed</h1>
<p>Error: {error}</p>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"
    ))
}

/// Serve the loopback callback endpoint until a redirect arrives or the
/// timeout elapses.
///
/// # Errors
///
/// Returns error if the port cannot be bound, the authorization server
/// reported an error, or the timeout elapsed.
pub async fn wait_for_callback(port: u16, timeout: Duration) -> anyhow::Result<CallbackResult> {
    let (tx, mut rx) = mpsc::channel::<Result<CallbackResult, String>>(1);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let app = Router::new().route("/callback", get(handle_callback)).with_state(tx);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::debug!(port = port, "Callback listener started");

    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "Callback listener error");
        }
    });

    let outcome = tokio::time::timeout(timeout, rx.recv()).await;

    // Stop the listener regardless of outcome
    let _ = shutdown_tx.send(());
    let _ = server.await;

    match outcome {
        Ok(Some(Ok(result))) => Ok(result),
        Ok(Some(Err(error))) => anyhow::bail!("authorization failed: {error}"),
        Ok(None) => anyhow::bail!("callback listener closed unexpectedly"),
        Err(_) => anyhow::bail!("timed out waiting for authorization callback"),
    }
}
