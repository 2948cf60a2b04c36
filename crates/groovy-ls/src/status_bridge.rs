//! Forwards [`ServerStatus`] transitions onto the LSP `window/logMessage` and
//! `window/showMessage` notifications. There is no richer progress channel wired in here;
//! `$/progress` requires a work-done token negotiated per request, which none of the
//! notification-driven transitions in `StatusMachine` have.

use groovy_ls_status::{Health, ServerStatus};
use tokio::sync::watch;
use tower_lsp_server::ls_types::MessageType;
use tower_lsp_server::Client;

pub fn spawn(client: Client, mut status_rx: watch::Receiver<ServerStatus>) {
    tokio::spawn(async move {
        loop {
            let status = status_rx.borrow_and_update().clone();
            report(&client, &status).await;
            if status_rx.changed().await.is_err() {
                return;
            }
        }
    });
}

async fn report(client: &Client, status: &ServerStatus) {
    if let Some(progress) = &status.progress {
        client
            .log_message(
                MessageType::INFO,
                format!("indexing: {}/{} files", progress.files_indexed, progress.files_total),
            )
            .await;
    }

    match status.health {
        Health::Ok => {
            if let Some(message) = &status.message {
                client.log_message(MessageType::INFO, message.clone()).await;
            }
        }
        Health::Warning => {
            let message = status.message.clone().unwrap_or_else(|| "degraded".to_string());
            client.show_message(MessageType::WARNING, message).await;
        }
        Health::Error => {
            let message = status
                .error
                .as_ref()
                .map(|e| e.details.clone())
                .or_else(|| status.message.clone())
                .unwrap_or_else(|| "unrecoverable error".to_string());
            client.show_message(MessageType::ERROR, message).await;
        }
    }
}
