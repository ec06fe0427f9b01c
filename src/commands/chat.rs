//! Chat command
//!
//! Recent history of one channel and sending into it. History is not
//! cached.

use tracing::info;

use crate::error::{DeckError, Result};
use crate::remote::ChatMessage;
use crate::session::SessionManager;

/// Messages shown per channel
pub const HISTORY_LIMIT: usize = 20;

/// The last [`HISTORY_LIMIT`] messages of a channel, oldest first.
pub async fn history(sessions: &SessionManager, channel_id: &str) -> Result<Vec<ChatMessage>> {
    let channel_id = channel_id.to_string();
    let mut messages = sessions
        .with_session(|session| {
            let channel_id = channel_id.clone();
            async move { session.messages(&channel_id, HISTORY_LIMIT).await }
        })
        .await?;
    messages.reverse();
    Ok(messages)
}

/// Posts `content` and returns the refreshed history.
///
/// Sending is not retried on a network failure since the message may have
/// gone out.
pub async fn send(
    sessions: &SessionManager,
    channel_id: &str,
    content: &str,
) -> Result<Vec<ChatMessage>> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DeckError::InvalidRequest(
            "Message cannot be empty".to_string(),
        ));
    }

    let session = sessions.acquire_session().await?;
    let sent = session.send_message(channel_id, content).await?;
    info!("Sent message {} to channel {}", sent.id, channel_id);

    history(sessions, channel_id).await
}
