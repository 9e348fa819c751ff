use thiserror::Error;

/// Failures seen by the stream consumer and the read-state reconciler.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The push channel failed to open, errored mid-stream, or went silent. Transient.
    #[error("stream channel error: {0}")]
    Channel(String),

    /// The consumer used up its reconnect budget and stopped.
    #[error("connection lost after {attempts} reconnect attempts; refresh to retry")]
    ReconnectExhausted { attempts: u32 },

    /// The server did not acknowledge a mark-read call. Local optimistic state is kept.
    #[error("mark-read failed: {0}")]
    MarkReadFailed(String),

    #[error("snapshot request failed: {0}")]
    Snapshot(String),

    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_asks_for_refresh() {
        let message = ClientError::ReconnectExhausted { attempts: 5 }.to_string();
        assert!(message.contains("5 reconnect attempts"));
        assert!(message.contains("refresh"));
    }

    #[test]
    fn decode_errors_convert() {
        let err: ClientError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
