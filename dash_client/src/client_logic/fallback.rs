//! What the client does once a dispatcher has reached a terminal status.

use anyhow::{bail, Result};
use lib_dashsync::{StreamStatus, TransportKind};

/// Decides whether to run another dispatcher after one has ended.
///
/// # Returns
/// - `Ok(Some(TransportKind::Poll))` to restart on the poll transport: the push
///   stream failed and `fallback_to_poll` is set.
/// - `Ok(None)` to exit normally.
///
/// # Errors
/// The stream failed and there is nothing to fall back to.
pub fn next_transport(
    status: &StreamStatus,
    fallback_to_poll: bool,
    current: TransportKind,
) -> Result<Option<TransportKind>> {
    match status {
        StreamStatus::Failed(reason) if fallback_to_poll && current != TransportKind::Poll => {
            log::warn!("Push stream failed ({}). Falling back to polling.", reason);
            Ok(Some(TransportKind::Poll))
        }
        StreamStatus::Failed(reason) => bail!("stream failed: {}", reason),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> StreamStatus {
        StreamStatus::Failed("stream closed by remote host".to_string())
    }

    #[test]
    fn test_failed_push_falls_back_to_poll_when_enabled() {
        for current in [TransportKind::EventStream, TransportKind::WebSocket] {
            let next = next_transport(&failed(), true, current).unwrap();
            assert_eq!(next, Some(TransportKind::Poll));
        }
    }

    #[test]
    fn test_failure_without_fallback_is_an_error() {
        let err = next_transport(&failed(), false, TransportKind::EventStream).unwrap_err();
        assert!(err.to_string().contains("stream closed by remote host"));

        // Poll is already the last resort.
        assert!(next_transport(&failed(), true, TransportKind::Poll).is_err());
    }

    #[test]
    fn test_stopped_exits_normally() {
        assert_eq!(next_transport(&StreamStatus::Stopped, true, TransportKind::EventStream).unwrap(), None);
        assert_eq!(next_transport(&StreamStatus::Stopped, false, TransportKind::Poll).unwrap(), None);
    }
}
