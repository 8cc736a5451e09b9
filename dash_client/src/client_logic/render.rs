//! Console renderer: logs the visible messages and alerts whenever they change.

use lib_dashsync::{Alert, AlertLevel, StreamStatus, SyncViews, TransientMessage};

/// Follows `views` until the dispatcher publishing them stops.
pub async fn run(mut views: SyncViews) {
    loop {
        tokio::select! {
            changed = views.messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = format_messages(&views.messages.borrow_and_update());
                log::info!("Messages: {}", line);
            }
            changed = views.alerts.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = format_alerts(&views.alerts.borrow_and_update());
                log::info!("Alerts: {}", line);
            }
            changed = views.status.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = views.status.borrow_and_update().clone();
                log::info!("Stream status: {:?}", status);
                if status == StreamStatus::Stopped {
                    break;
                }
            }
        }
    }
    log::debug!("Renderer finished.");
}

pub fn format_messages(messages: &[TransientMessage]) -> String {
    if messages.is_empty() {
        return "(none)".to_string();
    }
    messages
        .iter()
        .map(|m| format!("[{}] {}", m.severity, m.content))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn format_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "(none)".to_string();
    }
    alerts
        .iter()
        .map(|a| {
            let level = match a.name {
                AlertLevel::Warning => "WARN",
                AlertLevel::Alert => "ALERT",
            };
            format!("{} {} = {}", level, a.content, a.value)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_alerts() {
        let alerts = vec![
            Alert {
                content: "Coolant temp".to_string(),
                name: AlertLevel::Alert,
                value: 112.5,
                triggered: true,
            },
            Alert {
                content: "Fuel".to_string(),
                name: AlertLevel::Warning,
                value: 8.0,
                triggered: true,
            },
        ];
        assert_eq!(format_alerts(&alerts), "ALERT Coolant temp = 112.5 | WARN Fuel = 8");
        assert_eq!(format_alerts(&[]), "(none)");
    }

    #[test]
    fn test_format_empty_messages() {
        assert_eq!(format_messages(&[]), "(none)");
    }
}
