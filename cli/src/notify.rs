//! Desktop notification delivery via notify-rust.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications are not available on this desktop")]
    NotAuthorized,
    #[error("failed to deliver notification: {0}")]
    Delivery(String),
}

/// A notification to put on the user's desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    pub title: String,
    pub subtitle: Option<String>,
    pub sound: Option<String>,
    pub after: Option<Duration>,
}

impl Push {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            sound: None,
            after: None,
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    /// Delays delivery by `delay` without holding up the caller.
    pub fn after(mut self, delay: Duration) -> Self {
        self.after = Some(delay);
        self
    }
}

pub trait NotificationGateway {
    fn request_permission(&self) -> Result<(), NotifyError>;
    fn send(&self, push: Push) -> Result<(), NotifyError>;
}

/// Gateway backed by the desktop's notification server.
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            app_name: "tether".to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationGateway for DesktopNotifier {
    fn request_permission(&self) -> Result<(), NotifyError> {
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            notify_rust::get_capabilities().map_err(|_| NotifyError::NotAuthorized)?;
        }
        Ok(())
    }

    fn send(&self, push: Push) -> Result<(), NotifyError> {
        match push.after {
            Some(delay) => {
                let app_name = self.app_name.clone();
                std::thread::Builder::new()
                    .name("tether-notify".to_string())
                    .spawn(move || {
                        std::thread::sleep(delay);
                        if let Err(e) = show(&app_name, &push) {
                            warn!(error = %e, "delayed notification was not delivered");
                        }
                    })
                    .map_err(|e| NotifyError::Delivery(e.to_string()))?;
                Ok(())
            }
            None => show(&self.app_name, &push),
        }
    }
}

fn show(app_name: &str, push: &Push) -> Result<(), NotifyError> {
    let mut notification = notify_rust::Notification::new();
    notification.appname(app_name).summary(&push.title);
    if let Some(subtitle) = &push.subtitle {
        notification.body(subtitle);
    }
    if let Some(sound) = &push.sound {
        notification.sound_name(sound);
    }
    notification
        .show()
        .map(|_| ())
        .map_err(|e| NotifyError::Delivery(e.to_string()))
}

/// Gateway that drops every push, for `--no-notify` runs.
pub struct SilentGateway;

impl NotificationGateway for SilentGateway {
    fn request_permission(&self) -> Result<(), NotifyError> {
        Ok(())
    }

    fn send(&self, push: Push) -> Result<(), NotifyError> {
        debug!(title = %push.title, "notification suppressed");
        Ok(())
    }
}
