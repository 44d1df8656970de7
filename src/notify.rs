use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub const WELCOME_TITLE: &str = "To-Do List";
pub const WELCOME_BODY: &str = "Notifications are set up correctly!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    NotDetermined,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission not granted")]
    NotGranted,
    #[error("notifications unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Permission-gated desktop alerts.
///
/// `request_permission` may wait on the user for an arbitrary time; callers
/// must not hold store locks across it.
pub trait NotificationGateway: Send + Sync {
    fn permission_state(&self) -> Permission;
    fn request_permission(&self) -> impl Future<Output = Permission> + Send;
    fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Messages the presentation side answers or displays.
#[derive(Debug)]
pub enum GatewayEvent {
    Notification(Notification),
    /// Reply with the user's decision. Dropping the sender counts as a refusal.
    PermissionRequested(oneshot::Sender<Permission>),
}

/// Hands notifications and permission prompts to whoever owns the receiver.
#[derive(Clone)]
pub struct ChannelGateway {
    permission: Arc<Mutex<Permission>>,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ChannelGateway {
    pub fn new(initial: Permission) -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Self {
            permission: Arc::new(Mutex::new(initial)),
            tx,
        };
        (gateway, rx)
    }

    fn set_permission(&self, permission: Permission) {
        *self.permission.lock().expect("permission poisoned") = permission;
    }
}

impl NotificationGateway for ChannelGateway {
    fn permission_state(&self) -> Permission {
        *self.permission.lock().expect("permission poisoned")
    }

    async fn request_permission(&self) -> Permission {
        let current = self.permission_state();
        if current != Permission::NotDetermined {
            return current;
        }
        let (reply, answer) = oneshot::channel();
        if self.tx.send(GatewayEvent::PermissionRequested(reply)).is_err() {
            log::warn!("notify: permission prompt has no receiver");
            return Permission::Denied;
        }
        match answer.await {
            Ok(Permission::NotDetermined) => Permission::Denied,
            Ok(decision) => {
                log::info!("notify: permission resolved {decision:?}");
                self.set_permission(decision);
                decision
            }
            Err(_) => {
                log::info!("notify: permission prompt dismissed");
                Permission::Denied
            }
        }
    }

    fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.permission_state() != Permission::Granted {
            return Err(NotifyError::NotGranted);
        }
        self.tx
            .send(GatewayEvent::Notification(Notification {
                title: title.to_string(),
                body: body.to_string(),
            }))
            .map_err(|_| NotifyError::Unavailable("receiver dropped".to_string()))
    }
}

/// Terminal sink for the headless daemon. Always allowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutGateway;

impl NotificationGateway for StdoutGateway {
    fn permission_state(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        println!("[{}] {title}: {body}", chrono::Local::now().format("%Y-%m-%d %H:%M"));
        Ok(())
    }
}

/// Asks for permission and, once granted, sends a confirmation alert.
pub async fn enable_notifications<G: NotificationGateway>(gateway: &G) -> Permission {
    let permission = gateway.request_permission().await;
    if permission == Permission::Granted {
        if let Err(err) = gateway.deliver(WELCOME_TITLE, WELCOME_BODY) {
            log::warn!("notify: confirmation alert failed: {err}");
        }
    }
    permission
}
