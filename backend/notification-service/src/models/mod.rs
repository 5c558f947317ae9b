use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::hub::Identity;

/// Message attached to the notification raised when an order is placed
pub const ORDER_CREATED_MESSAGE: &str = "📦 Pesanan Dibuat";

/// Notification pushed to streaming clients
///
/// Mirrors the persisted notification row owned by the order workflow; the hub
/// only ever sees it serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub order_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, order_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            message: message.into(),
            order_id,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// Notification for a freshly placed order
    pub fn order_created(user_id: Uuid, order_id: Uuid) -> Self {
        Self::new(user_id, order_id, ORDER_CREATED_MESSAGE)
    }

    /// Notification for an order moving to `status`
    pub fn status_changed(user_id: Uuid, order_id: Uuid, status: &str) -> Self {
        Self::new(user_id, order_id, format!("📢  {}", status))
    }
}

/// Query string accepted by the streaming endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

impl StreamQuery {
    /// Both fields optional: an empty identity is reachable through broadcast-all
    pub fn identity(self) -> Identity {
        Identity::new(self.user_id, self.role)
    }

    /// Both fields mandatory
    pub fn require_identity(self) -> Result<Identity, AppError> {
        let identity = self.identity();
        if identity.user_id.is_none() || identity.role.is_none() {
            return Err(AppError::BadRequest(
                "user_id and role are required".to_string(),
            ));
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_format() {
        let notification = Notification::order_created(Uuid::new_v4(), Uuid::new_v4());
        let value = serde_json::to_value(&notification).unwrap();

        for key in ["id", "user_id", "message", "order_id", "read", "created_at"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["message"], ORDER_CREATED_MESSAGE);
        assert_eq!(value["read"], false);
    }

    #[test]
    fn test_status_changed_message() {
        let notification = Notification::status_changed(Uuid::nil(), Uuid::nil(), "Dikirim");
        assert_eq!(notification.message, "📢  Dikirim");
    }

    #[test]
    fn test_require_identity() {
        let complete = StreamQuery {
            user_id: Some("u1".into()),
            role: Some("admin".into()),
        };
        assert!(complete.require_identity().is_ok());

        let blank_role = StreamQuery {
            user_id: Some("u1".into()),
            role: Some(String::new()),
        };
        assert!(matches!(
            blank_role.require_identity(),
            Err(AppError::BadRequest(_))
        ));

        assert!(StreamQuery::default().require_identity().is_err());
    }
}
