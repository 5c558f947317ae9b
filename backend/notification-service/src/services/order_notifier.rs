/// Order event publisher
///
/// The order workflow calls this after it has committed a notification row:
/// 1. Order created: every connected admin is told about it
/// 2. Status changed: the customer who placed the order is told about it
///
/// Real-time push is a convenience on top of the persisted notification, so a
/// payload dropped for a slow subscriber is not an error here.
use crate::error::Result;
use crate::hub::{Broker, Payload, PublishReport};
use crate::models::Notification;
use tracing::info;

#[derive(Clone)]
pub struct OrderNotifier {
    broker: Broker,
    admin_role: String,
}

impl OrderNotifier {
    pub fn new(broker: Broker, admin_role: impl Into<String>) -> Self {
        Self {
            broker,
            admin_role: admin_role.into(),
        }
    }

    pub fn order_created(&self, notification: &Notification) -> Result<PublishReport> {
        let payload = Payload::json(notification)?;
        let report = self.broker.publish_to_role(&self.admin_role, payload);

        info!(
            order_id = %notification.order_id,
            delivered = report.delivered,
            "order created notification pushed to admins"
        );
        Ok(report)
    }

    pub fn order_status_changed(&self, notification: &Notification) -> Result<PublishReport> {
        let payload = Payload::json(notification)?;
        let report = self
            .broker
            .publish_to_user(&notification.user_id.to_string(), payload);

        info!(
            order_id = %notification.order_id,
            user_id = %notification.user_id,
            delivered = report.delivered,
            "order status notification pushed to customer"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Identity, Transport};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_order_created_goes_to_admins_only() {
        let broker = Broker::new();
        let notifier = OrderNotifier::new(broker.clone(), "admin");
        let customer_id = Uuid::new_v4();

        let mut admin = broker.connect(Identity::role("admin"), Transport::EventStream, 8);
        let customer = broker.connect(
            Identity::user(customer_id.to_string()).with_role("user"),
            Transport::EventStream,
            8,
        );

        let notification = Notification::order_created(customer_id, Uuid::new_v4());
        let report = notifier.order_created(&notification).unwrap();

        assert_eq!(report.delivered, 1);
        let received = admin.recv().await.unwrap();
        let decoded: Notification = serde_json::from_str(received.as_str()).unwrap();
        assert_eq!(decoded, notification);
        drop(customer);
    }

    #[tokio::test]
    async fn test_status_change_goes_to_customer() {
        let broker = Broker::new();
        let notifier = OrderNotifier::new(broker.clone(), "admin");
        let customer_id = Uuid::new_v4();

        let mut customer = broker.connect(
            Identity::user(customer_id.to_string()),
            Transport::WebSocket,
            256,
        );
        let _admin = broker.connect(Identity::role("admin"), Transport::EventStream, 8);

        let notification = Notification::status_changed(customer_id, Uuid::new_v4(), "Dikirim");
        let report = notifier.order_status_changed(&notification).unwrap();

        assert_eq!(report.matched, 1);
        let received = customer.recv().await.unwrap();
        assert!(received.as_str().contains("Dikirim"));
    }
}
