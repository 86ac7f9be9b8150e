//! Notification delivery queue
//!
//! Writes happen on the request path; everything slow or fallible (realtime
//! publish, Web Push, email) is handed to a bounded queue drained by one
//! worker task. A full queue drops the job with a warning.

use std::sync::Arc;

use dreamx_core::{
    DomainEvent, Mailer, Notification, OutgoingEmail, PushOutcome, PushSender,
    PushSubscriptionRepository, User, UserRepository,
};
use dreamx_realtime::{BusMessage, EventBus, Room};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::email;

/// Work item for the delivery worker
#[derive(Debug, Clone)]
pub enum DeliveryJob {
    /// Fan out a stored notification
    Notification(Notification),
    /// Send a transactional email
    Email(OutgoingEmail),
}

impl DeliveryJob {
    fn kind(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::Email(_) => "email",
        }
    }
}

/// Producer side of the delivery queue
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<DeliveryJob>,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DeliveryJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting; returns false when the job was dropped
    pub fn enqueue(&self, job: DeliveryJob) -> bool {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(job = kind, "Delivery queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(job = kind, "Delivery worker stopped, dropping job");
                false
            }
        }
    }
}

/// Consumer side: drains the queue until every producer is gone
pub struct DeliveryWorker {
    rx: mpsc::Receiver<DeliveryJob>,
    users: Arc<dyn UserRepository>,
    push_subscriptions: Arc<dyn PushSubscriptionRepository>,
    event_bus: Arc<dyn EventBus>,
    push: Option<Arc<dyn PushSender>>,
    mailer: Arc<dyn Mailer>,
    public_url: String,
}

impl DeliveryWorker {
    pub fn new(
        rx: mpsc::Receiver<DeliveryJob>,
        users: Arc<dyn UserRepository>,
        push_subscriptions: Arc<dyn PushSubscriptionRepository>,
        event_bus: Arc<dyn EventBus>,
        push: Option<Arc<dyn PushSender>>,
        mailer: Arc<dyn Mailer>,
        public_url: String,
    ) -> Self {
        Self {
            rx,
            users,
            push_subscriptions,
            event_bus,
            push,
            mailer,
            public_url,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("Notification delivery worker started");
        while let Some(job) = self.rx.recv().await {
            match job {
                DeliveryJob::Notification(notification) => self.deliver(&notification).await,
                DeliveryJob::Email(message) => self.send_email(&message).await,
            }
        }
        info!("Notification delivery worker stopped");
    }

    #[instrument(skip(self, notification), fields(notification_id = %notification.id, user_id = %notification.user_id))]
    async fn deliver(&self, notification: &Notification) {
        let event = DomainEvent::NotificationCreated(notification.into());
        let message = BusMessage::new(Room::user(notification.user_id), event.event_type(), event.payload());
        if let Err(e) = self.event_bus.publish(message).await {
            warn!(error = %e, "Realtime publish failed");
        }

        let recipient = match self.users.find_by_id(notification.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Could not load notification recipient");
                return;
            }
        };

        if recipient.notify_push {
            if let Some(push) = &self.push {
                self.send_push(push.as_ref(), &recipient).await;
            }
        }

        if recipient.notify_email && notification.kind.is_email_worthy() {
            let message = email::notification(&recipient, &self.public_url, notification);
            self.send_email(&message).await;
        }
    }

    async fn send_push(&self, push: &dyn PushSender, recipient: &User) {
        let subscriptions = match self.push_subscriptions.list_by_user(recipient.id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                warn!(error = %e, "Could not load push subscriptions");
                return;
            }
        };

        for subscription in subscriptions {
            match push.send(&subscription).await {
                Ok(PushOutcome::Delivered) => debug!(endpoint = %subscription.endpoint, "Push delivered"),
                Ok(PushOutcome::Gone) => {
                    if let Err(e) = self
                        .push_subscriptions
                        .delete_by_endpoint(&subscription.endpoint, None)
                        .await
                    {
                        warn!(error = %e, "Could not delete expired push subscription");
                    } else {
                        info!(user_id = %recipient.id, "Expired push subscription removed");
                    }
                }
                Err(e) => warn!(error = %e, "Push delivery failed"),
            }
        }
    }

    async fn send_email(&self, message: &OutgoingEmail) {
        if let Err(e) = self.mailer.send(message).await {
            warn!(error = %e, subject = %message.subject, "Email delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamx_core::{NotificationKind, Snowflake};

    fn job(n: i64) -> DeliveryJob {
        DeliveryJob::Notification(Notification::new(
            Snowflake::new(n),
            Snowflake::new(1),
            None,
            NotificationKind::System,
            "hello".into(),
        ))
    }

    #[tokio::test]
    async fn test_full_queue_drops_jobs() {
        let (queue, mut rx) = NotificationQueue::new(2);
        assert!(queue.enqueue(job(1)));
        assert!(queue.enqueue(job(2)));
        assert!(!queue.enqueue(job(3)));

        assert!(rx.recv().await.is_some());
        assert!(queue.enqueue(job(4)));
    }

    #[tokio::test]
    async fn test_closed_queue_drops_jobs() {
        let (queue, rx) = NotificationQueue::new(4);
        drop(rx);
        assert!(!queue.enqueue(job(1)));
    }
}
