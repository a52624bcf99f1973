//! Mock push transport for deterministic testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use portal_core::{Error, PushMessage, PushTransport, Result};

/// A recorded delivery call.
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub user_ids: Vec<Uuid>,
    pub message: PushMessage,
}

/// Mock push transport that records deliveries instead of performing them.
///
/// By default every recipient is counted as delivered; `with_failing_users`
/// simulates per-user misses and `with_transport_error` simulates a gateway
/// outage (the whole call errors).
#[derive(Clone, Default)]
pub struct MockPushTransport {
    deliveries: Arc<Mutex<Vec<RecordedDelivery>>>,
    failing_users: Arc<Mutex<Vec<Uuid>>>,
    transport_error: Arc<Mutex<bool>>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark users whose deliveries should be counted as misses.
    pub fn with_failing_users(self, users: Vec<Uuid>) -> Self {
        self.set_failing_users(users);
        self
    }

    /// Replace the set of users whose deliveries miss.
    pub fn set_failing_users(&self, users: Vec<Uuid>) {
        *self.failing_users.lock().unwrap() = users;
    }

    /// Make every `deliver` call fail with a transport error.
    pub fn with_transport_error(self) -> Self {
        self.set_transport_error(true);
        self
    }

    /// Toggle the simulated gateway outage at runtime.
    pub fn set_transport_error(&self, failing: bool) {
        *self.transport_error.lock().unwrap() = failing;
    }

    /// All deliveries recorded so far.
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Number of `deliver` calls made.
    pub fn call_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn deliver(&self, user_ids: &[Uuid], message: &PushMessage) -> Result<usize> {
        if *self.transport_error.lock().unwrap() {
            return Err(Error::Push("mock transport error".to_string()));
        }

        self.deliveries.lock().unwrap().push(RecordedDelivery {
            user_ids: user_ids.to_vec(),
            message: message.clone(),
        });

        let failing = self.failing_users.lock().unwrap();
        let sent = user_ids.iter().filter(|id| !failing.contains(id)).count();
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> PushMessage {
        PushMessage {
            title: "t".to_string(),
            body: "b".to_string(),
            data: None,
        }
    }

    #[tokio::test]
    async fn test_mock_records_and_counts() {
        let transport = MockPushTransport::new();
        let users = vec![Uuid::new_v4(), Uuid::new_v4()];

        let sent = transport.deliver(&users, &message()).await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(transport.deliveries()[0].user_ids, users);
    }

    #[tokio::test]
    async fn test_mock_failing_users_reduce_count() {
        let unlucky = Uuid::new_v4();
        let transport = MockPushTransport::new().with_failing_users(vec![unlucky]);

        let sent = transport
            .deliver(&[unlucky, Uuid::new_v4()], &message())
            .await
            .unwrap();
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn test_mock_transport_error() {
        let transport = MockPushTransport::new().with_transport_error();
        let result = transport.deliver(&[Uuid::new_v4()], &message()).await;
        assert!(result.is_err());
    }
}
