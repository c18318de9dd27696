//! NotificationSink trait implementation for LarkClient

use digest_core::{Deadline, DeliveryResult, Message, NotificationSink, Result};

use crate::client::LarkClient;

impl NotificationSink for LarkClient {
    fn deliver(&self, message: &Message, deadline: &Deadline) -> Result<DeliveryResult> {
        Ok(self.send(message, deadline)?)
    }
}
