//! Message shapes for the Queue + DLQ component (spec §4.11, §6 Queue).

use std::collections::BTreeMap;

use serde::Serialize;

/// A message sitting in a queue, either visible or in flight.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
    pub receive_count: u32,
    pub message_group_id: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, body: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        Message {
            id: id.into(),
            body: body.into(),
            attributes,
            receive_count: 0,
            message_group_id: None,
        }
    }
}

/// A message handed back from `ReceiveMessage`, carrying the opaque
/// receipt handle needed to delete it or change its visibility.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub receipt_handle: String,
}
