//! Envelope construction for subscriber delivery (spec §4.10).

use std::collections::BTreeMap;

use serde_json::{json, Value};

/// Wrap a topic publish for an SQS subscriber: `{"Type":"Notification",...}`.
/// When `raw_message_delivery` is set, the raw message is forwarded instead.
pub fn sns_to_sqs_envelope(
    message_id: &str,
    topic_arn: &str,
    message: &str,
    timestamp: &str,
    message_attributes: &BTreeMap<String, String>,
    raw_message_delivery: bool,
) -> Value {
    if raw_message_delivery {
        return serde_json::from_str(message).unwrap_or_else(|_| json!(message));
    }
    json!({
        "Type": "Notification",
        "MessageId": message_id,
        "TopicArn": topic_arn,
        "Message": message,
        "Timestamp": timestamp,
        "MessageAttributes": message_attributes,
    })
}

/// Build the Lambda event-source records list for a topic → Lambda
/// subscription: `{"Records":[{"EventSource":"aws:sns","Sns":{...}}]}`.
pub fn sns_to_lambda_envelope(
    message_id: &str,
    topic_arn: &str,
    message: &str,
    timestamp: &str,
    message_attributes: &BTreeMap<String, String>,
) -> Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": {
                "MessageId": message_id,
                "TopicArn": topic_arn,
                "Message": message,
                "Timestamp": timestamp,
                "MessageAttributes": message_attributes,
            }
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_message_delivery_forwards_message_verbatim() {
        let attrs = BTreeMap::new();
        let env = sns_to_sqs_envelope("id-1", "arn:topic", "{\"k\":1}", "t", &attrs, true);
        assert_eq!(env, json!({"k": 1}));
    }

    #[test]
    fn default_delivery_wraps_in_notification_envelope() {
        let attrs = BTreeMap::new();
        let env = sns_to_sqs_envelope("id-1", "arn:topic", "hello", "t", &attrs, false);
        assert_eq!(env["Type"], "Notification");
        assert_eq!(env["Message"], "hello");
    }

    #[test]
    fn lambda_envelope_wraps_records_list() {
        let attrs = BTreeMap::new();
        let env = sns_to_lambda_envelope("id-1", "arn:topic", "hello", "t", &attrs);
        assert_eq!(env["Records"][0]["EventSource"], "aws:sns");
    }
}
