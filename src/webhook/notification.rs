//! Inbound notification bodies.
//!
//! Providers send loosely shaped JSON. The fields that matter are the topic
//! (`topic`, else `type`) and the resource id: the last segment of `resource`,
//! else `_id`, else `data.id`.

use serde_json::Value;

/// Topic under which payment notifications arrive
pub const PAYMENT_TOPIC: &str = "payment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Payment { payment_id: String },
    Other { topic: String, resource_id: String },
}

impl Notification {
    pub fn new(topic: &str, resource_id: &str) -> Self {
        if topic == PAYMENT_TOPIC {
            Notification::Payment {
                payment_id: resource_id.to_string(),
            }
        } else {
            Notification::Other {
                topic: topic.to_string(),
                resource_id: resource_id.to_string(),
            }
        }
    }

    /// Parses a notification body. `None` when the topic or resource id is missing.
    pub fn from_body(body: &Value) -> Option<Self> {
        let resource_id = resource_id(body)?;
        let topic = topic(body)?;
        Some(Self::new(&topic, &resource_id))
    }

    pub fn topic(&self) -> &str {
        match self {
            Notification::Payment { .. } => PAYMENT_TOPIC,
            Notification::Other { topic, .. } => topic,
        }
    }

    pub fn resource_id(&self) -> &str {
        match self {
            Notification::Payment { payment_id } => payment_id,
            Notification::Other { resource_id, .. } => resource_id,
        }
    }
}

/// Resource id referenced by a notification body.
pub fn resource_id(body: &Value) -> Option<String> {
    if let Some(resource) = body.get("resource").and_then(Value::as_str).filter(|r| !r.is_empty()) {
        return resource
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);
    }

    [body.get("_id"), body.pointer("/data/id")]
        .into_iter()
        .flatten()
        .find_map(id_value)
}

/// Notification topic (`topic`, falling back to `type`).
pub fn topic(body: &Value) -> Option<String> {
    ["topic", "type"]
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|topic| !topic.is_empty())
        .map(str::to_string)
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
