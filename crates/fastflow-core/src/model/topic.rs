//! Topic specification

use serde::{Deserialize, Serialize};

/// A publish/subscribe topic fanning records out to subscribed queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    pub name: String,
    #[serde(default)]
    pub fifo: bool,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSpec>,
}

/// Subscription of a queue to a topic. `queue` is the logical queue name
/// declared in the same flow; it is resolved to the queue's identifier at
/// subscription-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    pub queue: String,
}
