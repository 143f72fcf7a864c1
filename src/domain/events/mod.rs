//! Domain events raised by aggregates and fanned out by the sync relay.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Product,
    Category,
    Review,
    Order,
    User,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Review => "review",
            Self::Order => "order",
            Self::User => "user",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainEvent {
    pub topic: Topic,
    pub action: Action,
    pub entity_id: String,
}

impl DomainEvent {
    pub fn new(topic: Topic, action: Action, entity_id: impl Into<String>) -> Self {
        Self { topic, action, entity_id: entity_id.into() }
    }
}

/// Order lifecycle events. Each maps onto a sync `order/*` notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    Created { order_id: String, user_id: String },
    Confirmed { order_id: String },
    Paid { order_id: String },
    Shipped { order_id: String },
    Delivered { order_id: String },
    Cancelled { order_id: String },
}

impl From<OrderEvent> for DomainEvent {
    fn from(e: OrderEvent) -> Self {
        match e {
            OrderEvent::Created { order_id, .. } => DomainEvent::new(Topic::Order, Action::Created, order_id),
            OrderEvent::Confirmed { order_id }
            | OrderEvent::Paid { order_id }
            | OrderEvent::Shipped { order_id }
            | OrderEvent::Delivered { order_id }
            | OrderEvent::Cancelled { order_id } => DomainEvent::new(Topic::Order, Action::Updated, order_id),
        }
    }
}
