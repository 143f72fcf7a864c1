//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::events::OrderEvent;
use crate::domain::value_objects::OrderId;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub(crate) id: OrderId,
    pub(crate) user_id: String,
    pub(crate) items: Vec<OrderItem>,
    pub(crate) items_price: Decimal,
    pub(crate) shipping_price: Decimal,
    pub(crate) total: Decimal,
    pub(crate) shipping_address: ShippingAddress,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) status: OrderStatus,
    pub(crate) is_paid: bool,
    pub(crate) paid_at: Option<DateTime<Utc>>,
    pub(crate) is_delivered: bool,
    pub(crate) delivered_at: Option<DateTime<Utc>>,
    pub(crate) confirmed_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<OrderEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    #[validate(length(min = 1, message = "item name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl OrderItem {
    /// `None` when the line does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> { self.unit_price.checked_mul(Decimal::from(self.quantity)) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "fullName is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "postalCode is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
    #[validate(length(min = 5, max = 20, message = "phone must be 5-20 characters"))]
    pub phone: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    Whatsapp,
    CashOnDelivery,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self { Self::Whatsapp => "whatsapp", Self::CashOnDelivery => "cash-on-delivery", Self::BankTransfer => "bank-transfer" }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value { "whatsapp" => Some(Self::Whatsapp), "cash-on-delivery" => Some(Self::CashOnDelivery), "bank-transfer" => Some(Self::BankTransfer), _ => None }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    fn rank(self) -> u8 {
        match self { Self::Pending => 0, Self::Confirmed => 1, Self::Shipped => 2, Self::Delivered => 3, Self::Cancelled => 4 }
    }

    /// Forward along pending → confirmed → shipped → delivered (skipping allowed),
    /// or sideways to cancelled from any non-terminal status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() { return false; }
        next == Self::Cancelled || next.rank() > self.rank()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Everything the shopper supplies when placing an order.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_price: Decimal,
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

impl Order {
    /// The client total is kept verbatim; it is not recomputed from the lines.
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        if new.items.is_empty() { return Err(OrderError::NoItems); }
        if new.items.iter().any(|i| i.quantity == 0) { return Err(OrderError::InvalidQuantity); }
        let negative = new.items.iter().map(|i| i.unit_price).chain([new.shipping_price, new.total]).any(|a| a < Decimal::ZERO);
        if negative { return Err(OrderError::NegativeAmount); }
        let items_price = new
            .items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| item.line_total().and_then(|line| sum.checked_add(line)))
            .ok_or(OrderError::AmountOverflow)?;
        let now = Utc::now();
        let id = OrderId::at(now);
        let mut order = Self {
            id: id.clone(), user_id: new.user_id.clone(), items: new.items, items_price,
            shipping_price: new.shipping_price, total: new.total, shipping_address: new.shipping_address,
            payment_method: new.payment_method, status: OrderStatus::Pending, is_paid: false, paid_at: None,
            is_delivered: false, delivered_at: None, confirmed_at: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(OrderEvent::Created { order_id: id.to_string(), user_id: new.user_id });
        Ok(order)
    }

    pub fn id(&self) -> &OrderId { &self.id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn items_price(&self) -> Decimal { self.items_price }
    pub fn shipping_price(&self) -> Decimal { self.shipping_price }
    pub fn total(&self) -> Decimal { self.total }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn is_paid(&self) -> bool { self.is_paid }
    pub fn is_delivered(&self) -> bool { self.is_delivered }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// True when the client total equals line items plus shipping.
    pub fn total_matches_lines(&self) -> bool { self.items_price.checked_add(self.shipping_price) == Some(self.total) }

    pub fn confirm_by_whatsapp(&mut self) -> Result<(), OrderError> {
        self.advance(OrderStatus::Confirmed)?;
        self.confirmed_at = Some(Utc::now());
        self.raise_event(OrderEvent::Confirmed { order_id: self.id.to_string() });
        Ok(())
    }

    /// Records payment; a pending order is promoted to confirmed.
    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Confirmed });
        }
        if self.is_paid { return Err(OrderError::AlreadyPaid); }
        let now = Utc::now();
        self.is_paid = true;
        self.paid_at = Some(now);
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Confirmed;
            self.confirmed_at = Some(now);
        }
        self.touch();
        self.raise_event(OrderEvent::Paid { order_id: self.id.to_string() });
        Ok(())
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        self.advance(OrderStatus::Shipped)?;
        self.raise_event(OrderEvent::Shipped { order_id: self.id.to_string() });
        Ok(())
    }

    /// Does not require `is_paid`: WhatsApp orders are often settled offline.
    pub fn mark_delivered(&mut self) -> Result<(), OrderError> {
        self.advance(OrderStatus::Delivered)?;
        self.is_delivered = true;
        self.delivered_at = Some(Utc::now());
        self.raise_event(OrderEvent::Delivered { order_id: self.id.to_string() });
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.advance(OrderStatus::Cancelled)?;
        self.raise_event(OrderEvent::Cancelled { order_id: self.id.to_string() });
        Ok(())
    }

    fn advance(&mut self, to: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NoItems,
    InvalidQuantity,
    NegativeAmount,
    AmountOverflow,
    AlreadyPaid,
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order must contain at least one item"),
            Self::InvalidQuantity => write!(f, "Item quantity must be at least 1"),
            Self::NegativeAmount => write!(f, "Prices and totals cannot be negative"),
            Self::AmountOverflow => write!(f, "Order amount is too large"),
            Self::AlreadyPaid => write!(f, "Order is already paid"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {from} to {to}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Amina Diallo".into(), street: "12 Weaver Lane".into(), city: "Marrakesh".into(),
            postal_code: "40000".into(), country: "Morocco".into(), phone: "+212600000000".into(),
        }
    }

    pub(crate) fn new_order(total: Decimal) -> NewOrder {
        NewOrder {
            user_id: "user-1".into(),
            items: vec![
                OrderItem { product_id: "p1".into(), name: "Clay Vase".into(), quantity: 1, unit_price: Decimal::new(5500, 2), image_ref: None },
                OrderItem { product_id: "p2".into(), name: "Woven Basket".into(), quantity: 2, unit_price: Decimal::new(2499, 2), image_ref: None },
            ],
            shipping_price: Decimal::new(1000, 2),
            total,
            shipping_address: address(),
            payment_method: PaymentMethod::Whatsapp,
        }
    }

    #[test]
    fn test_place_keeps_client_total() {
        let order = Order::place(new_order(Decimal::new(11498, 2))).unwrap();
        assert_eq!(order.items_price(), Decimal::new(10498, 2));
        assert_eq!(order.total(), Decimal::new(11498, 2));
        assert!(order.total_matches_lines());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(!order.is_paid() && !order.is_delivered());

        let skewed = Order::place(new_order(Decimal::new(1, 0))).unwrap();
        assert_eq!(skewed.total(), Decimal::new(1, 0));
        assert!(!skewed.total_matches_lines());
    }

    #[test]
    fn test_place_requires_items() {
        let mut input = new_order(Decimal::ZERO);
        input.items.clear();
        assert_eq!(Order::place(input).unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_place_rejects_overflowing_lines() {
        let mut input = new_order(Decimal::ONE);
        input.items[1].unit_price = Decimal::MAX;
        assert_eq!(Order::place(input).unwrap_err(), OrderError::AmountOverflow);

        let mut input = new_order(Decimal::ONE);
        input.items[0].unit_price = Decimal::MAX;
        input.items[1].unit_price = Decimal::MAX;
        input.items[1].quantity = 1;
        assert_eq!(Order::place(input).unwrap_err(), OrderError::AmountOverflow);
    }

    #[test]
    fn test_total_check_does_not_overflow() {
        let mut input = new_order(Decimal::MAX);
        input.items.truncate(1);
        input.items[0].unit_price = Decimal::MAX;
        input.shipping_price = Decimal::ONE;
        let order = Order::place(input).unwrap();
        assert!(!order.total_matches_lines());
    }

    #[test]
    fn test_place_rejects_negative_amounts() {
        let mut input = new_order(Decimal::new(11498, 2));
        input.items[0].unit_price = Decimal::new(-1, 0);
        assert_eq!(Order::place(input).unwrap_err(), OrderError::NegativeAmount);

        let mut input = new_order(Decimal::new(11498, 2));
        input.shipping_price = Decimal::new(-500, 2);
        assert_eq!(Order::place(input).unwrap_err(), OrderError::NegativeAmount);

        assert_eq!(Order::place(new_order(Decimal::new(-1, 0))).unwrap_err(), OrderError::NegativeAmount);
    }

    #[test]
    fn test_paid_then_delivered() {
        let mut order = Order::place(new_order(Decimal::new(11498, 2))).unwrap();
        order.mark_paid().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        order.mark_delivered().unwrap();
        assert!(order.is_paid() && order.is_delivered());
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.take_events().len(), 3);
    }

    #[test]
    fn test_delivered_without_payment_is_allowed() {
        let mut order = Order::place(new_order(Decimal::new(11498, 2))).unwrap();
        order.mark_delivered().unwrap();
        assert!(!order.is_paid());
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_no_backward_moves() {
        let mut order = Order::place(new_order(Decimal::new(11498, 2))).unwrap();
        order.ship().unwrap();
        assert!(matches!(order.confirm_by_whatsapp(), Err(OrderError::InvalidTransition { .. })));
        order.cancel().unwrap();
        assert!(order.mark_delivered().is_err());
        assert!(order.mark_paid().is_err());
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Delivered));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }
}
