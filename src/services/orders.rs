//! Order record store operations.

use std::sync::Arc;

use crate::domain::aggregates::{NewOrder, Order};
use crate::domain::events::{Action, DomainEvent, Topic};
use crate::domain::value_objects::OrderId;
use crate::error::{AppError, AppResult};
use crate::storage::{OrderRepository, Page};
use crate::sync::SyncRelay;
use crate::whatsapp::WhatsApp;

/// Admin-driven partial updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderUpdate {
    MarkPaid,
    MarkDelivered,
    ConfirmByWhatsApp,
    Ship,
    Cancel,
}

impl OrderUpdate {
    fn apply(self, order: &mut Order) -> AppResult<()> {
        match self {
            Self::MarkPaid => order.mark_paid()?,
            Self::MarkDelivered => order.mark_delivered()?,
            Self::ConfirmByWhatsApp => order.confirm_by_whatsapp()?,
            Self::Ship => order.ship()?,
            Self::Cancel => order.cancel()?,
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub whatsapp_url: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    relay: Arc<SyncRelay>,
    whatsapp: Option<WhatsApp>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, relay: Arc<SyncRelay>, whatsapp: Option<WhatsApp>) -> Self {
        Self { orders, relay, whatsapp }
    }

    /// Always creates a new record: identical requests yield distinct orders.
    pub async fn create(&self, new: NewOrder) -> AppResult<PlacedOrder> {
        let mut order = Order::place(new)?;
        if !order.total_matches_lines() {
            tracing::warn!(
                order_id = %order.id(),
                client_total = %order.total(),
                items_price = %order.items_price(),
                shipping_price = %order.shipping_price(),
                "Order total does not match its lines, keeping client value"
            );
        }
        self.orders.insert(&order).await?;
        self.relay.publish_all(order.take_events().into_iter().map(DomainEvent::from));
        tracing::info!(order_id = %order.id(), user_id = order.user_id(), total = %order.total(), "Order placed");

        let whatsapp_url = self.whatsapp.as_ref().map(|w| w.link_for(&order));
        Ok(PlacedOrder { order, whatsapp_url })
    }

    pub async fn get(&self, id: &str) -> AppResult<Order> {
        let id = OrderId::parse(id)?;
        self.orders.get(&id).await?.ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    pub async fn list(&self, page: Page) -> AppResult<(Vec<Order>, u64)> {
        Ok(self.orders.list(page).await?)
    }

    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Order>> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    pub async fn update(&self, id: &str, update: OrderUpdate) -> AppResult<Order> {
        let mut order = self.get(id).await?;
        update.apply(&mut order)?;
        if !self.orders.update(&order).await? {
            // Deleted between read and write.
            return Err(AppError::NotFound(format!("order {}", order.id())));
        }
        self.relay.publish_all(order.take_events().into_iter().map(DomainEvent::from));
        tracing::info!(order_id = %order.id(), ?update, status = %order.status(), "Order updated");
        Ok(order)
    }

    pub async fn mark_paid(&self, id: &str) -> AppResult<Order> {
        self.update(id, OrderUpdate::MarkPaid).await
    }

    pub async fn mark_delivered(&self, id: &str) -> AppResult<Order> {
        self.update(id, OrderUpdate::MarkDelivered).await
    }

    pub async fn confirm_by_whatsapp(&self, id: &str) -> AppResult<Order> {
        self.update(id, OrderUpdate::ConfirmByWhatsApp).await
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let parsed = OrderId::parse(id)?;
        if !self.orders.delete(&parsed).await? {
            return Err(AppError::NotFound(format!("order {id}")));
        }
        self.relay.publish(DomainEvent::new(Topic::Order, Action::Deleted, id));
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::new_order;
    use crate::domain::aggregates::OrderStatus;
    use crate::storage::file::FileStore;
    use crate::storage::Repositories;
    use rust_decimal::Decimal;

    async fn service(dir: &std::path::Path) -> (OrderService, Arc<SyncRelay>) {
        let repos = Repositories::from_store(FileStore::open(dir).await.unwrap());
        let relay = SyncRelay::new(64, None);
        (OrderService::new(repos.orders, relay.clone(), None), relay)
    }

    #[tokio::test]
    async fn test_identical_requests_are_not_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let (orders, _) = service(dir.path()).await;
        let a = orders.create(new_order(Decimal::new(11498, 2))).await.unwrap();
        let b = orders.create(new_order(Decimal::new(11498, 2))).await.unwrap();
        assert_ne!(a.order.id(), b.order.id());
        assert_eq!(orders.list(Page::default()).await.unwrap().1, 2);
    }

    #[tokio::test]
    async fn test_paid_then_delivered_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (orders, relay) = service(dir.path()).await;
        let placed = orders.create(new_order(Decimal::new(11498, 2))).await.unwrap();
        let id = placed.order.id().to_string();

        orders.mark_paid(&id).await.unwrap();
        orders.mark_delivered(&id).await.unwrap();

        let stored = orders.get(&id).await.unwrap();
        assert!(stored.is_paid() && stored.is_delivered());
        assert_eq!(stored.status(), OrderStatus::Delivered);
        assert_eq!(relay.latest(), 3);
    }

    #[tokio::test]
    async fn test_backward_transition_is_rejected_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let (orders, _) = service(dir.path()).await;
        let id = orders.create(new_order(Decimal::ONE)).await.unwrap().order.id().to_string();
        orders.update(&id, OrderUpdate::Ship).await.unwrap();
        let err = orders.confirm_by_whatsapp(&id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(orders.get(&id).await.unwrap().status(), OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_order_from_client_cart() {
        use crate::domain::aggregates::{Cart, CartItem};

        let dir = tempfile::tempdir().unwrap();
        let (orders, _) = service(dir.path()).await;
        let mut cart = Cart::new();
        cart.add_item(CartItem { product_id: "p9".into(), name: "Brass Lamp".into(), unit_price: Decimal::new(4000, 2), quantity: 1, image_ref: None }).unwrap();
        cart.add_item(CartItem { product_id: "p9".into(), name: "Brass Lamp".into(), unit_price: Decimal::new(4000, 2), quantity: 1, image_ref: None }).unwrap();

        let mut new = new_order(cart.subtotal());
        new.items = cart.to_order_items();
        new.shipping_price = Decimal::ZERO;
        let placed = orders.create(new).await.unwrap();
        assert_eq!(placed.order.items().len(), 1);
        assert_eq!(placed.order.items()[0].quantity, 2);
        assert!(placed.order.total_matches_lines());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (orders, relay) = service(dir.path()).await;
        assert!(matches!(orders.delete("ORD-1-00000000").await, Err(AppError::NotFound(_))));
        assert!(matches!(orders.delete("garbage").await, Err(AppError::NotFound(_))));
        assert_eq!(relay.latest(), 0);
    }
}
