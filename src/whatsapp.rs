//! WhatsApp confirmation links.
//!
//! Orders are not paid online. The storefront hands the shopper a `wa.me`
//! link pre-filled with the order summary; the shop confirms by hand.

use crate::config::WhatsAppConfig;
use crate::domain::aggregates::Order;

#[derive(Clone, Debug)]
pub struct WhatsApp {
    number: String,
    store_name: String,
}

impl WhatsApp {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self { number: config.number.clone(), store_name: config.store_name.clone() }
    }

    pub fn message_for(&self, order: &Order) -> String {
        let items = order
            .items()
            .iter()
            .map(|item| format!("- {} x {} @ {}", item.quantity, item.name, item.unit_price))
            .collect::<Vec<_>>()
            .join("\n");
        let a = order.shipping_address();
        format!(
            "Hello {store}! I would like to confirm my order {id}.\n\n{items}\n\n\
             Shipping: {shipping}\nTotal: {total}\nPayment: {payment}\n\n\
             Deliver to: {name}, {street}, {postal} {city}, {country}\nPhone: {phone}",
            store = self.store_name,
            id = order.id(),
            shipping = order.shipping_price(),
            total = order.total(),
            payment = order.payment_method().as_str(),
            name = a.full_name,
            street = a.street,
            postal = a.postal_code,
            city = a.city,
            country = a.country,
            phone = a.phone,
        )
    }

    pub fn link_for(&self, order: &Order) -> String {
        format!("https://wa.me/{}?text={}", self.number, urlencoding::encode(&self.message_for(order)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::new_order;
    use rust_decimal::Decimal;

    fn whatsapp() -> WhatsApp {
        WhatsApp::new(&WhatsAppConfig { number: "212600000000".into(), store_name: "Atlas Crafts".into() })
    }

    #[test]
    fn test_message_lists_order() {
        let order = Order::place(new_order(Decimal::new(11498, 2))).unwrap();
        let msg = whatsapp().message_for(&order);
        assert!(msg.contains(order.id().as_str()));
        assert!(msg.contains("- 2 x Woven Basket @ 24.99"));
        assert!(msg.contains("Total: 114.98"));
        assert!(msg.contains("Amina Diallo"));
        assert!(msg.contains("- 1 x Clay Vase @ 55.00\n- 2 x Woven Basket @ 24.99\n\nShipping: 10.00\nTotal: 114.98\n"));
        assert!(msg.ends_with("Phone: +212600000000"));
    }

    #[test]
    fn test_link_is_encoded() {
        let order = Order::place(new_order(Decimal::new(11498, 2))).unwrap();
        let link = whatsapp().link_for(&order);
        assert!(link.starts_with("https://wa.me/212600000000?text=Hello%20Atlas%20Crafts"));
        assert!(!link.contains('\n'));
    }
}
