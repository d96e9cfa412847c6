use super::payment::PaymentStatus;
use super::refund::Refund;
use super::shipment::Shipment;
use serde::{Deserialize, Serialize};

/// Opaque class + identifier pair the persistence layer resolves entities by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub class: String,
    pub identifier: String,
}

impl EntityRef {
    pub fn new(class: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            identifier: identifier.into(),
        }
    }
}

/// The shop-side payment transaction a webhook refers to.
///
/// Owned by the persistence collaborator; the engine only flips its success flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub id: u64,
    pub payment_method: String,
    pub entity_class: String,
    pub entity_identifier: String,
    #[serde(default)]
    pub successful: bool,
}

impl PaymentTransaction {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(&self.entity_class, &self.entity_identifier)
    }

    pub fn set_successful(&mut self, successful: bool) {
        self.successful = successful;
    }
}

/// Last known local state of a shop order, as far as the gateway is concerned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopOrder {
    pub id: String,
    /// Gateway resource (`tr_...` or `ord_...`) this order was submitted as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_status: Option<PaymentStatus>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
    #[serde(default)]
    pub shipments: Vec<Shipment>,
}

impl ShopOrder {
    /// Creates an order not yet known to the gateway.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.gateway_reference = Some(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_entity_ref() {
        let mut tx = PaymentTransaction {
            id: 7,
            payment_method: "mollie_1".to_string(),
            entity_class: "Order".to_string(),
            entity_identifier: "42".to_string(),
            successful: true,
        };
        assert_eq!(tx.entity(), EntityRef::new("Order", "42"));

        tx.set_successful(false);
        assert!(!tx.successful);
    }

    #[test]
    fn test_shop_order_deserialization_defaults() {
        let order: ShopOrder = serde_json::from_str(r#"{"id": "42"}"#).unwrap();
        assert_eq!(order, ShopOrder::new("42"));
        assert!(order.refunds.is_empty());
    }
}
