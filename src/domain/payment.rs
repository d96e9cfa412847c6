use super::amount::Amount;
use super::order::Address;
use serde::{Deserialize, Serialize};

/// Gateway method code for PayPal, the only method that needs delivery data on payment creation.
pub const PAYPAL: &str = "paypal";

/// Methods for which the payments API expects a shipping address.
pub fn requires_shipping_address(method: &str) -> bool {
    method == PAYPAL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub description: String,
    pub amount: Amount,
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
}

/// Status of a payment or order resource as reported by the gateway.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Open,
    Pending,
    Authorized,
    Paid,
    Shipping,
    Completed,
    Canceled,
    Expired,
    Failed,
}

impl PaymentStatus {
    /// Statuses after which the shop may consider the transaction successful.
    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Authorized
                | PaymentStatus::Paid
                | PaymentStatus::Shipping
                | PaymentStatus::Completed
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Canceled | PaymentStatus::Expired | PaymentStatus::Failed
        )
    }
}
