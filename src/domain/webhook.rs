use super::amount::Amount;
use super::payment::PaymentStatus;
use super::refund::Refund;
use super::shipment::Shipment;
use super::transaction::PaymentTransaction;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// The host's callback event wrapping one inbound gateway notification.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub event_name: String,
    pub data: serde_json::Value,
    pub transaction: Option<PaymentTransaction>,
    successful: bool,
    propagation_stopped: bool,
}

impl CallbackEvent {
    pub fn new(
        event_name: impl Into<String>,
        data: serde_json::Value,
        transaction: Option<PaymentTransaction>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            data,
            transaction,
            successful: false,
            propagation_stopped: false,
        }
    }

    /// Acknowledges the notification so the gateway does not redeliver it.
    pub fn mark_successful(&mut self) {
        self.successful = true;
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// The HTTP request that carried the notification.
///
/// Only a top-level request has a body worth reconciling; sub-requests forwarded inside
/// the host are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub content: String,
    pub main_request: bool,
}

impl WebhookRequest {
    pub fn main(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            main_request: true,
        }
    }

    pub fn sub(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            main_request: false,
        }
    }
}

/// The gateway resource a webhook body points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Payment(String),
    Order(String),
}

impl ResourceRef {
    /// Reads the resource id from a webhook body.
    ///
    /// The gateway posts `id=tr_xxx` form-encoded; a JSON body `{"id": "..."}` is accepted too.
    pub fn parse_payload(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let id = if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed)?;
            value
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        } else {
            url::form_urlencoded::parse(trimmed.as_bytes())
                .find(|(key, _)| key == "id")
                .map(|(_, value)| value.into_owned())
        };

        match id {
            Some(id) if !id.is_empty() => Self::from_id(id),
            _ => Err(GatewayError::MalformedPayload(format!(
                "No resource id in webhook body '{}'",
                trimmed
            ))),
        }
    }

    pub fn from_id(id: String) -> Result<Self> {
        if id.starts_with("tr_") {
            Ok(Self::Payment(id))
        } else if id.starts_with("ord_") {
            Ok(Self::Order(id))
        } else {
            Err(GatewayError::UnsupportedResource(id))
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Payment(id) | Self::Order(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePayment {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: Amount,
    /// Set when the payment was created through the orders API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOrder {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: Amount,
    #[serde(default)]
    pub refunds: Vec<Refund>,
    #[serde(default)]
    pub shipments: Vec<Shipment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Payment,
    Order,
    Refund,
    Shipment,
}

/// One state change reported by the gateway, ready to be applied to a shop order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Payment { id: String, status: PaymentStatus },
    Order { id: String, status: PaymentStatus },
    Refund(Refund),
    Shipment(Shipment),
}

impl GatewayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GatewayEvent::Payment { .. } => EventKind::Payment,
            GatewayEvent::Order { .. } => EventKind::Order,
            GatewayEvent::Refund(_) => EventKind::Refund,
            GatewayEvent::Shipment(_) => EventKind::Shipment,
        }
    }
}
