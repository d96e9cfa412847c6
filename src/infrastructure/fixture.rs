use super::in_memory::{
    ConfigurationDocument, InMemoryConfiguration, InMemoryEntityStore, InMemoryGateway,
    InMemoryNotificationHub, InMemoryPaymentMethodRegistry,
};
use crate::application::dispatcher::WebhookDispatcher;
use crate::application::engine::WebhookReconciler;
use crate::domain::ports::PaymentMethod;
use crate::domain::transaction::{EntityRef, PaymentTransaction, ShopOrder};
use crate::domain::webhook::{CallbackEvent, RemoteOrder, RemotePayment, WebhookRequest};
use crate::error::Result;
use serde::Deserialize;

/// A recorded webhook delivery together with everything needed to replay it offline.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileFixture {
    #[serde(default)]
    pub configuration: ConfigurationDocument,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub orders: Vec<FixtureOrder>,
    #[serde(default)]
    pub payments: Vec<RemotePayment>,
    #[serde(default)]
    pub remote_orders: Vec<RemoteOrder>,
    pub event: FixtureEvent,
}

#[derive(Debug, Deserialize)]
pub struct FixtureOrder {
    pub entity: EntityRef,
    pub order: ShopOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureEvent {
    #[serde(default = "default_event_name")]
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub transaction: Option<PaymentTransaction>,
    /// Raw request body; no body means the request context is missing altogether.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default = "default_main_request")]
    pub main_request: bool,
}

fn default_event_name() -> String {
    "notify".to_string()
}

fn default_main_request() -> bool {
    true
}

/// The reconciler wired to in-memory adapters, plus handles to inspect them afterwards.
pub struct LoadedFixture {
    pub reconciler: WebhookReconciler,
    pub entities: InMemoryEntityStore,
    pub notifications: InMemoryNotificationHub,
    pub gateway: InMemoryGateway,
    pub event: CallbackEvent,
    pub request: Option<WebhookRequest>,
}

impl ReconcileFixture {
    /// Parses a fixture file.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Seeds fresh in-memory adapters with the fixture and wires a reconciler over them.
    pub async fn load(self) -> LoadedFixture {
        let configuration = InMemoryConfiguration::from_document(self.configuration);

        let registry = InMemoryPaymentMethodRegistry::new();
        for method in self.payment_methods {
            registry.register(method);
        }

        let entities = InMemoryEntityStore::new();
        for fixture in self.orders {
            entities.insert_order(fixture.entity, fixture.order).await;
        }

        let gateway = InMemoryGateway::new();
        for payment in self.payments {
            gateway.insert_payment(payment).await;
        }
        for order in self.remote_orders {
            gateway.insert_order(order).await;
        }

        let notifications = InMemoryNotificationHub::new();
        let reconciler = WebhookReconciler::new(
            Box::new(configuration),
            Box::new(registry),
            Box::new(entities.clone()),
            Box::new(notifications.clone()),
            WebhookDispatcher::new(Box::new(gateway.clone())),
        );

        let request = self.event.body.map(|body| WebhookRequest {
            content: body,
            main_request: self.event.main_request,
        });
        let event = CallbackEvent::new(self.event.name, self.event.data, self.event.transaction);

        LoadedFixture {
            reconciler,
            entities,
            notifications,
            gateway,
            event,
            request,
        }
    }
}
