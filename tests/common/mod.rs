#![allow(dead_code)]

use molliesync::application::dispatcher::WebhookDispatcher;
use molliesync::application::engine::WebhookReconciler;
use molliesync::domain::amount::Amount;
use molliesync::domain::context::ChannelConfig;
use molliesync::domain::payment::PaymentStatus;
use molliesync::domain::ports::{ConfigurationService, PaymentMethod, PaymentMethodConfig};
use molliesync::domain::refund::{Refund, RefundStatus};
use molliesync::domain::transaction::{EntityRef, PaymentTransaction, ShopOrder};
use molliesync::domain::webhook::{CallbackEvent, RemotePayment};
use molliesync::infrastructure::in_memory::{
    InMemoryConfiguration, InMemoryEntityStore, InMemoryGateway, InMemoryNotificationHub,
    InMemoryPaymentMethodRegistry,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ORDER_CLASS: &str = "Order";

/// Configuration that counts channel lookups, i.e. context activations.
#[derive(Clone, Default)]
pub struct CountingConfiguration {
    inner: InMemoryConfiguration,
    lookups: Arc<AtomicUsize>,
}

impl CountingConfiguration {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ConfigurationService for CountingConfiguration {
    fn is_debug_mode_enabled(&self) -> bool {
        self.inner.is_debug_mode_enabled()
    }

    fn set_debug_mode_enabled(&self, enabled: bool) {
        self.inner.set_debug_mode_enabled(enabled)
    }

    fn channel_config(&self, channel_id: &str) -> Option<ChannelConfig> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.channel_config(channel_id)
    }
}

/// A reconciler over in-memory adapters with two channels:
/// `mollie_1` pays through channel "1", `mollie_2` through channel "2".
pub struct Harness {
    pub reconciler: Arc<WebhookReconciler>,
    pub configuration: CountingConfiguration,
    pub payment_methods: InMemoryPaymentMethodRegistry,
    pub entities: InMemoryEntityStore,
    pub notifications: InMemoryNotificationHub,
    pub gateway: InMemoryGateway,
}

pub fn channel_config(api_key: &str) -> ChannelConfig {
    ChannelConfig {
        api_key: api_key.to_string(),
        profile_id: "pfl_QkEhN94Ba".to_string(),
        test_mode: true,
        webhook_url: None,
    }
}

pub fn harness() -> Harness {
    let configuration = CountingConfiguration::default();
    configuration
        .inner
        .insert_channel("1", channel_config("test_channel_one"));
    configuration
        .inner
        .insert_channel("2", channel_config("test_channel_two"));

    let payment_methods = InMemoryPaymentMethodRegistry::new();
    for (identifier, channel_id) in [("mollie_1", "1"), ("mollie_2", "2")] {
        payment_methods.register(PaymentMethod {
            identifier: identifier.to_string(),
            config: PaymentMethodConfig {
                channel_id: channel_id.to_string(),
            },
        });
    }

    let entities = InMemoryEntityStore::new();
    let notifications = InMemoryNotificationHub::new();
    let gateway = InMemoryGateway::new();
    let reconciler = WebhookReconciler::new(
        Box::new(configuration.clone()),
        Box::new(payment_methods.clone()),
        Box::new(entities.clone()),
        Box::new(notifications.clone()),
        WebhookDispatcher::new(Box::new(gateway.clone())),
    );

    Harness {
        reconciler: Arc::new(reconciler),
        configuration,
        payment_methods,
        entities,
        notifications,
        gateway,
    }
}

pub fn transaction(id: u64, payment_method: &str, order_id: &str) -> PaymentTransaction {
    PaymentTransaction {
        id,
        payment_method: payment_method.to_string(),
        entity_class: ORDER_CLASS.to_string(),
        entity_identifier: order_id.to_string(),
        successful: false,
    }
}

pub fn notify_event(transaction: Option<PaymentTransaction>) -> CallbackEvent {
    CallbackEvent::new("notify", serde_json::json!({"source": "webhook"}), transaction)
}

pub fn eur(value: Decimal) -> Amount {
    Amount::new(value, "EUR")
}

pub fn remote_payment(id: &str, status: PaymentStatus, value: Decimal) -> RemotePayment {
    RemotePayment {
        id: id.to_string(),
        status,
        amount: eur(value),
        order_id: None,
        refunds: Vec::new(),
        metadata: None,
    }
}

pub fn refund(id: &str, status: RefundStatus, value: Decimal) -> Refund {
    Refund {
        id: Some(id.to_string()),
        status: Some(status),
        amount: eur(value),
        description: None,
        metadata: None,
        lines: Vec::new(),
    }
}

impl Harness {
    pub async fn seed_order(&self, order: ShopOrder) -> EntityRef {
        let entity = EntityRef::new(ORDER_CLASS, order.id.clone());
        self.entities.insert_order(entity.clone(), order).await;
        entity
    }
}
