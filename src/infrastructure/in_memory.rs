use crate::domain::context::{ChannelConfig, ChannelContext};
use crate::domain::ports::{
    ConfigurationService, EntityStore, GatewayClient, NotificationHub, PaymentMethod,
    PaymentMethodRegistry,
};
use crate::domain::transaction::{EntityRef, PaymentTransaction, ShopOrder};
use crate::domain::webhook::{RemoteOrder, RemotePayment};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

/// Shape of the configuration file: `{"debugMode": false, "channels": {"1": {...}}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDocument {
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default)]
    pub channels: HashMap<String, ChannelConfig>,
}

/// Channel configurations held in memory.
///
/// Holds no request state: which channel applies is decided per call through a `ContextScope`.
#[derive(Default, Clone)]
pub struct InMemoryConfiguration {
    debug_mode: Arc<AtomicBool>,
    channels: Arc<std::sync::RwLock<HashMap<String, ChannelConfig>>>,
}

impl InMemoryConfiguration {
    /// Creates an empty configuration with debug mode off and no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from an already parsed configuration file.
    pub fn from_document(document: ConfigurationDocument) -> Self {
        Self {
            debug_mode: Arc::new(AtomicBool::new(document.debug_mode)),
            channels: Arc::new(std::sync::RwLock::new(document.channels)),
        }
    }

    /// Parses a configuration file.
    ///
    /// # Arguments
    ///
    /// * `raw` - JSON such as `{"debugMode": false, "channels": {"1": {"apiKey": "..."}}}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self::from_document(serde_json::from_str(raw)?))
    }

    /// Adds or replaces the configuration of one channel.
    pub fn insert_channel(&self, channel_id: impl Into<String>, config: ChannelConfig) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_id.into(), config);
    }
}

impl ConfigurationService for InMemoryConfiguration {
    fn is_debug_mode_enabled(&self) -> bool {
        self.debug_mode.load(Ordering::SeqCst)
    }

    fn set_debug_mode_enabled(&self, enabled: bool) {
        self.debug_mode.store(enabled, Ordering::SeqCst);
    }

    fn channel_config(&self, channel_id: &str) -> Option<ChannelConfig> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel_id)
            .cloned()
    }
}

/// A thread-safe in-memory stand-in for the shop's persistence layer.
///
/// Counts flushes so callers can tell whether anything was written.
#[derive(Default, Clone)]
pub struct InMemoryEntityStore {
    orders: Arc<RwLock<HashMap<EntityRef, ShopOrder>>>,
    transactions: Arc<RwLock<HashMap<u64, PaymentTransaction>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryEntityStore {
    /// Creates an empty store with a write count of zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order without counting it as a write.
    pub async fn insert_order(&self, entity: EntityRef, order: ShopOrder) {
        self.orders.write().await.insert(entity, order);
    }

    pub async fn order(&self, entity: &EntityRef) -> Option<ShopOrder> {
        self.orders.read().await.get(entity).cloned()
    }

    pub async fn transaction(&self, id: u64) -> Option<PaymentTransaction> {
        self.transactions.read().await.get(&id).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find_order(&self, entity: &EntityRef) -> Result<Option<ShopOrder>> {
        Ok(self.orders.read().await.get(entity).cloned())
    }

    async fn flush_order(&self, order: &ShopOrder) -> Result<()> {
        let mut orders = self.orders.write().await;
        let entity = orders
            .iter()
            .find(|(_, stored)| stored.id == order.id)
            .map(|(entity, _)| entity.clone())
            .ok_or_else(|| {
                GatewayError::StorageError(format!("Order {} is not managed", order.id))
            })?;
        orders.insert(entity, order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn flush_transaction(&self, transaction: &PaymentTransaction) -> Result<()> {
        self.transactions
            .write()
            .await
            .insert(transaction.id, transaction.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub subject_id: String,
}

#[derive(Default, Clone)]
pub struct InMemoryNotificationHub {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationHub {
    /// Creates a hub without notifications.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationHub for InMemoryNotificationHub {
    fn push_error(&self, title: &str, description: &str, subject_id: &str) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                title: title.to_string(),
                description: description.to_string(),
                subject_id: subject_id.to_string(),
            });
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentMethodRegistry {
    methods: Arc<std::sync::RwLock<HashMap<String, PaymentMethod>>>,
}

impl InMemoryPaymentMethodRegistry {
    /// Creates a registry without payment methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `method`, replacing any method with the same identifier.
    pub fn register(&self, method: PaymentMethod) {
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.identifier.clone(), method);
    }

    pub fn unregister(&self, identifier: &str) {
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier);
    }
}

impl PaymentMethodRegistry for InMemoryPaymentMethodRegistry {
    fn has_payment_method(&self, identifier: &str) -> bool {
        self.methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(identifier)
    }

    fn get_payment_method(&self, identifier: &str) -> Option<PaymentMethod> {
        self.methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned()
    }
}

/// A gateway call as seen by `InMemoryGateway`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub channel_id: String,
    pub resource_id: String,
}

/// Serves canned gateway resources and records under which channel they were requested.
#[derive(Default, Clone)]
pub struct InMemoryGateway {
    payments: Arc<RwLock<HashMap<String, RemotePayment>>>,
    orders: Arc<RwLock<HashMap<String, RemoteOrder>>>,
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl InMemoryGateway {
    /// Creates a gateway without resources. Every lookup fails with `ResourceNotFound`
    /// until resources are inserted.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_payment(&self, payment: RemotePayment) {
        self.payments.write().await.insert(payment.id.clone(), payment);
    }

    pub async fn insert_order(&self, order: RemoteOrder) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    /// Every call made so far, in call order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, ctx: &ChannelContext, id: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(GatewayCall {
                channel_id: ctx.channel_id().to_string(),
                resource_id: id.to_string(),
            });
    }
}

#[async_trait]
impl GatewayClient for InMemoryGateway {
    async fn get_payment(&self, ctx: &ChannelContext, id: &str) -> Result<RemotePayment> {
        self.record(ctx, id);
        self.payments
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::ResourceNotFound(id.to_string()))
    }

    async fn get_order(&self, ctx: &ChannelContext, id: &str) -> Result<RemoteOrder> {
        self.record(ctx, id);
        self.orders
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::ResourceNotFound(id.to_string()))
    }
}
