use super::context::{ChannelConfig, ChannelContext};
use super::transaction::{EntityRef, PaymentTransaction, ShopOrder};
use super::webhook::{RemoteOrder, RemotePayment};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolves and writes back the shop entities a webhook touches.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_order(&self, entity: &EntityRef) -> Result<Option<ShopOrder>>;
    async fn flush_order(&self, order: &ShopOrder) -> Result<()>;
    async fn flush_transaction(&self, transaction: &PaymentTransaction) -> Result<()>;
}

pub trait ConfigurationService: Send + Sync {
    fn is_debug_mode_enabled(&self) -> bool;
    fn set_debug_mode_enabled(&self, enabled: bool);
    fn channel_config(&self, channel_id: &str) -> Option<ChannelConfig>;
}

/// User-facing notifications in the shop back office. Fire and forget.
pub trait NotificationHub: Send + Sync {
    fn push_error(&self, title: &str, description: &str, subject_id: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodConfig {
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub identifier: String,
    pub config: PaymentMethodConfig,
}

pub trait PaymentMethodRegistry: Send + Sync {
    fn has_payment_method(&self, identifier: &str) -> bool;
    fn get_payment_method(&self, identifier: &str) -> Option<PaymentMethod>;
}

/// Read access to the gateway. Credentials come from the context passed in.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn get_payment(&self, ctx: &ChannelContext, id: &str) -> Result<RemotePayment>;
    async fn get_order(&self, ctx: &ChannelContext, id: &str) -> Result<RemoteOrder>;
}

/// Produces the support archive offered for download.
pub trait DebugDataCollector: Send + Sync {
    fn debug_data_file_path(&self) -> Result<PathBuf>;
}

pub type EntityStoreBox = Box<dyn EntityStore>;
pub type ConfigurationBox = Box<dyn ConfigurationService>;
pub type NotificationHubBox = Box<dyn NotificationHub>;
pub type PaymentMethodRegistryBox = Box<dyn PaymentMethodRegistry>;
pub type GatewayClientBox = Box<dyn GatewayClient>;
