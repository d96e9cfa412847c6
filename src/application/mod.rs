//! Application layer orchestrating webhook reconciliation.
//!
//! `WebhookReconciler` validates a notification, scopes the work to the owning channel,
//! resolves the shop order and hands the payload to the `WebhookDispatcher`, which turns the
//! freshly fetched gateway state into per-item changes on that order.

pub mod dispatcher;
pub mod engine;
