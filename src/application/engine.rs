use super::dispatcher::{AppliedChange, WebhookDispatcher};
use crate::domain::context::ContextScope;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{
    ConfigurationBox, ConfigurationService, EntityStoreBox, NotificationHubBox, PaymentMethod,
    PaymentMethodRegistryBox,
};
use crate::domain::transaction::{EntityRef, PaymentTransaction};
use crate::domain::webhook::{CallbackEvent, WebhookRequest};
use crate::error::{GatewayError, Result};
use serde::Serialize;

pub const INVALID_SHOP_ORDER_TITLE: &str =
    "mollie.payment.webhook.notification.invalid_shop_order.title";
pub const INVALID_SHOP_ORDER_DESCRIPTION: &str =
    "mollie.payment.webhook.notification.invalid_shop_order.description";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "subject", rename_all = "camelCase")]
pub enum SkipReason {
    MissingTransaction,
    MissingMainRequest,
    UnknownPaymentMethod(String),
    MissingOrder(String),
}

/// Where a notification is in its reconciliation.
///
/// `handle` always returns one of the terminal states: `Applied`, `Skipped` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum ReconciliationState {
    Received,
    Validated,
    ContextActive,
    Resolved,
    Applied(Vec<AppliedChange>),
    Skipped(SkipReason),
    Failed(String),
}

impl ReconciliationState {
    /// Whether the gateway should get a success acknowledgement and stop redelivering.
    pub fn is_acknowledged(&self) -> bool {
        matches!(
            self,
            ReconciliationState::Applied(_)
                | ReconciliationState::Skipped(SkipReason::MissingOrder(_))
        )
    }
}

/// Entry point for inbound gateway notifications.
///
/// Holds only its collaborators; everything about a single notification lives on the stack of
/// `handle`, so one reconciler can serve concurrent webhooks from any number of channels.
pub struct WebhookReconciler {
    configuration: ConfigurationBox,
    payment_methods: PaymentMethodRegistryBox,
    entities: EntityStoreBox,
    notifications: NotificationHubBox,
    dispatcher: WebhookDispatcher,
}

impl WebhookReconciler {
    /// Creates a new `WebhookReconciler`.
    ///
    /// # Arguments
    ///
    /// * `configuration` - Channel configurations, used to activate the channel context.
    /// * `payment_methods` - Registry deciding which transactions belong to this integration.
    /// * `entities` - Store resolving and persisting shop orders and transactions.
    /// * `notifications` - Back office notifications for merchant-facing errors.
    /// * `dispatcher` - Applies the fetched gateway state to the resolved order.
    pub fn new(
        configuration: ConfigurationBox,
        payment_methods: PaymentMethodRegistryBox,
        entities: EntityStoreBox,
        notifications: NotificationHubBox,
        dispatcher: WebhookDispatcher,
    ) -> Self {
        Self {
            configuration,
            payment_methods,
            entities,
            notifications,
            dispatcher,
        }
    }

    pub fn configuration(&self) -> &dyn ConfigurationService {
        self.configuration.as_ref()
    }

    /// Reconciles one notification.
    ///
    /// Never returns an error: processing failures mark the transaction unsuccessful, are
    /// logged, and come back as `ReconciliationState::Failed` with the event left
    /// unacknowledged so the gateway retries. The unsuccessful flag is flushed on a best
    /// effort basis; a failing flush is logged and does not change the outcome.
    ///
    /// # Arguments
    ///
    /// * `event` - The callback event; its transaction and acknowledgement flags are updated.
    /// * `request` - The HTTP request that carried the notification, if any.
    #[tracing::instrument(name = "webhook", skip_all, fields(event_name = %event.event_name))]
    pub async fn handle(
        &self,
        event: &mut CallbackEvent,
        request: Option<&WebhookRequest>,
    ) -> ReconciliationState {
        tracing::debug!(event_data = %event.data, state = ?ReconciliationState::Received, "Web hook detected");

        let method = match self.validate(event, request) {
            Ok(method) => method,
            Err(reason) => return ReconciliationState::Skipped(reason),
        };
        // Validation guarantees a main request is present.
        let payload = request.map(|r| r.content.as_str()).unwrap_or_default();
        tracing::debug!(
            payment_method_id = %method.identifier,
            state = ?ReconciliationState::Validated,
            "Web hook validated"
        );

        match self.reconcile(event, &method, payload).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, detail = ?e, "Web hook processing failed.");
                if let Some(transaction) = event.transaction.as_mut() {
                    transaction.set_successful(false);
                    if let Err(flush_error) = self.entities.flush_transaction(transaction).await {
                        tracing::error!(
                            transaction_id = transaction.id,
                            error = %flush_error,
                            "Could not persist unsuccessful transaction."
                        );
                    }
                }
                ReconciliationState::Failed(e.to_string())
            }
        }
    }

    fn validate(
        &self,
        event: &CallbackEvent,
        request: Option<&WebhookRequest>,
    ) -> std::result::Result<PaymentMethod, SkipReason> {
        let Some(transaction) = event.transaction.as_ref() else {
            tracing::warn!(event_data = %event.data, "Web hook without payment transaction detected.");
            return Err(SkipReason::MissingTransaction);
        };

        if !request.is_some_and(|r| r.main_request) {
            tracing::warn!(event_data = %event.data, "Web hook without main HTTP request detected.");
            return Err(SkipReason::MissingMainRequest);
        }

        let payment_method_id = transaction.payment_method.as_str();
        let method = self
            .payment_methods
            .has_payment_method(payment_method_id)
            .then(|| self.payment_methods.get_payment_method(payment_method_id))
            .flatten();
        method.ok_or_else(|| {
            tracing::warn!(
                event_data = %event.data,
                payment_method_id,
                "Web hook without payment method detected."
            );
            SkipReason::UnknownPaymentMethod(payment_method_id.to_string())
        })
    }

    async fn reconcile(
        &self,
        event: &mut CallbackEvent,
        method: &PaymentMethod,
        payload: &str,
    ) -> Result<ReconciliationState> {
        let scope = ContextScope::new();
        let ctx = scope.activate(self.configuration.as_ref(), &method.config.channel_id)?;
        tracing::debug!(
            channel_id = ctx.channel_id(),
            state = ?ReconciliationState::ContextActive,
            "Channel context entered"
        );

        let entity = event
            .transaction
            .as_ref()
            .map(PaymentTransaction::entity)
            .ok_or_else(|| {
                GatewayError::ValidationError("Transaction vanished from event".to_string())
            })?;

        let Some(mut order) = self.entities.find_order(&entity).await? else {
            self.handle_missing_order(event, &entity);
            return Ok(ReconciliationState::Skipped(SkipReason::MissingOrder(
                entity.identifier,
            )));
        };
        tracing::debug!(order_id = %order.id, state = ?ReconciliationState::Resolved, "Shop order resolved");

        let changes = self.dispatcher.handle(&ctx, payload, &mut order).await?;
        if !changes.is_empty() {
            self.entities.flush_order(&order).await?;
        }

        if let Some(transaction) = event.transaction.as_mut()
            && apply_transaction_outcome(transaction, order.gateway_status)
        {
            self.entities.flush_transaction(transaction).await?;
        }

        event.mark_successful();
        tracing::info!(
            order_id = %order.id,
            channel_id = ctx.channel_id(),
            changes = changes.len(),
            "Web hook processed"
        );

        Ok(ReconciliationState::Applied(changes))
    }

    /// The order was deleted on the shop side. Acknowledge so the gateway stops retrying, and
    /// tell the merchant.
    fn handle_missing_order(&self, event: &mut CallbackEvent, entity: &EntityRef) {
        tracing::warn!(
            event_data = %event.data,
            order_id = %entity.identifier,
            "Web hook without order detected. Order does not exist in the system anymore."
        );

        event.stop_propagation();
        event.mark_successful();
        self.notifications.push_error(
            INVALID_SHOP_ORDER_TITLE,
            INVALID_SHOP_ORDER_DESCRIPTION,
            &entity.identifier,
        );
    }
}

/// Mirrors a conclusive gateway status onto the transaction. Returns whether it changed.
fn apply_transaction_outcome(
    transaction: &mut PaymentTransaction,
    status: Option<PaymentStatus>,
) -> bool {
    let successful = match status {
        Some(status) if status.is_successful() => true,
        Some(status) if status.is_failure() => false,
        _ => return false,
    };
    if transaction.successful == successful {
        return false;
    }
    transaction.set_successful(successful);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(successful: bool) -> PaymentTransaction {
        PaymentTransaction {
            id: 1,
            payment_method: "mollie_1".to_string(),
            entity_class: "Order".to_string(),
            entity_identifier: "1".to_string(),
            successful,
        }
    }

    #[test]
    fn test_transaction_outcome_follows_conclusive_status() {
        let mut tx = transaction(false);
        assert!(apply_transaction_outcome(&mut tx, Some(PaymentStatus::Paid)));
        assert!(tx.successful);
        assert!(!apply_transaction_outcome(&mut tx, Some(PaymentStatus::Completed)));

        assert!(apply_transaction_outcome(&mut tx, Some(PaymentStatus::Expired)));
        assert!(!tx.successful);
    }

    #[test]
    fn test_transaction_outcome_ignores_open_status() {
        let mut tx = transaction(true);
        assert!(!apply_transaction_outcome(&mut tx, Some(PaymentStatus::Open)));
        assert!(!apply_transaction_outcome(&mut tx, None));
        assert!(tx.successful);
    }

    #[test]
    fn test_acknowledged_states() {
        assert!(ReconciliationState::Applied(Vec::new()).is_acknowledged());
        assert!(
            ReconciliationState::Skipped(SkipReason::MissingOrder("1".to_string()))
                .is_acknowledged()
        );
        assert!(!ReconciliationState::Skipped(SkipReason::MissingTransaction).is_acknowledged());
        assert!(!ReconciliationState::Failed("boom".to_string()).is_acknowledged());
    }
}
