use crate::domain::context::ChannelContext;
use crate::domain::diff::{changed_refunds, create_map_from_source, new_shipments};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::GatewayClientBox;
use crate::domain::refund::RefundStatus;
use crate::domain::transaction::ShopOrder;
use crate::domain::webhook::{EventKind, GatewayEvent, ResourceRef};
use crate::error::{GatewayError, Result};
use serde::Serialize;

/// A change a webhook applied to the local order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum AppliedChange {
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        resource_id: String,
        from: Option<PaymentStatus>,
        to: PaymentStatus,
    },
    #[serde(rename_all = "camelCase")]
    RefundUpdated {
        refund_id: String,
        status: Option<RefundStatus>,
    },
    #[serde(rename_all = "camelCase")]
    ShipmentRecorded { shipment_id: String },
}

type Handler = fn(&mut ShopOrder, &GatewayEvent) -> Result<Option<AppliedChange>>;

const DISPATCH_TABLE: [(EventKind, Handler); 4] = [
    (EventKind::Payment, handle_payment_event as Handler),
    (EventKind::Order, handle_order_event as Handler),
    (EventKind::Refund, handle_refund_event as Handler),
    (EventKind::Shipment, handle_shipment_event as Handler),
];

fn handler_for(kind: EventKind) -> Result<Handler> {
    DISPATCH_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map(|(_, handler)| *handler)
        .ok_or_else(|| GatewayError::ValidationError(format!("No handler for {:?} events", kind)))
}

/// Interprets a webhook body against the current gateway state and applies it to a shop order.
///
/// Nothing is taken from the webhook body except the resource id. The resource is fetched
/// again and compared item by item with what the order already knows, so redelivered or
/// reordered notifications only apply what actually changed.
pub struct WebhookDispatcher {
    gateway: GatewayClientBox,
}

impl WebhookDispatcher {
    /// Creates a new `WebhookDispatcher`.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Client the current state of webhook resources is fetched from.
    pub fn new(gateway: GatewayClientBox) -> Self {
        Self { gateway }
    }

    /// Applies the resource named by `payload` to `order` and returns the changes made.
    ///
    /// Fails with `ReferenceMismatch` if the resource belongs to another order.
    pub async fn handle(
        &self,
        ctx: &ChannelContext,
        payload: &str,
        order: &mut ShopOrder,
    ) -> Result<Vec<AppliedChange>> {
        let resource = ResourceRef::parse_payload(payload)?;
        let resource = self.resolve_owner(ctx, resource, order).await?;

        let events = self.collect_events(ctx, &resource, order).await?;
        tracing::debug!(
            resource_id = resource.id(),
            events = events.len(),
            "Gateway events collected"
        );

        let mut changes = Vec::new();
        for event in &events {
            let handler = handler_for(event.kind())?;
            if let Some(change) = handler(order, event)? {
                tracing::info!(order_id = %order.id, ?change, "Applied gateway change");
                changes.push(change);
            }
        }

        Ok(changes)
    }

    /// Checks that `resource` belongs to `order`.
    ///
    /// Orders created through the orders API also get notifications for their payments. A
    /// payment whose parent is the order's `ord_` reference is reconciled as that order.
    async fn resolve_owner(
        &self,
        ctx: &ChannelContext,
        resource: ResourceRef,
        order: &ShopOrder,
    ) -> Result<ResourceRef> {
        let Some(expected) = order.gateway_reference.as_deref() else {
            return Ok(resource);
        };
        if expected == resource.id() {
            return Ok(resource);
        }

        if let ResourceRef::Payment(payment_id) = &resource
            && let Ok(ResourceRef::Order(order_id)) = ResourceRef::from_id(expected.to_string())
        {
            let payment = self.gateway.get_payment(ctx, payment_id).await?;
            if payment.order_id.as_deref() == Some(order_id.as_str()) {
                tracing::debug!(
                    payment_id = %payment_id,
                    order_id = %order_id,
                    "Payment webhook resolved to its order"
                );
                return Ok(ResourceRef::Order(order_id));
            }
        }

        Err(GatewayError::ReferenceMismatch {
            expected: expected.to_string(),
            actual: resource.id().to_string(),
        })
    }

    async fn collect_events(
        &self,
        ctx: &ChannelContext,
        resource: &ResourceRef,
        order: &ShopOrder,
    ) -> Result<Vec<GatewayEvent>> {
        let events = match resource {
            ResourceRef::Payment(id) => {
                let payment = self.gateway.get_payment(ctx, id).await?;
                let mut events = vec![GatewayEvent::Payment {
                    id: payment.id.clone(),
                    status: payment.status,
                }];
                events.extend(
                    changed_refunds(&order.refunds, &payment.refunds)
                        .into_iter()
                        .cloned()
                        .map(GatewayEvent::Refund),
                );
                events
            }
            ResourceRef::Order(id) => {
                let remote = self.gateway.get_order(ctx, id).await?;
                let mut events = vec![GatewayEvent::Order {
                    id: remote.id.clone(),
                    status: remote.status,
                }];
                events.extend(
                    changed_refunds(&order.refunds, &remote.refunds)
                        .into_iter()
                        .cloned()
                        .map(GatewayEvent::Refund),
                );
                events.extend(
                    new_shipments(&order.shipments, &remote.shipments)
                        .into_iter()
                        .cloned()
                        .map(GatewayEvent::Shipment),
                );
                events
            }
        };
        Ok(events)
    }
}

fn unexpected(kind: EventKind, event: &GatewayEvent) -> GatewayError {
    GatewayError::ValidationError(format!(
        "{:?} handler received {:?} event",
        kind,
        event.kind()
    ))
}

fn handle_payment_event(order: &mut ShopOrder, event: &GatewayEvent) -> Result<Option<AppliedChange>> {
    let GatewayEvent::Payment { id, status } = event else {
        return Err(unexpected(EventKind::Payment, event));
    };
    Ok(apply_status(order, id, *status))
}

fn handle_order_event(order: &mut ShopOrder, event: &GatewayEvent) -> Result<Option<AppliedChange>> {
    let GatewayEvent::Order { id, status } = event else {
        return Err(unexpected(EventKind::Order, event));
    };
    Ok(apply_status(order, id, *status))
}

fn apply_status(order: &mut ShopOrder, id: &str, status: PaymentStatus) -> Option<AppliedChange> {
    if order.gateway_reference.is_none() {
        order.gateway_reference = Some(id.to_string());
    }
    if order.gateway_status == Some(status) {
        return None;
    }

    let from = order.gateway_status.replace(status);
    Some(AppliedChange::StatusChanged {
        resource_id: id.to_string(),
        from,
        to: status,
    })
}

fn handle_refund_event(order: &mut ShopOrder, event: &GatewayEvent) -> Result<Option<AppliedChange>> {
    let GatewayEvent::Refund(refund) = event else {
        return Err(unexpected(EventKind::Refund, event));
    };
    let refund_id = refund.id.clone().ok_or_else(|| {
        GatewayError::ValidationError("Gateway refund without id".to_string())
    })?;

    match order
        .refunds
        .iter_mut()
        .find(|known| known.id.as_deref() == Some(refund_id.as_str()))
    {
        Some(known) => *known = refund.clone(),
        None => order.refunds.push(refund.clone()),
    }

    Ok(Some(AppliedChange::RefundUpdated {
        refund_id,
        status: refund.status,
    }))
}

fn handle_shipment_event(
    order: &mut ShopOrder,
    event: &GatewayEvent,
) -> Result<Option<AppliedChange>> {
    let GatewayEvent::Shipment(shipment) = event else {
        return Err(unexpected(EventKind::Shipment, event));
    };
    let shipment_id = shipment.id.clone().ok_or_else(|| {
        GatewayError::ValidationError("Gateway shipment without id".to_string())
    })?;

    if create_map_from_source(&order.shipments).contains_key(shipment_id.as_str()) {
        return Ok(None);
    }
    order.shipments.push(shipment.clone());

    Ok(Some(AppliedChange::ShipmentRecorded { shipment_id }))
}
