//! Change detection between the last known local collections and freshly fetched ones.
//!
//! Items are matched by their remote identifier only. Delivery order of webhooks says nothing
//! about gateway-side event order, so every item is compared on its own and unchanged items are
//! skipped.

use super::refund::Refund;
use super::shipment::Shipment;
use std::collections::HashMap;

/// Anything the gateway assigns an identifier to.
pub trait RemoteIdentified {
    fn remote_id(&self) -> Option<&str>;
}

impl RemoteIdentified for Refund {
    fn remote_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl RemoteIdentified for Shipment {
    fn remote_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Keys `items` by remote id. Later duplicates overwrite earlier ones; items without an id
/// cannot be matched and are left out.
pub fn create_map_from_source<T: RemoteIdentified>(items: &[T]) -> HashMap<&str, &T> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        if let Some(id) = item.remote_id() {
            map.insert(id, item);
        }
    }
    map
}

/// True if `new_refund` is unknown so far or its status moved since it was last seen.
pub fn is_refund_status_changed(previous: &HashMap<&str, &Refund>, new_refund: &Refund) -> bool {
    match new_refund.id.as_deref().and_then(|id| previous.get(id)) {
        Some(known) => known.status != new_refund.status,
        None => true,
    }
}

/// The fetched refunds that need reconciling, in fetched order.
pub fn changed_refunds<'a>(known: &[Refund], fetched: &'a [Refund]) -> Vec<&'a Refund> {
    let previous = create_map_from_source(known);
    fetched
        .iter()
        .filter(|refund| is_refund_status_changed(&previous, refund))
        .collect()
}

/// The fetched shipments whose id has not been recorded locally yet.
pub fn new_shipments<'a>(known: &[Shipment], fetched: &'a [Shipment]) -> Vec<&'a Shipment> {
    let previous = create_map_from_source(known);
    fetched
        .iter()
        .filter(|shipment| {
            shipment
                .remote_id()
                .is_none_or(|id| !previous.contains_key(id))
        })
        .collect()
}
