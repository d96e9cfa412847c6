mod common;

use common::{eur, harness, notify_event, refund, remote_payment, transaction};
use molliesync::application::dispatcher::AppliedChange;
use molliesync::application::engine::{
    INVALID_SHOP_ORDER_DESCRIPTION, INVALID_SHOP_ORDER_TITLE, ReconciliationState, SkipReason,
};
use molliesync::domain::order::LineQuantity;
use molliesync::domain::payment::PaymentStatus;
use molliesync::domain::ports::{PaymentMethod, PaymentMethodConfig};
use molliesync::domain::refund::RefundStatus;
use molliesync::domain::shipment::{Shipment, Tracking};
use molliesync::domain::transaction::ShopOrder;
use molliesync::domain::webhook::{RemoteOrder, WebhookRequest};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_paid_payment_is_applied() {
    let h = harness();
    let entity = h.seed_order(ShopOrder::new("1001")).await;
    h.gateway
        .insert_payment(remote_payment("tr_WDqYK6vllg", PaymentStatus::Paid, dec!(25.00)))
        .await;

    let mut event = notify_event(Some(transaction(7, "mollie_1", "1001")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_WDqYK6vllg")))
        .await;

    assert_eq!(
        state,
        ReconciliationState::Applied(vec![AppliedChange::StatusChanged {
            resource_id: "tr_WDqYK6vllg".to_string(),
            from: None,
            to: PaymentStatus::Paid,
        }])
    );
    assert!(state.is_acknowledged());
    assert!(event.is_successful());
    assert!(!event.is_propagation_stopped());
    assert!(event.transaction.as_ref().unwrap().successful);

    let order = h.entities.order(&entity).await.unwrap();
    assert_eq!(order.gateway_reference.as_deref(), Some("tr_WDqYK6vllg"));
    assert_eq!(order.gateway_status, Some(PaymentStatus::Paid));
    assert!(h.entities.transaction(7).await.unwrap().successful);

    let calls = h.gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].channel_id, "1");
}

#[tokio::test]
async fn test_missing_order_is_acknowledged_and_reported() {
    let h = harness();
    h.gateway
        .insert_payment(remote_payment("tr_1", PaymentStatus::Paid, dec!(10.00)))
        .await;

    let mut event = notify_event(Some(transaction(3, "mollie_1", "404")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_1")))
        .await;

    assert_eq!(
        state,
        ReconciliationState::Skipped(SkipReason::MissingOrder("404".to_string()))
    );
    assert!(state.is_acknowledged());
    assert!(event.is_successful());
    assert!(event.is_propagation_stopped());

    let notifications = h.notifications.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, INVALID_SHOP_ORDER_TITLE);
    assert_eq!(notifications[0].description, INVALID_SHOP_ORDER_DESCRIPTION);
    assert_eq!(notifications[0].subject_id, "404");

    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.entities.write_count(), 0);
}

#[tokio::test]
async fn test_unregistered_payment_method_never_enters_a_channel() {
    let h = harness();
    h.seed_order(ShopOrder::new("1")).await;
    h.gateway
        .insert_payment(remote_payment("tr_1", PaymentStatus::Paid, dec!(10.00)))
        .await;

    let mut event = notify_event(Some(transaction(1, "paypal_express", "1")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_1")))
        .await;

    assert_eq!(
        state,
        ReconciliationState::Skipped(SkipReason::UnknownPaymentMethod(
            "paypal_express".to_string()
        ))
    );
    assert!(!state.is_acknowledged());
    assert!(!event.is_successful());
    assert_eq!(h.configuration.lookups(), 0);
    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.entities.write_count(), 0);
}

#[tokio::test]
async fn test_removed_payment_method_is_skipped() {
    let h = harness();
    h.seed_order(ShopOrder::new("1")).await;
    h.payment_methods.unregister("mollie_2");

    let mut event = notify_event(Some(transaction(1, "mollie_2", "1")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_1")))
        .await;

    assert!(matches!(
        state,
        ReconciliationState::Skipped(SkipReason::UnknownPaymentMethod(_))
    ));
    assert_eq!(h.configuration.lookups(), 0);
}

#[tokio::test]
async fn test_missing_transaction_is_skipped() {
    let h = harness();

    let mut event = notify_event(None);
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_1")))
        .await;

    assert_eq!(state, ReconciliationState::Skipped(SkipReason::MissingTransaction));
    assert!(!event.is_successful());
    assert_eq!(h.configuration.lookups(), 0);
}

#[tokio::test]
async fn test_sub_request_and_missing_request_are_skipped() {
    let h = harness();
    h.seed_order(ShopOrder::new("1")).await;

    let mut event = notify_event(Some(transaction(1, "mollie_1", "1")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::sub("id=tr_1")))
        .await;
    assert_eq!(state, ReconciliationState::Skipped(SkipReason::MissingMainRequest));

    let state = h.reconciler.handle(&mut event, None).await;
    assert_eq!(state, ReconciliationState::Skipped(SkipReason::MissingMainRequest));

    assert!(!event.is_successful());
    assert_eq!(h.configuration.lookups(), 0);
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_redelivered_refund_with_unchanged_status_is_not_reapplied() {
    let h = harness();
    let mut order = ShopOrder::new("77").with_reference("tr_7");
    order.gateway_status = Some(PaymentStatus::Paid);
    order.refunds = vec![refund("re_1", RefundStatus::Refunded, dec!(5.00))];
    let entity = h.seed_order(order.clone()).await;

    let mut payment = remote_payment("tr_7", PaymentStatus::Paid, dec!(20.00));
    payment.refunds = vec![refund("re_1", RefundStatus::Refunded, dec!(5.00))];
    h.gateway.insert_payment(payment).await;

    let mut tx = transaction(9, "mollie_1", "77");
    tx.successful = true;
    let mut event = notify_event(Some(tx));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_7")))
        .await;

    assert_eq!(state, ReconciliationState::Applied(Vec::new()));
    assert!(event.is_successful());
    assert_eq!(h.entities.write_count(), 0);
    assert_eq!(h.entities.order(&entity).await.unwrap(), order);
}

#[tokio::test]
async fn test_refund_status_change_is_applied_once() {
    let h = harness();
    let mut order = ShopOrder::new("77").with_reference("tr_7");
    order.gateway_status = Some(PaymentStatus::Paid);
    order.refunds = vec![refund("re_1", RefundStatus::Pending, dec!(5.00))];
    let entity = h.seed_order(order).await;

    let mut payment = remote_payment("tr_7", PaymentStatus::Paid, dec!(20.00));
    payment.refunds = vec![
        refund("re_1", RefundStatus::Refunded, dec!(5.00)),
        refund("re_2", RefundStatus::Queued, dec!(2.50)),
    ];
    h.gateway.insert_payment(payment).await;

    let request = WebhookRequest::main("id=tr_7");
    let mut event = notify_event(Some(transaction(9, "mollie_1", "77")));
    let state = h.reconciler.handle(&mut event, Some(&request)).await;

    assert_eq!(
        state,
        ReconciliationState::Applied(vec![
            AppliedChange::RefundUpdated {
                refund_id: "re_1".to_string(),
                status: Some(RefundStatus::Refunded),
            },
            AppliedChange::RefundUpdated {
                refund_id: "re_2".to_string(),
                status: Some(RefundStatus::Queued),
            },
        ])
    );
    let stored = h.entities.order(&entity).await.unwrap();
    assert_eq!(stored.refunds.len(), 2);
    assert_eq!(stored.refunds[0].status, Some(RefundStatus::Refunded));

    // Same delivery again: nothing left to apply.
    let mut event = notify_event(Some(transaction(9, "mollie_1", "77")));
    let state = h.reconciler.handle(&mut event, Some(&request)).await;
    assert_eq!(state, ReconciliationState::Applied(Vec::new()));
}

#[tokio::test]
async fn test_order_webhook_records_new_shipments() {
    let h = harness();
    let mut order = ShopOrder::new("5").with_reference("ord_kEn1PlbGa");
    order.gateway_status = Some(PaymentStatus::Paid);
    let entity = h.seed_order(order).await;

    h.gateway
        .insert_order(RemoteOrder {
            id: "ord_kEn1PlbGa".to_string(),
            status: PaymentStatus::Shipping,
            amount: eur(dec!(40.00)),
            refunds: Vec::new(),
            shipments: vec![Shipment {
                id: Some("shp_3wmsgCJN4U".to_string()),
                lines: vec![LineQuantity::new("odl_dgtxyl", 1)],
                tracking: Some(Tracking {
                    carrier: "PostNL".to_string(),
                    code: "3SKABA000000000".to_string(),
                    url: None,
                }),
            }],
        })
        .await;

    let mut event = notify_event(Some(transaction(2, "mollie_2", "5")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main(r#"{"id":"ord_kEn1PlbGa"}"#)))
        .await;

    assert_eq!(
        state,
        ReconciliationState::Applied(vec![
            AppliedChange::StatusChanged {
                resource_id: "ord_kEn1PlbGa".to_string(),
                from: Some(PaymentStatus::Paid),
                to: PaymentStatus::Shipping,
            },
            AppliedChange::ShipmentRecorded {
                shipment_id: "shp_3wmsgCJN4U".to_string(),
            },
        ])
    );
    let stored = h.entities.order(&entity).await.unwrap();
    assert_eq!(stored.shipments.len(), 1);
    assert_eq!(h.gateway.calls()[0].channel_id, "2");
}

#[tokio::test]
async fn test_failed_payment_marks_transaction_unsuccessful() {
    let h = harness();
    h.seed_order(ShopOrder::new("8")).await;
    h.gateway
        .insert_payment(remote_payment("tr_8", PaymentStatus::Expired, dec!(8.00)))
        .await;

    let mut tx = transaction(8, "mollie_1", "8");
    tx.successful = true;
    let mut event = notify_event(Some(tx));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_8")))
        .await;

    assert!(matches!(state, ReconciliationState::Applied(ref changes) if changes.len() == 1));
    assert!(event.is_successful());
    assert!(!event.transaction.as_ref().unwrap().successful);
    assert!(!h.entities.transaction(8).await.unwrap().successful);
}

#[tokio::test]
async fn test_unknown_channel_fails_without_acknowledging() {
    let h = harness();
    h.seed_order(ShopOrder::new("1")).await;
    h.payment_methods.register(PaymentMethod {
        identifier: "mollie_9".to_string(),
        config: PaymentMethodConfig {
            channel_id: "9".to_string(),
        },
    });

    let mut tx = transaction(1, "mollie_9", "1");
    tx.successful = true;
    let mut event = notify_event(Some(tx));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_1")))
        .await;

    assert!(matches!(state, ReconciliationState::Failed(ref message) if message.contains('9')));
    assert!(!state.is_acknowledged());
    assert!(!event.is_successful());
    assert!(!event.transaction.as_ref().unwrap().successful);
    assert!(!h.entities.transaction(1).await.unwrap().successful);
    assert_eq!(h.entities.write_count(), 1);
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_gateway_errors_fail_the_webhook() {
    let h = harness();
    h.seed_order(ShopOrder::new("1")).await;

    let mut event = notify_event(Some(transaction(1, "mollie_1", "1")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_unknown")))
        .await;

    assert!(matches!(state, ReconciliationState::Failed(_)));
    assert!(!event.is_successful());
    assert_eq!(h.gateway.calls().len(), 1);
    // Only the unsuccessful transaction is written, the order stays untouched.
    assert_eq!(h.entities.write_count(), 1);
    assert!(!h.entities.transaction(1).await.unwrap().successful);
}

#[tokio::test]
async fn test_payment_webhook_of_order_api_order_is_applied() {
    let h = harness();
    let mut order = ShopOrder::new("5").with_reference("ord_kEn1PlbGa");
    order.gateway_status = Some(PaymentStatus::Authorized);
    let entity = h.seed_order(order).await;

    let mut payment = remote_payment("tr_ofOrder", PaymentStatus::Paid, dec!(40.00));
    payment.order_id = Some("ord_kEn1PlbGa".to_string());
    h.gateway.insert_payment(payment).await;
    h.gateway
        .insert_order(RemoteOrder {
            id: "ord_kEn1PlbGa".to_string(),
            status: PaymentStatus::Paid,
            amount: eur(dec!(40.00)),
            refunds: Vec::new(),
            shipments: Vec::new(),
        })
        .await;

    let mut event = notify_event(Some(transaction(5, "mollie_1", "5")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_ofOrder")))
        .await;

    assert_eq!(
        state,
        ReconciliationState::Applied(vec![AppliedChange::StatusChanged {
            resource_id: "ord_kEn1PlbGa".to_string(),
            from: Some(PaymentStatus::Authorized),
            to: PaymentStatus::Paid,
        }])
    );
    assert!(state.is_acknowledged());
    assert!(event.is_successful());
    let stored = h.entities.order(&entity).await.unwrap();
    assert_eq!(stored.gateway_reference.as_deref(), Some("ord_kEn1PlbGa"));
    assert_eq!(stored.gateway_status, Some(PaymentStatus::Paid));
}

#[tokio::test]
async fn test_payment_webhook_of_another_order_fails() {
    let h = harness();
    h.seed_order(ShopOrder::new("5").with_reference("ord_kEn1PlbGa")).await;
    let mut payment = remote_payment("tr_foreign", PaymentStatus::Paid, dec!(40.00));
    payment.order_id = Some("ord_someoneElse".to_string());
    h.gateway.insert_payment(payment).await;

    let mut event = notify_event(Some(transaction(5, "mollie_1", "5")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_foreign")))
        .await;

    assert!(matches!(state, ReconciliationState::Failed(ref message) if message.contains("tr_foreign")));
    assert!(!event.is_successful());
}

#[tokio::test]
async fn test_malformed_body_and_foreign_reference_fail() {
    let h = harness();
    h.seed_order(ShopOrder::new("1").with_reference("tr_mine")).await;
    h.gateway
        .insert_payment(remote_payment("tr_theirs", PaymentStatus::Paid, dec!(1.00)))
        .await;

    let mut event = notify_event(Some(transaction(1, "mollie_1", "1")));
    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("foo=bar")))
        .await;
    assert!(matches!(state, ReconciliationState::Failed(_)));

    let state = h
        .reconciler
        .handle(&mut event, Some(&WebhookRequest::main("id=tr_theirs")))
        .await;
    assert!(matches!(state, ReconciliationState::Failed(_)));
    assert!(!event.is_successful());
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_webhooks_use_their_own_channel() {
    let h = harness();
    for (order_id, payment_id) in [("A", "tr_a"), ("B", "tr_b")] {
        h.seed_order(ShopOrder::new(order_id)).await;
        h.gateway
            .insert_payment(remote_payment(payment_id, PaymentStatus::Paid, dec!(3.00)))
            .await;
    }

    let mut handles = Vec::new();
    for (order_id, method, payment_id) in [
        ("A", "mollie_1", "tr_a"),
        ("B", "mollie_2", "tr_b"),
        ("A", "mollie_1", "tr_a"),
        ("B", "mollie_2", "tr_b"),
    ] {
        let reconciler = h.reconciler.clone();
        handles.push(tokio::spawn(async move {
            let mut event = notify_event(Some(transaction(1, method, order_id)));
            let request = WebhookRequest::main(format!("id={}", payment_id));
            reconciler.handle(&mut event, Some(&request)).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_acknowledged());
    }

    let calls = h.gateway.calls();
    assert_eq!(calls.len(), 4);
    for call in calls {
        let expected = if call.resource_id == "tr_a" { "1" } else { "2" };
        assert_eq!(call.channel_id, expected);
    }
}
