use super::requests::{
    OrderLineRequest, OrderLineUpdateRequest, OrderRefundRequest, OrderRequest,
    OrderUpdateRequest, PaymentRefundRequest, PaymentRequest, PaymentShippingAddress,
    PaymentWebhook, ShipmentLineRequest, ShipmentRequest,
};
use crate::domain::amount::{Amount, VatRate};
use crate::domain::order::{Order, OrderLine, OrderLinePatch, format_gateway_date};
use crate::domain::payment::{Payment, requires_shipping_address};
use crate::domain::refund::Refund;
use crate::domain::shipment::Shipment;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Smallest gap between the order total and the sum of its lines that gets an adjustment line.
///
/// The gateway rejects orders whose lines do not add up to the total; changing this value
/// changes which orders it accepts.
pub const ADJUSTMENT_TOLERANCE: Decimal = dec!(0.001);

pub const ADJUSTMENT_LINE_NAME: &str = "Adjustment";
pub const LINE_TYPE_SURCHARGE: &str = "surcharge";
pub const LINE_TYPE_DISCOUNT: &str = "discount";

pub fn transform_payment(payment: &Payment) -> PaymentRequest {
    let shipping_address = payment
        .shipping_address
        .as_ref()
        .filter(|_| requires_shipping_address(&payment.method))
        .map(PaymentShippingAddress::from);

    PaymentRequest {
        profile_id: payment.profile_id.clone(),
        description: payment.description.clone(),
        amount: payment.amount.clone(),
        redirect_url: payment.redirect_url.clone(),
        webhook_url: payment.webhook_url.clone(),
        locale: payment.locale.clone(),
        method: payment.method.clone(),
        metadata: payment.metadata.clone(),
        shipping_address,
    }
}

pub fn transform_order(order: &Order) -> OrderRequest {
    let mut lines = transform_order_lines(&order.lines);
    if let Some(adjustment) = order_adjustment(order) {
        lines.push(transform_order_line(&adjustment));
    }

    OrderRequest {
        profile_id: order.profile_id.clone(),
        amount: order.amount.clone(),
        order_number: order.order_number.clone(),
        billing_address: order.billing_address.clone(),
        redirect_url: order.redirect_url.clone(),
        webhook_url: order.webhook_url.clone(),
        payment: PaymentWebhook {
            webhook_url: order.webhook_url.clone(),
        },
        locale: order.locale.clone(),
        method: order.method.clone(),
        metadata: order.metadata.clone(),
        lines,
        shipping_address: order.shipping_address.clone(),
        consumer_date_of_birth: order.consumer_date_of_birth.map(format_gateway_date),
    }
}

/// Sparse order update: only addresses that are set are sent.
pub fn transform_order_for_update(order: &Order) -> OrderUpdateRequest {
    OrderUpdateRequest {
        billing_address: order.billing_address.clone(),
        shipping_address: order.shipping_address.clone(),
    }
}

pub fn transform_order_lines(lines: &[OrderLine]) -> Vec<OrderLineRequest> {
    lines.iter().map(transform_order_line).collect()
}

fn transform_order_line(line: &OrderLine) -> OrderLineRequest {
    OrderLineRequest {
        name: line.name.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price.clone(),
        total_amount: line.total_amount.clone(),
        vat_rate: line.vat_rate,
        vat_amount: line.vat_amount.clone(),
        sku: line.sku.clone(),
        metadata: line.metadata.clone(),
        line_type: line.line_type.clone().filter(|t| !t.is_empty()),
        discount_amount: line.discount_amount.clone().filter(|d| !d.is_zero()),
    }
}

/// Line-level cancel/amend body. A field is sent only when the patch carries a value for it.
pub fn transform_order_lines_for_update(line: &OrderLinePatch) -> OrderLineUpdateRequest {
    OrderLineUpdateRequest {
        name: line.name.as_value().cloned(),
        quantity: line.quantity.as_value().copied(),
        unit_price: line.unit_price.as_value().cloned(),
        discount_amount: line.discount_amount.as_value().cloned(),
        total_amount: line.total_amount.as_value().cloned(),
        vat_amount: line.vat_amount.as_value().cloned(),
        vat_rate: line.vat_rate.as_value().copied(),
    }
}

/// Amount based refund on the payments API.
pub fn transform_payment_refund(refund: &Refund) -> PaymentRefundRequest {
    PaymentRefundRequest {
        amount: refund.amount.clone(),
        description: refund.description.clone(),
        metadata: refund.metadata.clone(),
    }
}

/// Line based refund on the orders API. Lines with a quantity below one are dropped.
pub fn transform_order_lines_refund(refund: &Refund) -> OrderRefundRequest {
    OrderRefundRequest {
        lines: refund
            .lines
            .iter()
            .filter(|line| line.quantity >= 1)
            .cloned()
            .collect(),
        metadata: refund.metadata.clone(),
    }
}

/// A quantity of zero (or less) is left out, which tells the gateway to ship all remaining items.
pub fn transform_shipment(shipment: &Shipment) -> ShipmentRequest {
    ShipmentRequest {
        lines: shipment
            .lines
            .iter()
            .map(|line| ShipmentLineRequest {
                id: line.id.clone(),
                quantity: Some(line.quantity).filter(|quantity| *quantity > 0),
            })
            .collect(),
        tracking: shipment.tracking.clone(),
    }
}

/// Discount or surcharge line that closes the gap between the order total and its lines.
///
/// Works on the amounts as rendered for the gateway, so the serialized lines add up to the
/// serialized order total.
pub fn order_adjustment(order: &Order) -> Option<OrderLine> {
    let lines_total: Decimal = order
        .lines
        .iter()
        .map(|line| line.total_amount.rounded())
        .sum();
    let diff = order.amount.rounded() - lines_total;
    if diff.abs() < ADJUSTMENT_TOLERANCE {
        return None;
    }

    let currency = order.amount.currency();
    let line_type = if diff > Decimal::ZERO {
        LINE_TYPE_SURCHARGE
    } else {
        LINE_TYPE_DISCOUNT
    };

    Some(OrderLine {
        id: None,
        name: ADJUSTMENT_LINE_NAME.to_string(),
        quantity: 1,
        unit_price: Amount::new(diff, currency),
        total_amount: Amount::new(diff, currency),
        vat_rate: VatRate::ZERO,
        vat_amount: Amount::zero(currency),
        sku: None,
        line_type: Some(line_type.to_string()),
        discount_amount: None,
        metadata: None,
    })
}
