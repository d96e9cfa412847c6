//! Domain types and the ports the reconciliation core talks to its collaborators through.

pub mod amount;
pub mod context;
pub mod diff;
pub mod order;
pub mod patch;
pub mod payment;
pub mod ports;
pub mod refund;
pub mod shipment;
pub mod transaction;
pub mod webhook;
