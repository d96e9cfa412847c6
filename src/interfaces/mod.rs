//! Adapters between the core and the outside world: the gateway wire format and the
//! administrative support handlers.

pub mod gateway;
pub mod support;
