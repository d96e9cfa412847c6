//! Wire format of the gateway API: request bodies and the pure transformations producing them.

pub mod requests;
pub mod transformer;

use crate::error::Result;
use serde::Serialize;

/// Renders a request body as the JSON object posted to the gateway.
pub fn to_payload<T: Serialize>(request: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(request)?)
}
