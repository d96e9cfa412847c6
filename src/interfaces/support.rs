//! Support endpoints of the integration back office, as transport-agnostic handlers.

use crate::domain::ports::{ConfigurationService, DebugDataCollector};
use crate::error::Result;
use http::StatusCode;
use serde_json::{Value, json};
use std::path::PathBuf;

pub const DEBUG_DATA_FILE_NAME: &str = "mollie-debug-data.zip";

#[derive(Debug, Clone, PartialEq)]
pub struct SupportResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// `GET /support/status`
pub fn get_debug_status(config: &dyn ConfigurationService) -> SupportResponse {
    SupportResponse {
        status: StatusCode::OK,
        body: json!({"isDebugModeEnabled": config.is_debug_mode_enabled()}),
    }
}

/// `POST /support/status` with a body like `{"debugStatus": true}`.
///
/// Anything but a boolean `debugStatus` is rejected with 400 and leaves the flag untouched.
pub fn update_debug_status(config: &dyn ConfigurationService, body: &str) -> SupportResponse {
    let debug_status = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|data| data.get("debugStatus").and_then(Value::as_bool));

    match debug_status {
        Some(enabled) => {
            config.set_debug_mode_enabled(enabled);
            tracing::info!(enabled, "Debug mode updated");
            SupportResponse {
                status: StatusCode::OK,
                body: json!({"isDebugModeEnabled": enabled}),
            }
        }
        None => {
            tracing::warn!("Rejected debug status update without a boolean debugStatus");
            SupportResponse {
                status: StatusCode::BAD_REQUEST,
                body: json!({"success": false}),
            }
        }
    }
}

/// File to stream for `GET /support/download_debug_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugDownload {
    pub path: PathBuf,
    pub file_name: &'static str,
}

pub fn download_debug_data(collector: &dyn DebugDataCollector) -> Result<DebugDownload> {
    Ok(DebugDownload {
        path: collector.debug_data_file_path()?,
        file_name: DEBUG_DATA_FILE_NAME,
    })
}
