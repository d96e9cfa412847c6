use super::ports::ConfigurationService;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::{Mutex, PoisonError};

/// Gateway settings of one merchant channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub api_key: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// The channel whose configuration and credentials apply to the work in progress.
///
/// Passed explicitly to everything that talks to the gateway; there is no ambient lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelContext {
    channel_id: String,
    config: ChannelConfig,
}

impl ChannelContext {
    pub fn new(channel_id: impl Into<String>, config: ChannelConfig) -> Self {
        Self {
            channel_id: channel_id.into(),
            config,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

/// Slot for the single channel context of one reconciliation.
///
/// A scope is created per invocation and never shared between webhooks. Activation hands
/// out a guard; the context stays active until that guard is dropped, whatever the exit path.
#[derive(Debug, Default)]
pub struct ContextScope {
    active: Mutex<Option<String>>,
}

impl ContextScope {
    /// Creates a scope with no active context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates the context of `channel_id`.
    ///
    /// Fails with `ContextAlreadyActive` while another guard from this scope is alive, and with
    /// `UnknownChannel` if the configuration has no such channel.
    pub fn activate(
        &self,
        configuration: &dyn ConfigurationService,
        channel_id: &str,
    ) -> Result<ActiveContext<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = active.as_ref() {
            return Err(GatewayError::ContextAlreadyActive {
                active: current.clone(),
                requested: channel_id.to_string(),
            });
        }

        let config = configuration
            .channel_config(channel_id)
            .ok_or_else(|| GatewayError::UnknownChannel(channel_id.to_string()))?;

        *active = Some(channel_id.to_string());
        tracing::debug!(channel_id, "Channel context activated");

        Ok(ActiveContext {
            scope: self,
            context: ChannelContext::new(channel_id, config),
        })
    }

    /// Runs `f` with the channel context active and releases it afterwards, even if `f` panics.
    pub fn do_with_context<T>(
        &self,
        configuration: &dyn ConfigurationService,
        channel_id: &str,
        f: impl FnOnce(&ChannelContext) -> T,
    ) -> Result<T> {
        let active = self.activate(configuration, channel_id)?;
        Ok(f(&active))
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn release(&self) {
        let released = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(channel_id) = released {
            tracing::debug!(channel_id = %channel_id, "Channel context released");
        }
    }
}

/// Guard for an active channel context.
#[derive(Debug)]
pub struct ActiveContext<'a> {
    scope: &'a ContextScope,
    context: ChannelContext,
}

impl Deref for ActiveContext<'_> {
    type Target = ChannelContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl Drop for ActiveContext<'_> {
    fn drop(&mut self) {
        self.scope.release();
    }
}
