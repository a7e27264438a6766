//! The supervisor as seen from the console: a status source, a lifecycle sink, and a settings
//! source/sink. [`IpcClient`] talks to the daemon; tests plug in their own implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::timeout;
use tracing::debug;

use crate::config::AppConfig;
use crate::ipc::{send_request, IpcRequest, IpcResponse};
use crate::settings::{SettingValue, SettingsList};
use crate::status::{ServiceAction, StatusSnapshot};

#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    async fn services(&self) -> Result<Vec<String>>;

    async fn status(&self, service: &str) -> Result<StatusSnapshot>;

    /// Completion means the daemon accepted the request. The next snapshot may still show the
    /// old phase.
    async fn perform(&self, service: &str, action: ServiceAction) -> Result<()>;

    async fn settings(&self, service: &str) -> Result<SettingsList>;

    async fn save(&self, service: &str, field: &str, value: &SettingValue) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct IpcClient {
    daemon_addr: String,
    request_timeout: Duration,
}

impl IpcClient {
    pub fn new(daemon_addr: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            daemon_addr: daemon_addr.into(),
            request_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.daemon_addr.clone(), config.request_timeout)
    }

    async fn request(&self, request: IpcRequest) -> Result<IpcResponse> {
        debug!(addr = %self.daemon_addr, ?request, "sending supervisor request");
        let response = timeout(
            self.request_timeout,
            send_request(&self.daemon_addr, &request),
        )
        .await
        .with_context(|| {
            format!(
                "supervisor at {} did not answer within {}ms",
                self.daemon_addr,
                self.request_timeout.as_millis()
            )
        })??;
        expect_ok(response)
    }
}

pub(crate) fn expect_ok(response: IpcResponse) -> Result<IpcResponse> {
    if response.ok {
        Ok(response)
    } else {
        anyhow::bail!(response.message)
    }
}

impl ControlPlane for IpcClient {
    async fn services(&self) -> Result<Vec<String>> {
        Ok(self.request(IpcRequest::List).await?.services)
    }

    async fn status(&self, service: &str) -> Result<StatusSnapshot> {
        let response = self
            .request(IpcRequest::Status {
                service: service.to_string(),
            })
            .await?;
        Ok(StatusSnapshot::new(response.statuses))
    }

    async fn perform(&self, service: &str, action: ServiceAction) -> Result<()> {
        self.request(IpcRequest::lifecycle(action, service))
            .await
            .with_context(|| format!("failed to {action} {service}"))?;
        Ok(())
    }

    async fn settings(&self, service: &str) -> Result<SettingsList> {
        let response = self
            .request(IpcRequest::Settings {
                service: service.to_string(),
            })
            .await?;
        Ok(response.settings)
    }

    async fn save(&self, service: &str, field: &str, value: &SettingValue) -> Result<()> {
        self.request(IpcRequest::Save {
            service: service.to_string(),
            field: field.to_string(),
            value: value.clone(),
        })
        .await
        .with_context(|| format!("failed to save {field} for {service}"))?;
        Ok(())
    }
}
