use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::settings::{SettingField, SettingValue};
use crate::status::{ServiceAction, StatusEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcRequest {
    List,
    Status {
        service: String,
    },
    Start {
        service: String,
    },
    Stop {
        service: String,
    },
    Restart {
        service: String,
    },
    Settings {
        service: String,
    },
    Save {
        service: String,
        field: String,
        value: SettingValue,
    },
}

impl IpcRequest {
    pub fn lifecycle(action: ServiceAction, service: impl Into<String>) -> Self {
        let service = service.into();
        match action {
            ServiceAction::Start => IpcRequest::Start { service },
            ServiceAction::Stop => IpcRequest::Stop { service },
            ServiceAction::Restart => IpcRequest::Restart { service },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,
    #[serde(default)]
    pub settings: Vec<SettingField>,
}

#[cfg(test)]
impl IpcResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            services: Vec::new(),
            statuses: Vec::new(),
            settings: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            ..Self::ok(message)
        }
    }
}

pub async fn send_request(daemon_addr: &str, request: &IpcRequest) -> Result<IpcResponse> {
    let mut stream = TcpStream::connect(daemon_addr)
        .await
        .with_context(|| format!("failed to connect to supervisor at {daemon_addr}"))?;
    write_json_line(&mut stream, request).await?;
    read_json_line(&mut stream).await
}

pub async fn read_json_line<T, S>(stream: &mut S) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    S: AsyncRead + Unpin,
{
    let mut line = String::new();
    let bytes = BufReader::new(stream)
        .read_line(&mut line)
        .await
        .context("failed to read from supervisor connection")?;

    if bytes == 0 {
        anyhow::bail!("supervisor closed the connection without replying");
    }

    serde_json::from_str::<T>(line.trim_end()).context("failed to decode supervisor payload")
}

pub async fn write_json_line<T, S>(stream: &mut S, value: &T) -> Result<()>
where
    T: Serialize,
    S: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(value)?;
    payload.push(b'\n');
    stream
        .write_all(&payload)
        .await
        .context("failed to write supervisor request")?;
    stream
        .flush()
        .await
        .context("failed to flush supervisor request")?;
    Ok(())
}
