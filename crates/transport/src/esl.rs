//! FreeSWITCH event socket client
//!
//! One short-lived connection per command: connect, answer the auth
//! challenge, send a single `api` command, read the reply, disconnect.

use async_trait::async_trait;
use media_gateway_config::TelephonyConfig;
use media_gateway_core::{Error, Result as CoreResult, TelephonyControl};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::TransportError;

/// Headers and body of one event socket message
#[derive(Debug, Default)]
struct EslMessage {
    headers: BTreeMap<String, String>,
    body: String,
}

impl EslMessage {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct EslClient {
    address: String,
    password: String,
    timeout: Duration,
}

impl EslClient {
    pub fn new(address: impl Into<String>, password: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            timeout,
        }
    }

    pub fn from_config(config: &TelephonyConfig) -> Self {
        Self::new(config.address(), config.password.clone(), config.connect_timeout())
    }

    /// Run one `api` command and return the response body
    pub async fn api(&self, command: &str) -> Result<String, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(command)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }

    async fn exchange(&self, command: &str) -> Result<String, TransportError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| TransportError::Connection(format!("{}: {}", self.address, e)))?;
        let mut conn = BufReader::new(stream);

        let challenge = read_message(&mut conn).await?;
        if challenge.header("Content-Type") != Some("auth/request") {
            return Err(TransportError::Protocol(format!(
                "expected auth/request, got {:?}",
                challenge.header("Content-Type")
            )));
        }

        write_command(&mut conn, &format!("auth {}", self.password)).await?;
        let auth = read_message(&mut conn).await?;
        let reply = auth.header("Reply-Text").unwrap_or_default();
        if !reply.starts_with("+OK") {
            return Err(TransportError::Protocol(format!(
                "authentication rejected: {}",
                reply
            )));
        }

        write_command(&mut conn, &format!("api {}", command)).await?;
        let response = read_message(&mut conn).await?;

        let _ = conn.get_mut().shutdown().await;
        Ok(response.body)
    }
}

async fn write_command(conn: &mut BufReader<TcpStream>, command: &str) -> Result<(), TransportError> {
    let frame = format!("{}\n\n", command);
    conn.get_mut().write_all(frame.as_bytes()).await?;
    conn.get_mut().flush().await?;
    Ok(())
}

async fn read_message(conn: &mut BufReader<TcpStream>) -> Result<EslMessage, TransportError> {
    let mut message = EslMessage::default();
    let mut line = String::new();

    loop {
        line.clear();
        let read = conn.read_line(&mut line).await?;
        if read == 0 {
            return Err(TransportError::Receive("connection closed mid-message".to_string()));
        }
        let trimmed = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if trimmed.is_empty() {
            if message.headers.is_empty() {
                continue;
            }
            break;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            message
                .headers
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    if let Some(length) = message.header("Content-Length") {
        let length: usize = length
            .parse()
            .map_err(|_| TransportError::Protocol(format!("bad Content-Length: {}", length)))?;
        let mut body = vec![0u8; length];
        conn.read_exact(&mut body).await?;
        message.body = String::from_utf8_lossy(&body).into_owned();
    }

    Ok(message)
}

/// Parse `key: value` lines from a `uuid_dump` body
pub fn parse_channel_dump(body: &str) -> BTreeMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn telephony_error(err: TransportError) -> Error {
    Error::Telephony(err.to_string())
}

#[async_trait]
impl TelephonyControl for EslClient {
    async fn interrupt_playback(&self, call_id: &str) -> CoreResult<()> {
        let body = self
            .api(&format!("uuid_break {} all", call_id))
            .await
            .map_err(telephony_error)?;
        if body.contains("+OK") {
            tracing::debug!(call_id = %call_id, "uuid_break accepted");
            Ok(())
        } else {
            Err(Error::Telephony(format!("uuid_break failed: {}", body.trim())))
        }
    }

    async fn channel_info(&self, call_id: &str) -> CoreResult<BTreeMap<String, String>> {
        let body = self
            .api(&format!("uuid_dump {}", call_id))
            .await
            .map_err(telephony_error)?;
        if body.starts_with("-ERR") {
            return Err(Error::Telephony(format!("uuid_dump failed: {}", body.trim())));
        }
        Ok(parse_channel_dump(&body))
    }

    async fn hangup(&self, call_id: &str) -> CoreResult<()> {
        let body = self
            .api(&format!("uuid_kill {}", call_id))
            .await
            .map_err(telephony_error)?;
        if body.starts_with("-ERR") {
            return Err(Error::Telephony(format!("uuid_kill failed: {}", body.trim())));
        }
        Ok(())
    }
}

/// Stand-in used when no switch is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTelephony;

#[async_trait]
impl TelephonyControl for DisabledTelephony {
    async fn interrupt_playback(&self, call_id: &str) -> CoreResult<()> {
        tracing::debug!(call_id = %call_id, "Telephony control disabled, skipping uuid_break");
        Ok(())
    }

    async fn channel_info(&self, _call_id: &str) -> CoreResult<BTreeMap<String, String>> {
        Err(Error::Telephony("telephony control is not configured".to_string()))
    }

    async fn hangup(&self, _call_id: &str) -> CoreResult<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
