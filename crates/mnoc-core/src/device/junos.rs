//! Junos REST API transport.
//!
//! Every call is a single `POST /rpc?stop-on-error=1`. Reads ask for the
//! committed `vlans` stanza as JSON; writes lock the candidate, load the
//! rendered stanza, commit and unlock within the same request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Response;
use serde::Deserialize;
use tracing::{debug, info};

use super::{DeviceConnector, DeviceError, DeviceResult, DeviceTransport, VlanConfigTemplate};
use crate::config::DeviceConfig;
use crate::models::DeviceVlan;
use crate::util::compact_text;

const GET_VLANS_RPC: &str = "<get-configuration database=\"committed\" format=\"json\">\
<configuration><vlans/></configuration>\
</get-configuration>";

/// Shared settings for reaching Junos devices.
#[derive(Clone)]
pub struct JunosRestConnector {
    scheme: String,
    port: u16,
    user: String,
    password: String,
    client: reqwest::Client,
    template: Arc<VlanConfigTemplate>,
}

impl std::fmt::Debug for JunosRestConnector {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JunosRestConnector")
            .field("scheme", &self.scheme)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl JunosRestConnector {
    pub fn new(
        scheme: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> DeviceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::InvalidResponse(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            scheme: scheme.into(),
            port,
            user: user.into(),
            password: password.into(),
            client,
            template: Arc::new(VlanConfigTemplate::new()?),
        })
    }

    pub fn from_config(config: &DeviceConfig) -> DeviceResult<Self> {
        Self::new(
            &config.scheme,
            config.port,
            &config.user,
            &config.password,
            config.timeout,
        )
    }
}

impl DeviceConnector for JunosRestConnector {
    type Transport = JunosRestTransport;

    fn connect(&self, host: &str) -> DeviceResult<JunosRestTransport> {
        let host = host.trim();
        if host.is_empty() {
            return Err(DeviceError::Unreachable {
                host: String::new(),
                message: "device has no management address".to_string(),
            });
        }

        // IPv6 literals need brackets inside a URL
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        };

        Ok(JunosRestTransport {
            host: host.to_string(),
            endpoint: format!("{}://{authority}/rpc?stop-on-error=1", self.scheme),
            connector: self.clone(),
        })
    }
}

/// Transport bound to one device.
#[derive(Debug, Clone)]
pub struct JunosRestTransport {
    host: String,
    endpoint: String,
    connector: JunosRestConnector,
}

impl JunosRestTransport {
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn call(&self, body: String, accept: &str) -> DeviceResult<String> {
        let response = self
            .connector
            .client
            .post(&self.endpoint)
            .basic_auth(&self.connector.user, Some(&self.connector.password))
            .header("Content-Type", "application/xml")
            .header("Accept", accept)
            .body(body)
            .send()
            .await
            .map_err(|e| self.unreachable(&e))?;

        self.read_reply(response).await
    }

    async fn read_reply(&self, response: Response) -> DeviceResult<String> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.unreachable(&e))?;

        if !status.is_success() {
            let detail = extract_error_message(&body).unwrap_or_else(|| compact_text(&body));
            return Err(self.rpc_error(format!("HTTP {}: {detail}", status.as_u16())));
        }
        if let Some(message) = extract_error_message(&body) {
            return Err(self.rpc_error(message));
        }
        Ok(body)
    }

    fn unreachable(&self, error: &reqwest::Error) -> DeviceError {
        DeviceError::Unreachable {
            host: self.host.clone(),
            message: error.to_string().replace('\n', " "),
        }
    }

    fn rpc_error(&self, message: String) -> DeviceError {
        DeviceError::Rpc {
            host: self.host.clone(),
            message,
        }
    }
}

impl DeviceTransport for JunosRestTransport {
    async fn get_vlan_list(&self) -> DeviceResult<Vec<DeviceVlan>> {
        let body = self
            .call(GET_VLANS_RPC.to_string(), "application/json")
            .await?;
        let vlans = parse_vlan_configuration(&body)?;
        debug!(host = %self.host, count = vlans.len(), "Read VLAN configuration");
        Ok(vlans)
    }

    async fn sync_config_to_vlans(&self, vlans: &[DeviceVlan]) -> DeviceResult<()> {
        let config = self.connector.template.render(vlans)?;
        let body = format!(
            "<lock-configuration/>\
             <load-configuration action=\"replace\" format=\"text\">\
             <configuration-text>{}</configuration-text>\
             </load-configuration>\
             <commit-configuration/>\
             <unlock-configuration/>",
            xml_escape(&config)
        );

        self.call(body, "application/xml").await?;
        info!(host = %self.host, count = vlans.len(), "Committed VLAN configuration");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ConfigurationReply {
    configuration: Option<ConfigurationBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigurationBody {
    #[serde(default)]
    vlans: Option<VlansStanza>,
}

#[derive(Debug, Deserialize)]
struct VlansStanza {
    #[serde(default)]
    vlan: OneOrMany<DeviceVlan>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Pull the VLAN list out of a `get-configuration` JSON reply. A device
/// without a `vlans` stanza has no VLANs.
fn parse_vlan_configuration(body: &str) -> DeviceResult<Vec<DeviceVlan>> {
    let reply: ConfigurationReply = serde_json::from_str(body).map_err(|e| {
        DeviceError::InvalidResponse(format!("{e}: {}", compact_text(body)))
    })?;

    let configuration = reply.configuration.ok_or_else(|| {
        DeviceError::InvalidResponse("reply has no configuration element".to_string())
    })?;

    Ok(configuration
        .vlans
        .map(|stanza| stanza.vlan.into())
        .unwrap_or_default())
}

/// First `<error-message>` of an `<rpc-error>` with error severity.
fn extract_error_message(body: &str) -> Option<String> {
    for error in body.split("<rpc-error>").skip(1) {
        let error = error.split("</rpc-error>").next().unwrap_or(error);
        if inner_text(error, "error-severity").is_some_and(|severity| severity != "error") {
            continue;
        }
        return Some(
            inner_text(error, "error-message")
                .map_or_else(|| "unspecified RPC error".to_string(), compact_text),
        );
    }
    None
}

fn inner_text<'a>(fragment: &'a str, element: &str) -> Option<&'a str> {
    let open = format!("<{element}>");
    let close = format!("</{element}>");
    let start = fragment.find(&open)? + open.len();
    let end = fragment[start..].find(&close)? + start;
    Some(fragment[start..end].trim())
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
