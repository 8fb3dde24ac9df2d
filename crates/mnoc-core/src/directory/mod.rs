//! Service directory REST client.
//!
//! The directory is the inventory of record: it knows each device's
//! management address and holds the desired VLAN set per device.

use std::fmt;
use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use thiserror::Error;
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::models::{DbVlan, Device, NewVlan};
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Invalid directory configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Directory HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Directory API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Reads and writes the directory's view of devices and VLANs (async)
#[allow(async_fn_in_trait)]
pub trait Directory {
    async fn get_device(&self, device_id: i64) -> DirectoryResult<Device>;

    /// All VLAN records attached to a device
    async fn list_vlans(&self, device_id: i64) -> DirectoryResult<Vec<DbVlan>>;

    async fn create_vlan(&self, vlan: &NewVlan) -> DirectoryResult<()>;

    /// Overwrite the record addressed by `vlan.id`
    async fn update_vlan(&self, vlan: &DbVlan) -> DirectoryResult<()>;

    async fn delete_vlan(&self, vlan_id: i64) -> DirectoryResult<()>;
}

/// HTTP implementation of [`Directory`] using basic auth.
#[derive(Clone)]
pub struct DirectoryClient {
    base_url: String,
    user: String,
    password: String,
    client: reqwest::Client,
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DirectoryClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> DirectoryResult<Self> {
        let base_url = normalize_text_option(Some(base_url.into())).ok_or_else(|| {
            DirectoryError::InvalidConfiguration("base URL must not be empty".to_string())
        })?;
        if !is_http_url(&base_url) {
            return Err(DirectoryError::InvalidConfiguration(
                "base URL must include http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> DirectoryResult<Self> {
        Self::new(
            config.base_url(),
            &config.user,
            &config.password,
            config.timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
    }
}

impl Directory for DirectoryClient {
    async fn get_device(&self, device_id: i64) -> DirectoryResult<Device> {
        let url = format!("{}/devices/{device_id}/", self.base_url);
        let response = self.authed(self.client.get(&url)).send().await?;
        let device = ensure_success(response).await?.json::<Device>().await?;
        debug!(device_id, management_ip = %device.management_ip, "Resolved device");
        Ok(device)
    }

    async fn list_vlans(&self, device_id: i64) -> DirectoryResult<Vec<DbVlan>> {
        let url = format!("{}/vlans/?device__id={device_id}", self.base_url);
        let response = self.authed(self.client.get(&url)).send().await?;
        Ok(ensure_success(response).await?.json::<Vec<DbVlan>>().await?)
    }

    async fn create_vlan(&self, vlan: &NewVlan) -> DirectoryResult<()> {
        let url = format!("{}/vlans/", self.base_url);
        let response = self.authed(self.client.post(&url)).json(vlan).send().await?;
        ensure_success(response).await?;
        debug!(device_id = vlan.device, tag = vlan.tag, "Created VLAN record");
        Ok(())
    }

    async fn update_vlan(&self, vlan: &DbVlan) -> DirectoryResult<()> {
        let url = format!("{}/vlans/{}", self.base_url, vlan.id);
        let response = self.authed(self.client.put(&url)).json(vlan).send().await?;
        ensure_success(response).await?;
        debug!(vlan_id = vlan.id, tag = vlan.tag, "Updated VLAN record");
        Ok(())
    }

    async fn delete_vlan(&self, vlan_id: i64) -> DirectoryResult<()> {
        let url = format!("{}/vlans/{vlan_id}", self.base_url);
        let response = self.authed(self.client.delete(&url)).send().await?;
        ensure_success(response).await?;
        debug!(vlan_id, "Deleted VLAN record");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> DirectoryResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        compact_text(&body)
    };
    Err(DirectoryError::Api { status, message })
}
