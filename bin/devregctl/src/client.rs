//! ---
//! devreg_section: "05-networking-external-interfaces"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "HTTP client for the device registry REST API."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use devreg_api::{DeviceResponse, ErrorResponse};
use devreg_core::{DeviceRegistration, TopologyNode};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

pub struct RegistryClient {
    base: Url,
    http: Client,
}

impl RegistryClient {
    pub fn new(server: &str) -> Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server url {server}"))?;
        if base.cannot_be_a_base() {
            bail!("server url {server} cannot carry a path");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build http client")?;
        Ok(Self { base, http })
    }

    pub async fn register(&self, registration: &DeviceRegistration) -> Result<DeviceResponse> {
        let response = self
            .http
            .post(self.url(&["devices"])?)
            .json(registration)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.base))?;
        decode(response).await
    }

    pub async fn list(&self) -> Result<Vec<DeviceResponse>> {
        self.get_json(&["devices"]).await
    }

    pub async fn get(&self, mac: &str) -> Result<DeviceResponse> {
        self.get_json(&["devices", mac]).await
    }

    pub async fn forest(&self) -> Result<Vec<TopologyNode>> {
        self.get_json(&["devices", "topology"]).await
    }

    pub async fn subtree(&self, mac: &str) -> Result<TopologyNode> {
        self.get_json(&["devices", "topology", mac]).await
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = self
            .http
            .get(self.url(segments)?)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.base))?;
        decode(response).await
    }

    /// Append percent-encoded `segments` to the server url.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("server url {} cannot carry a path", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .context("failed to read server response")?;
    if !status.is_success() {
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(err) => bail!("{} ({}): {}", status, err.error, err.message),
            Err(_) => bail!("server returned {status}"),
        }
    }
    // Topologies nest two levels per device, past serde_json's default limit.
    let mut deserializer = serde_json::Deserializer::from_slice(&body);
    deserializer.disable_recursion_limit();
    let value = <T as serde::Deserialize>::deserialize(&mut deserializer)
        .context("failed to decode server response")?;
    deserializer
        .end()
        .context("trailing data in server response")?;
    Ok(value)
}
