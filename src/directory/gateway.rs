//! NationStates API client.
//!
//! Every request passes through the [`RateLimiter`] first. The gateway is
//! only ever reached through the pool lock, which is what makes the limiter
//! state safe to mutate here.
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::{parse, Directory};
use crate::error::{EllisError, Result};
use crate::limiters::RateLimiter;
use crate::record::{upstream_name, NationRecord};
use crate::settings::{TelegramCredentials, UpstreamSettings};
use crate::{config_error, transport_error};

pub struct DirectoryGateway {
    client: reqwest::Client,
    limiter: RateLimiter,
    api_base_url: String,
    telegram: Option<TelegramCredentials>,
}

impl std::fmt::Debug for DirectoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryGateway")
            .field("api_base_url", &self.api_base_url)
            .field("limiter", &self.limiter.snapshot())
            .field("has_telegram", &self.telegram.is_some())
            .finish()
    }
}

impl DirectoryGateway {
    pub fn new(upstream: &UpstreamSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(upstream.user_agent())
            .build()
            .map_err(|e| config_error!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            limiter: RateLimiter::new(),
            api_base_url: upstream.api_base_url.clone(),
            telegram: upstream.telegram.clone(),
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn nation_url(&self, name: &str) -> String {
        format!("{}?nation={}", self.api_base_url, upstream_name(name))
    }

    fn foundings_url(&self) -> String {
        format!("{}?q=happenings;filter=founding", self.api_base_url)
    }

    fn recruitable_url(&self, name: &str, region: Option<&str>) -> String {
        let mut url = format!("{}&q=tgcanrecruit", self.nation_url(name));
        if let Some(region) = region {
            url.push_str("&from=");
            url.push_str(&upstream_name(region));
        }
        url
    }

    fn telegram_url(&self, credentials: &TelegramCredentials, recipient: &str) -> String {
        format!(
            "{}?a=sendTG&client={}&tgid={}&key={}&to={}",
            self.api_base_url,
            credentials.api_key,
            credentials.telegram_id,
            credentials.secret_key,
            upstream_name(recipient)
        )
    }

    /// Issue a single GET and hand back the body.
    ///
    /// `what` names the request in errors; telegram URLs carry secrets so the
    /// URL itself is never logged.
    async fn send_request(&self, url: &str, what: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error!("{} request failed: {}", what, e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EllisError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(transport_error!("{} returned HTTP {}", what, status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| transport_error!("{} body could not be read: {}", what, e))
    }
}

#[async_trait]
impl Directory for DirectoryGateway {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_foundings(&mut self) -> Result<Vec<NationRecord>> {
        self.limiter.acquire_general().await;
        let body = self.send_request(&self.foundings_url(), "foundings").await?;
        let foundings = parse::parse_foundings(&body)?;
        debug!("Upstream reported {} foundings", foundings.len());
        Ok(foundings)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_nation(&mut self, name: &str) -> Result<NationRecord> {
        self.limiter.acquire_general().await;
        let what = format!("nation {}", name);
        let body = self.send_request(&self.nation_url(name), &what).await?;
        let mut record = parse::parse_nation(&body)?;
        if record.get(crate::record::NAME).is_none() {
            record.set(crate::record::NAME, name);
        }
        Ok(record)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_recruitable(&mut self, name: &str, region: Option<&str>) -> Result<bool> {
        self.limiter.acquire_general().await;
        let what = format!("recruitable flag for {}", name);
        let body = self
            .send_request(&self.recruitable_url(name, region), &what)
            .await?;
        parse::parse_recruitable(&body)
    }

    #[instrument(skip(self), level = "debug")]
    async fn send_telegram(&mut self, recipient: &str) -> Result<()> {
        let credentials = self
            .telegram
            .clone()
            .ok_or_else(|| config_error!("No telegram credentials configured"))?;
        self.limiter.acquire_telegram().await;
        let what = format!("telegram to {}", recipient);
        // Fire and forget: the body is not interpreted, but a 404 is still
        // a failed send rather than a missing nation.
        match self
            .send_request(&self.telegram_url(&credentials, recipient), &what)
            .await
        {
            Ok(_) => Ok(()),
            Err(EllisError::NotFound(what)) => Err(transport_error!("{} returned HTTP 404", what)),
            Err(e) => Err(e),
        }
    }
}
