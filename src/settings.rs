//! Ellis application settings
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config_error;
use crate::error::Result;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_TCP: u16 = 4526;
pub const DEFAULT_PORT_TCP: &str = "4526";
pub const DEFAULT_API_BASE_URL: &str = "https://www.nationstates.net/cgi-bin/api.cgi";

pub const AVAILABLE_FILE: &str = "saved_nations";
pub const RENTED_FILE: &str = "rented_nations";
pub const RECRUITED_FILE: &str = "recruited_nations";
pub const BLACKLIST_FILE: &str = "blacklists";

/// Credentials for the telegram-sending API call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub telegram_id: String,
    pub secret_key: String,
    pub api_key: String,
}

/// Who we are when talking to the upstream directory
#[derive(Clone, Debug)]
pub struct UpstreamSettings {
    pub api_base_url: String,
    // The operator's nation, named in every User-Agent
    pub user_nation: String,
    // The operator's region, named in every User-Agent
    pub user_region: String,
    pub telegram: Option<TelegramCredentials>,
}

impl UpstreamSettings {
    pub fn user_agent(&self) -> String {
        format!(
            "{} v{}, request for {} on behalf of {}",
            APP_NAME, APP_VERSION, self.user_nation, self.user_region
        )
    }

    /// Upstream asks for an identifying nation and region on every request
    pub fn validate(&self) -> Result<()> {
        if is_unset(&self.user_nation) {
            return Err(config_error!("You MUST provide a Nation!"));
        }
        if is_unset(&self.user_region) {
            return Err(config_error!("You MUST provide a Region!"));
        }
        Ok(())
    }
}

fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("unknown")
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // TCP listen port for the nation protocol
    pub listen_port: u16,

    // Upstream directory configuration
    pub upstream: UpstreamSettings,

    // Directory holding the bucket and blacklist files
    pub data_dir: PathBuf,

    // Run the autorecruit module alongside the server
    pub autorecruit: bool,
}

impl Settings {
    pub fn socket_address(&self) -> Result<SocketAddr> {
        let address = format!("{}:{}", self.listen_address, self.listen_port);
        address
            .parse::<SocketAddr>()
            .map_err(|e| config_error!("Invalid listen address {}: {}", address, e))
    }

    pub fn validate(&self) -> Result<()> {
        self.upstream.validate()?;
        if self.autorecruit && self.upstream.telegram.is_none() {
            return Err(config_error!(
                "Autorecruit needs a telegram id, secret key and API key"
            ));
        }
        Ok(())
    }

    pub fn available_path(&self) -> PathBuf {
        self.data_path(AVAILABLE_FILE)
    }

    pub fn rented_path(&self) -> PathBuf {
        self.data_path(RENTED_FILE)
    }

    pub fn recruited_path(&self) -> PathBuf {
        self.data_path(RECRUITED_FILE)
    }

    pub fn blacklist_path(&self) -> PathBuf {
        self.data_path(BLACKLIST_FILE)
    }

    fn data_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(name)
    }
}
