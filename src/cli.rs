//! CLI for this application
//!
use std::path::PathBuf;

use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "ellis", version, about = "Hands out recruitable nations over TCP")]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("ELLIS_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // TCP listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_TCP,
        env("ELLIS_LISTEN_PORT"),
        help = "Port to bind the Ellis protocol server to"
    )]
    pub listen_port: u16,

    #[clap(
        long,
        env("ELLIS_NS_NATION"),
        help = "Your nation, sent to NationStates in the User-Agent"
    )]
    pub nation: String,

    #[clap(
        long,
        env("ELLIS_NS_REGION"),
        help = "The region you recruit for, sent in the User-Agent"
    )]
    pub region: String,

    #[clap(
        long,
        default_value = settings::DEFAULT_API_BASE_URL,
        env("ELLIS_API_BASE_URL"),
        help = "NationStates API endpoint"
    )]
    pub api_base_url: String,

    #[clap(
        long,
        default_value = ".",
        env("ELLIS_DATA_DIR"),
        help = "Directory holding saved nations and blacklists"
    )]
    pub data_dir: PathBuf,

    #[clap(
        long,
        env("ELLIS_AUTORECRUIT"),
        help = "Run the autorecruit module (needs telegram credentials)"
    )]
    pub autorecruit: bool,

    #[clap(long, env("ELLIS_TG_ID"), help = "Recruitment telegram id")]
    pub telegram_id: Option<String>,

    #[clap(long, env("ELLIS_TG_SECRET_KEY"), help = "Recruitment telegram secret key")]
    pub telegram_secret_key: Option<String>,

    #[clap(long, env("ELLIS_API_KEY"), help = "NationStates API client key")]
    pub api_key: Option<String>,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        let telegram = match (self.telegram_id, self.telegram_secret_key, self.api_key) {
            (Some(telegram_id), Some(secret_key), Some(api_key)) => {
                Some(settings::TelegramCredentials {
                    telegram_id,
                    secret_key,
                    api_key,
                })
            }
            _ => None,
        };
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            upstream: settings::UpstreamSettings {
                api_base_url: self.api_base_url,
                user_nation: self.nation,
                user_region: self.region,
                telegram,
            },
            data_dir: self.data_dir,
            autorecruit: self.autorecruit,
        }
    }
}
