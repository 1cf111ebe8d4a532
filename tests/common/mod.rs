#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ellis::directory::Directory;
use ellis::error::{EllisError, Result};
use ellis::record::NationRecord;
use ellis::settings::{Settings, UpstreamSettings};

#[derive(Default)]
pub struct UpstreamState {
    pub nations: HashMap<String, NationRecord>,
    pub unrecruitable: HashSet<String>,
    pub telegrams: Vec<String>,
}

/// Directory backed by a map; clones share state
#[derive(Clone, Default)]
pub struct MapDirectory {
    pub state: Arc<Mutex<UpstreamState>>,
}

impl MapDirectory {
    pub fn with_nations(names: &[&str]) -> Self {
        let directory = Self::default();
        {
            let mut state = directory.state.lock().unwrap();
            for name in names {
                state.nations.insert(
                    name.to_string(),
                    NationRecord::new(*name).with("region", "the_field"),
                );
            }
        }
        directory
    }
}

#[async_trait]
impl Directory for MapDirectory {
    async fn fetch_foundings(&mut self) -> Result<Vec<NationRecord>> {
        // a quiet feed; stands in for upstream latency
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Vec::new())
    }

    async fn fetch_nation(&mut self, name: &str) -> Result<NationRecord> {
        self.state
            .lock()
            .unwrap()
            .nations
            .get(name)
            .cloned()
            .ok_or_else(|| EllisError::NotFound(name.to_string()))
    }

    async fn fetch_recruitable(&mut self, name: &str, _region: Option<&str>) -> Result<bool> {
        Ok(!self.state.lock().unwrap().unrecruitable.contains(name))
    }

    async fn send_telegram(&mut self, recipient: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .telegrams
            .push(recipient.to_string());
        Ok(())
    }
}

pub fn settings_in(data_dir: &Path) -> Settings {
    Settings {
        listen_address: "127.0.0.1".to_string(),
        listen_port: 0,
        upstream: UpstreamSettings {
            api_base_url: "http://127.0.0.1:1/cgi-bin/api.cgi".to_string(),
            user_nation: "Test".to_string(),
            user_region: "Test".to_string(),
            telegram: None,
        },
        data_dir: data_dir.to_path_buf(),
        autorecruit: false,
    }
}
