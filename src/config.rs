use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::util;

pub const DEFAULT_MOD: &str = "bf2";
pub const DEFAULT_OVERPOPULATE_FACTOR: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub basename: String,
    #[serde(default)]
    pub password: String,
}

/// One game server entry of the bot config file. Unset optional fields are
/// left out when the file is written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_port: Option<u16>,
    #[serde(default, rename = "mod")]
    pub game_mod: String,
    #[serde(default)]
    pub slots: u32,
    #[serde(default)]
    pub reserved_slots: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autobalance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_directly: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate_bot_names: Option<bool>,
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

/// Fields supplied on a single config editor run. `None` means "not given"
/// and leaves a stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ServerUpdate {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub query_port: Option<u16>,
    pub game_mod: String,
    pub slots: u32,
    pub reserved_slots: u32,
    pub autobalance: Option<bool>,
    pub query_directly: Option<bool>,
    pub rotate_bot_names: Option<bool>,
}

impl ServerUpdate {
    pub fn mod_path(game_mod: &str) -> String {
        format!("mods/{}", game_mod)
    }
}

impl ServerConfig {
    pub fn matches(&self, address: &str, port: u16) -> bool {
        self.address == address && self.port == port
    }

    pub fn apply(&mut self, update: &ServerUpdate) {
        self.name = update.name.clone();
        self.game_mod = update.game_mod.clone();
        self.slots = update.slots;
        self.reserved_slots = update.reserved_slots;
        if update.query_port.is_some() {
            self.query_port = update.query_port;
        }
        if update.autobalance.is_some() {
            self.autobalance = update.autobalance;
        }
        if update.query_directly.is_some() {
            self.query_directly = update.query_directly;
        }
        if update.rotate_bot_names.is_some() {
            self.rotate_bot_names = update.rotate_bot_names;
        }
    }

    /// Bots to provision for this server. Saturates instead of overflowing
    /// for absurd slot counts.
    pub fn bots_needed(&self, overpopulate_factor: u32) -> usize {
        (self.slots as usize).saturating_mul(overpopulate_factor as usize)
    }

    pub fn requires_query_port(&self) -> Result<bool> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|_| Error::InvalidAddress(self.address.clone()))?;
        Ok(!util::is_global(ip) || self.query_directly.unwrap_or(false))
    }

    pub fn validate(&self) -> Result<()> {
        if self.query_port.is_none() && self.requires_query_port()? {
            return Err(Error::QueryPortRequired);
        }
        Ok(())
    }
}

impl From<&ServerUpdate> for ServerConfig {
    fn from(update: &ServerUpdate) -> Self {
        let mut config = ServerConfig {
            address: update.address.clone(),
            port: update.port,
            ..Default::default()
        };
        config.apply(update);
        config
    }
}

/// Returns the index of the entry at (address, port), merging `update` into it
/// or appending a fresh entry when none exists.
pub fn find_or_create(configs: &mut Vec<ServerConfig>, update: &ServerUpdate) -> (usize, bool) {
    match configs
        .iter()
        .position(|config| config.matches(&update.address, update.port))
    {
        Some(index) => {
            configs[index].apply(update);
            (index, false)
        }
        None => {
            configs.push(ServerConfig::from(update));
            (configs.len() - 1, true)
        }
    }
}

pub fn bot_names(configs: &[ServerConfig]) -> HashSet<String> {
    configs
        .iter()
        .flat_map(|server| server.bots.iter())
        .map(|bot| bot.basename.clone())
        .collect()
}

pub fn parse(raw: &str) -> Result<Vec<ServerConfig>> {
    let configs: Option<Vec<ServerConfig>> = serde_yaml::from_str(raw)?;
    Ok(configs.unwrap_or_default())
}

pub fn render(configs: &[ServerConfig]) -> Result<String> {
    Ok(serde_yaml::to_string(configs)?)
}

pub fn load(path: &Path) -> Result<Vec<ServerConfig>> {
    if !path.is_file() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    parse(&raw)
}

pub fn load_or_default(path: &Path) -> Result<Vec<ServerConfig>> {
    match load(path) {
        Err(Error::ConfigNotFound(path)) => {
            warn!(
                "Could not find config file at given path ({}), creating new config",
                path.display()
            );
            Ok(Vec::new())
        }
        result => result,
    }
}

pub fn save(path: &Path, configs: &[ServerConfig]) -> Result<()> {
    let raw = render(configs)?;
    fs::write(path, raw).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
