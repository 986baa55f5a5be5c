use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{BotConfig, ServerConfig};
use crate::error::{Error, Result};
use crate::util;

pub const BASENAME_MAX_LEN: usize = 16;
pub const GAMERTAG_API_URL: &str =
    "https://story-shack-cdn-v2.glitch.me/generators/gamertag-generator";
// Some other count values make the API return errors.
pub const GAMERTAG_PAGE_SIZE: u32 = 6;

pub const AI_NAMES: &[&str] = &[
    "HAL9000", "Skynet", "GLaDOS", "Cortana", "Jarvis", "Ultron", "Wintermute",
    "Neuromancer", "Bender", "Marvin", "Bishop", "RoyBatty", "Sonny", "Samantha",
    "KITT", "RobbyTheRobot", "Gort", "Colossus", "Proteus", "Mother", "TARS", "CASE",
    "EDI", "Legion", "SHODAN", "VIKI", "Dolores", "Maeve", "Baymax", "WallE", "EVE",
    "Johnny5", "Optimus", "Megatron", "Mettaton", "Claptrap", "Chappie", "Ava",
    "Dot Matrix", "Kryten", "Holly", "Orac", "Zen", "K9", "R2D2", "C3PO", "BB8",
    "HK47", "IG88", "L3-37", "K2SO", "Vision", "Friday", "Karen", "Edith", "AUTO",
    "MCP", "Tron", "Clu", "David8", "Walter", "Ash", "Max Headroom", "Deep Thought",
    "Eddie", "Emerl", "Metal Sonic", "ZeroTwo", "Atom", "Astro Boy", "Robocop",
    "T-800", "T-1000", "Rachael", "Pris", "Data", "Lore", "Ziggy", "Gerty",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NameSourceKind {
    #[value(name = "glitch.me")]
    GlitchApi,
    #[value(name = "ai-names")]
    AiNames,
}

/// Where candidate bot basenames come from. Sources are pulled one name at a
/// time; `Ok(None)` means the source has run dry.
#[async_trait]
pub trait BotNameSource: Send {
    async fn next_name(&mut self) -> Result<Option<String>>;
}

pub struct StaticNames {
    names: VecDeque<String>,
}

impl StaticNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ai_names() -> Self {
        Self::new(AI_NAMES.iter().copied())
    }
}

#[async_trait]
impl BotNameSource for StaticNames {
    async fn next_name(&mut self) -> Result<Option<String>> {
        Ok(self.names.pop_front())
    }
}

#[derive(Debug, Deserialize)]
struct GamertagPage {
    data: Vec<Gamertag>,
}

#[derive(Debug, Deserialize)]
struct Gamertag {
    name: String,
}

/// Pages through the remote gamertag generator. Any failed request aborts,
/// there is no retry.
pub struct GamertagApi {
    client: reqwest::Client,
    url: String,
    page_size: u32,
    buffer: VecDeque<String>,
}

impl GamertagApi {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            page_size: GAMERTAG_PAGE_SIZE,
            buffer: VecDeque::new(),
        }
    }

    async fn fetch_page(&self) -> Result<Vec<String>> {
        debug!(url = %self.url, count = self.page_size, "fetching bot names");
        let response = self
            .client
            .get(&self.url)
            .query(&[("count", self.page_size)])
            .send()
            .await
            .map_err(|error| Error::NameFetch(error.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::NameApiStatus(response.status().as_u16()));
        }

        let page = response
            .json::<GamertagPage>()
            .await
            .map_err(|error| Error::NameFetch(error.to_string()))?;
        Ok(page.data.into_iter().map(|tag| tag.name).collect())
    }
}

#[async_trait]
impl BotNameSource for GamertagApi {
    async fn next_name(&mut self) -> Result<Option<String>> {
        if self.buffer.is_empty() {
            let page = self.fetch_page().await?;
            if page.is_empty() {
                warn!("name api returned an empty page");
                return Ok(None);
            }
            self.buffer.extend(page);
        }
        Ok(self.buffer.pop_front())
    }
}

pub fn source_for(kind: NameSourceKind, api_url: &str) -> Box<dyn BotNameSource> {
    match kind {
        NameSourceKind::GlitchApi => Box::new(GamertagApi::new(api_url)),
        NameSourceKind::AiNames => Box::new(StaticNames::ai_names()),
    }
}

/// Pulls names from `source` until `server` holds `need` bots. `taken` holds
/// every basename already in use and grows with each accepted name. Returns
/// how many bots were added.
pub async fn fill_bots(
    source: &mut dyn BotNameSource,
    taken: &mut HashSet<String>,
    server: &mut ServerConfig,
    need: usize,
) -> Result<usize> {
    let mut added = 0;
    while server.bots.len() < need {
        let Some(name) = source.next_name().await? else {
            warn!(
                "Ran out of bot names (need {} more)",
                need - server.bots.len()
            );
            break;
        };

        if name.chars().count() > BASENAME_MAX_LEN || taken.contains(&name) {
            debug!(name = %name, "skipping bot name");
            continue;
        }

        taken.insert(name.clone());
        server.bots.push(BotConfig {
            basename: name,
            password: util::generate_password(util::PASSWORD_LENGTH),
        });
        added += 1;

        if server.bots.len() < need {
            info!(
                "Generating bot names (need {} more)",
                need - server.bots.len()
            );
        }
    }
    Ok(added)
}
