use std::path::PathBuf;

use anyhow::Context;
use bot_provision::config::{self, ServerUpdate, DEFAULT_MOD, DEFAULT_OVERPOPULATE_FACTOR};
use bot_provision::names::{self, NameSourceKind, GAMERTAG_API_URL};
use bot_provision::util;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

/// Generate server configuration (including bots) and add it to a given config file
#[derive(Parser, Debug)]
#[command(name = "generate-server-config", version, about)]
struct Cli {
    /// Path to bot server configs (config.yaml)
    #[arg(long)]
    config: PathBuf,

    /// Name of the server
    #[arg(long)]
    name: String,

    /// IP address of the server
    #[arg(long)]
    address: String,

    /// Game port of the server
    #[arg(long)]
    port: u16,

    /// Query port of the server
    #[arg(long)]
    query_port: Option<u16>,

    /// Mod the server is running by default (without "mods/" prefix)
    #[arg(long = "mod", default_value = DEFAULT_MOD)]
    game_mod: String,

    /// Number of slots to fill with bots
    #[arg(long)]
    slots: u32,

    /// Number of slots to keep free for real players
    #[arg(long)]
    reserved_slots: u32,

    /// Maximum factor to determine how many bots may be launched beyond the desired slot count
    #[arg(long, default_value_t = DEFAULT_OVERPOPULATE_FACTOR)]
    overpopulate_factor: u32,

    /// Source for names of bots
    #[arg(long, value_enum, default_value_t = NameSourceKind::GlitchApi)]
    name_source: NameSourceKind,

    /// Endpoint of the gamertag generator used by the glitch.me source
    #[arg(long, env = "BOT_NAME_API_URL", default_value = GAMERTAG_API_URL)]
    name_api_url: String,

    /// Disable autobalancing bots between teams
    #[arg(long)]
    no_autobalance: bool,

    /// Query the server directly instead of using the bflist API
    #[arg(long)]
    query_directly: bool,

    /// Rotate bot names whenever bots are relaunched
    #[arg(long)]
    rotate_bot_names: bool,
}

impl Cli {
    fn update(&self) -> ServerUpdate {
        ServerUpdate {
            name: self.name.clone(),
            address: self.address.clone(),
            port: self.port,
            query_port: self.query_port,
            game_mod: ServerUpdate::mod_path(&self.game_mod),
            slots: self.slots,
            reserved_slots: self.reserved_slots,
            autobalance: self.no_autobalance.then_some(false),
            query_directly: self.query_directly.then_some(true),
            rotate_bot_names: self.rotate_bot_names.then_some(true),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    util::init_tracing();
    let cli = Cli::parse();

    let mut configs = config::load_or_default(&cli.config)?;
    let mut taken = config::bot_names(&configs);
    let (index, created) = config::find_or_create(&mut configs, &cli.update());
    let server = &mut configs[index];
    server.validate()?;
    if created {
        info!(address = %server.address, port = server.port, "adding new server");
    } else {
        info!(address = %server.address, port = server.port, "updating existing server");
    }

    let need = server.bots_needed(cli.overpopulate_factor);
    let mut source = names::source_for(cli.name_source, &cli.name_api_url);
    let added = names::fill_bots(source.as_mut(), &mut taken, server, need).await?;
    let total = server.bots.len();

    config::save(&cli.config, &configs)
        .with_context(|| format!("failed to write {}", cli.config.display()))?;

    println!(
        "Added {} bots to {}:{} ({} total)",
        added, cli.address, cli.port, total
    );
    Ok(())
}
