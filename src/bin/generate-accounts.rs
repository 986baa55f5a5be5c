use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bot_provision::accounts::{self, AccountDefaults, SuffixPolicy, DEFAULT_COUNTRY, DEFAULT_EMAIL};
use bot_provision::config::{self, BotConfig};
use bot_provision::db::{AccountStore, MySqlStore, SqliteStore};
use bot_provision::{util, Error};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;

/// Generate bot accounts in MySQL/SQLite table
#[derive(Parser, Debug)]
#[command(name = "generate-accounts", version, about)]
struct Cli {
    /// Path to bot server configs (config.yaml)
    #[arg(long, required_unless_present = "names", conflicts_with = "names")]
    config: Option<PathBuf>,

    /// Basenames of accounts to create instead of the ones listed in the config
    /// (space or comma separated)
    #[arg(long, num_args = 1.., value_delimiter = ',', requires = "account_password")]
    names: Vec<String>,

    /// Password for accounts created from --names
    #[arg(long)]
    account_password: Option<String>,

    /// Suffixes appended to each basename, one account per suffix
    #[arg(long, value_enum, default_value_t = SuffixPolicy::Hex)]
    suffixes: SuffixPolicy,

    /// Email stored with every account
    #[arg(long, default_value = DEFAULT_EMAIL)]
    email: String,

    /// Country stored with every account
    #[arg(long, default_value = DEFAULT_COUNTRY)]
    country: String,

    #[command(subcommand)]
    backend: Backend,
}

/// Database backend type
#[derive(Subcommand, Debug)]
enum Backend {
    Mysql {
        /// MySQL hostname/ip address
        #[arg(long)]
        host: String,

        /// MySQL listen port
        #[arg(long, default_value_t = 3306)]
        port: u16,

        /// MySQL user to login as
        #[arg(long)]
        user: String,

        /// Database holding the accounts table
        #[arg(long, default_value = "bf2gs")]
        database: String,
    },
    Sqlite {
        /// Path to SQLite database file
        #[arg(long)]
        database: PathBuf,
    },
}

impl Backend {
    async fn open(&self) -> anyhow::Result<Box<dyn AccountStore>> {
        match self {
            Backend::Mysql {
                host,
                port,
                user,
                database,
            } => {
                let password = rpassword::prompt_password(format!(
                    "Please enter the mysql password for \"{}\": ",
                    user
                ))
                .map_err(Error::Prompt)?;
                let store = MySqlStore::connect(host, *port, user, &password, database)
                    .await
                    .with_context(|| format!("failed to connect to mysql at {}:{}", host, port))?;
                Ok(Box::new(store))
            }
            Backend::Sqlite { database } => {
                let store = SqliteStore::open(database)
                    .with_context(|| format!("failed to open {}", database.display()))?;
                Ok(Box::new(store))
            }
        }
    }
}

impl Cli {
    fn bots(&self) -> anyhow::Result<Vec<BotConfig>> {
        if let Some(path) = &self.config {
            let configs = config::load(path)?;
            return Ok(configs.into_iter().flat_map(|server| server.bots).collect());
        }

        let password = self.account_password.clone().unwrap_or_default();
        Ok(self
            .names
            .iter()
            .map(|basename| BotConfig {
                basename: basename.clone(),
                password: password.clone(),
            })
            .collect())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    util::init_tracing();
    let cli = Cli::parse();

    let bots = cli.bots()?;
    info!(bots = bots.len(), policy = ?cli.suffixes, "generating accounts");

    let mut store = cli.backend.open().await?;
    let defaults = AccountDefaults {
        email: cli.email.clone(),
        country: cli.country.clone(),
    };
    let summary = accounts::provision(store.as_mut(), &bots, cli.suffixes, &defaults).await?;

    info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        failed = summary.failed,
        "batch done"
    );
    if summary.is_success() {
        println!(
            "Added all accounts ({} new, {} already present)",
            summary.inserted, summary.duplicates
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Failed to add some accounts ({} errors)", summary.failed);
        Ok(ExitCode::FAILURE)
    }
}
