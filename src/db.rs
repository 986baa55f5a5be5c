use std::path::Path;

use async_trait::async_trait;
use rusqlite::{ffi, params, Connection};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Row};
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub email: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateSkipped,
    Failed(String),
}

/// The `accounts` table of the game's login database.
#[async_trait]
pub trait AccountStore: Send {
    async fn last_id(&mut self) -> Result<Option<i64>>;

    /// A taken name is `DuplicateSkipped`. A taken id is `Failed` on SQLite but
    /// `DuplicateSkipped` on MySQL, which reports both as error 1062.
    async fn insert(&mut self, account: &Account) -> InsertOutcome;
}

pub struct SqliteStore {
    conn: Connection,
}

fn create_accounts_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            email TEXT NOT NULL,
            country TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        create_accounts_table(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_accounts_table(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn last_id(&mut self) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT MAX(id) FROM accounts", [], |row| row.get(0))?;
        Ok(id)
    }

    async fn insert(&mut self, account: &Account) -> InsertOutcome {
        let result = self.conn.execute(
            "INSERT INTO accounts (id, name, password, email, country) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.id,
                account.name,
                account.password,
                account.email,
                account.country
            ],
        );

        match result {
            Ok(_) => InsertOutcome::Inserted,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                InsertOutcome::DuplicateSkipped
            }
            Err(e) => InsertOutcome::Failed(e.to_string()),
        }
    }
}

pub struct MySqlStore {
    conn: MySqlConnection,
}

impl MySqlStore {
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self> {
        debug!(host, port, user, database, "connecting to mysql");
        let conn = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(user)
            .password(password)
            .database(database)
            .connect()
            .await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn last_id(&mut self) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT CAST(MAX(id) AS SIGNED) AS id FROM accounts")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(row.try_get::<Option<i64>, _>("id")?)
    }

    async fn insert(&mut self, account: &Account) -> InsertOutcome {
        let result = sqlx::query(
            "INSERT INTO accounts (id, name, password, email, country) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.password)
        .bind(&account.email)
        .bind(&account.country)
        .execute(&mut self.conn)
        .await;

        match result {
            Ok(_) => InsertOutcome::Inserted,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                InsertOutcome::DuplicateSkipped
            }
            Err(e) => InsertOutcome::Failed(e.to_string()),
        }
    }
}
