use tracing::{debug, error, warn};

use crate::config::BotConfig;
use crate::db::{Account, AccountStore, InsertOutcome};
use crate::error::Result;

/// Account ids start above this when the table is empty.
pub const ID_FLOOR: i64 = 50_000_000;
pub const NAME_SEPARATOR: char = '^';
/// Visible length limit of an in-game name. The separator is a colour marker
/// and does not count.
pub const ACCOUNT_NAME_MAX_LEN: usize = 16;
pub const FLAVOR_NUMBERS: [u32; 8] = [34, 42, 69, 101, 322, 404, 419, 420];

pub const DEFAULT_EMAIL: &str = "bla@bla.com";
pub const DEFAULT_COUNTRY: &str = "DE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SuffixPolicy {
    /// 0-f, sixteen accounts per basename
    Hex,
    /// A handful of notable numbers plus the powers of two up to 512
    Flavor,
}

impl SuffixPolicy {
    pub fn suffixes(self) -> Vec<String> {
        match self {
            SuffixPolicy::Hex => (0..16u32).map(|i| format!("{:x}", i)).collect(),
            SuffixPolicy::Flavor => FLAVOR_NUMBERS
                .iter()
                .copied()
                .chain((0..10).map(|i| 2u32.pow(i)))
                .map(|n| n.to_string())
                .collect(),
        }
    }

    pub fn max_basename_len(self) -> usize {
        let longest = self
            .suffixes()
            .iter()
            .map(|suffix| suffix.chars().count())
            .max()
            .unwrap_or(0);
        ACCOUNT_NAME_MAX_LEN - longest
    }
}

/// Account names for `basename`, or `None` if it leaves no room for a suffix.
pub fn account_names(basename: &str, policy: SuffixPolicy) -> Option<Vec<String>> {
    if basename.chars().count() > policy.max_basename_len() {
        return None;
    }
    Some(
        policy
            .suffixes()
            .iter()
            .map(|suffix| format!("{}{}{}", basename, NAME_SEPARATOR, suffix))
            .collect(),
    )
}

/// Hands out account ids counting up from the highest id in the table. Nothing
/// is reserved, so two runs against the same table will collide.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    last: i64,
}

impl IdAllocator {
    pub fn starting_after(last: Option<i64>) -> Self {
        Self {
            last: last.unwrap_or(ID_FLOOR),
        }
    }

    pub async fn seed(store: &mut dyn AccountStore) -> Result<Self> {
        let last = store.last_id().await?;
        debug!(?last, "seeding account ids");
        Ok(Self::starting_after(last))
    }

    pub fn next_id(&mut self) -> i64 {
        self.last += 1;
        self.last
    }
}

#[derive(Debug, Clone)]
pub struct AccountDefaults {
    pub email: String,
    pub country: String,
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self {
            email: DEFAULT_EMAIL.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub skipped_basenames: Vec<String>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Inserts every derived account for `bots`. Row failures are counted and the
/// batch keeps going.
pub async fn provision(
    store: &mut dyn AccountStore,
    bots: &[BotConfig],
    policy: SuffixPolicy,
    defaults: &AccountDefaults,
) -> Result<BatchSummary> {
    let mut ids = IdAllocator::seed(store).await?;
    let mut summary = BatchSummary::default();

    for bot in bots {
        let Some(names) = account_names(&bot.basename, policy) else {
            warn!(
                "Name \"{}\" is too long ({} characters max.), skipping name",
                bot.basename,
                policy.max_basename_len()
            );
            summary.skipped_basenames.push(bot.basename.clone());
            continue;
        };

        for name in names {
            let account = Account {
                id: ids.next_id(),
                name,
                password: bot.password.clone(),
                email: defaults.email.clone(),
                country: defaults.country.clone(),
            };
            match store.insert(&account).await {
                InsertOutcome::Inserted => {
                    debug!(id = account.id, name = %account.name, "added account");
                    summary.inserted += 1;
                }
                InsertOutcome::DuplicateSkipped => {
                    debug!(name = %account.name, "account already exists");
                    summary.duplicates += 1;
                }
                InsertOutcome::Failed(reason) => {
                    error!(name = %account.name, "{}", reason);
                    summary.failed += 1;
                }
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    fn bot(basename: &str) -> BotConfig {
        BotConfig {
            basename: basename.to_string(),
            password: "secret".to_string(),
        }
    }

    fn visible_len(name: &str) -> usize {
        name.chars().filter(|c| *c != NAME_SEPARATOR).count()
    }

    #[test]
    fn test_hex_names() {
        let names = account_names("Alpha", SuffixPolicy::Hex).unwrap();
        assert_eq!(names.len(), 16);
        assert_eq!(names[0], "Alpha^0");
        assert_eq!(names[10], "Alpha^a");
        assert_eq!(names[15], "Alpha^f");
    }

    #[test]
    fn test_flavor_names() {
        let names = account_names("Alpha", SuffixPolicy::Flavor).unwrap();
        assert_eq!(names.len(), 18);
        assert_eq!(names[0], "Alpha^34");
        assert_eq!(names[8], "Alpha^1");
        assert_eq!(names[17], "Alpha^512");
    }

    #[test]
    fn test_max_basename_len() {
        assert_eq!(SuffixPolicy::Hex.max_basename_len(), 15);
        assert_eq!(SuffixPolicy::Flavor.max_basename_len(), 13);
    }

    #[test]
    fn test_names_fit_limit() {
        for policy in [SuffixPolicy::Hex, SuffixPolicy::Flavor] {
            for len in 1..=policy.max_basename_len() {
                let basename = "x".repeat(len);
                for name in account_names(&basename, policy).unwrap() {
                    assert!(visible_len(&name) <= ACCOUNT_NAME_MAX_LEN, "{name}");
                    let (head, suffix) = name.split_once(NAME_SEPARATOR).unwrap();
                    assert_eq!(head, basename);
                    assert!(policy.suffixes().contains(&suffix.to_string()));
                }
            }
        }
    }

    #[test]
    fn test_long_basenames_rejected() {
        assert!(account_names(&"x".repeat(16), SuffixPolicy::Hex).is_none());
        assert!(account_names(&"x".repeat(20), SuffixPolicy::Hex).is_none());
        assert!(account_names(&"x".repeat(14), SuffixPolicy::Flavor).is_none());
        assert!(account_names(&"x".repeat(15), SuffixPolicy::Hex).is_some());
    }

    #[test]
    fn test_allocator_from_empty_table() {
        let mut ids = IdAllocator::starting_after(None);
        let allocated: Vec<i64> = (0..5).map(|_| ids.next_id()).collect();
        assert_eq!(
            allocated,
            [50000001, 50000002, 50000003, 50000004, 50000005]
        );
    }

    #[tokio::test]
    async fn test_allocator_seeded_from_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut ids = IdAllocator::seed(&mut store).await.unwrap();
        assert_eq!(ids.next_id(), ID_FLOOR + 1);

        store
            .insert(&Account {
                id: 50000123,
                name: "Alpha^0".to_string(),
                password: "secret".to_string(),
                email: DEFAULT_EMAIL.to_string(),
                country: DEFAULT_COUNTRY.to_string(),
            })
            .await;
        let mut ids = IdAllocator::seed(&mut store).await.unwrap();
        assert_eq!(ids.next_id(), 50000124);
    }

    #[tokio::test]
    async fn test_provision_batch() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let bots = [bot("Alpha"), bot("ThisNameIsTooLong"), bot("Bravo")];

        let summary = provision(&mut store, &bots, SuffixPolicy::Hex, &AccountDefaults::default())
            .await
            .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.inserted, 32);
        assert_eq!(summary.duplicates, 0);
        assert_eq!(summary.skipped_basenames, ["ThisNameIsTooLong"]);

        let (min, max): (i64, i64) = store
            .connection()
            .query_row("SELECT MIN(id), MAX(id) FROM accounts", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(min, ID_FLOOR + 1);
        assert_eq!(max, ID_FLOOR + 32);
    }

    #[tokio::test]
    async fn test_provision_rerun_skips_duplicates() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let bots = [bot("Alpha")];
        let defaults = AccountDefaults::default();

        provision(&mut store, &bots, SuffixPolicy::Hex, &defaults)
            .await
            .unwrap();
        let summary = provision(&mut store, &bots, SuffixPolicy::Hex, &defaults)
            .await
            .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.duplicates, 16);
    }

    struct FlakyStore {
        inner: SqliteStore,
        calls: usize,
    }

    #[async_trait::async_trait]
    impl AccountStore for FlakyStore {
        async fn last_id(&mut self) -> Result<Option<i64>> {
            self.inner.last_id().await
        }

        async fn insert(&mut self, account: &Account) -> InsertOutcome {
            self.calls += 1;
            if self.calls == 3 {
                return InsertOutcome::Failed("connection reset".to_string());
            }
            self.inner.insert(account).await
        }
    }

    #[tokio::test]
    async fn test_provision_continues_after_failure() {
        let mut store = FlakyStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            calls: 0,
        };

        let summary = provision(
            &mut store,
            &[bot("Alpha")],
            SuffixPolicy::Hex,
            &AccountDefaults::default(),
        )
        .await
        .unwrap();

        assert!(!summary.is_success());
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inserted, 15);
    }
}
