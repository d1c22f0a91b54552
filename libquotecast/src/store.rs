//! Read-only quotation store backed by SQLite

use rand::Rng;
use sqlx::sqlite::SqlitePool;

use crate::config::{expand_path, StoreConfig};
use crate::error::{ConfigError, Result, StorageError};
use crate::types::Quotation;

#[derive(Clone)]
pub struct QuoteStore {
    pool: SqlitePool,
    count_sql: String,
    select_sql: String,
}

impl QuoteStore {
    /// Open the store read-only
    ///
    /// The database file must already exist; quotations are never written.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let table = validate_identifier("store.table", &config.table)?;
        let text = validate_identifier("store.text_column", &config.text_column)?;
        let author = validate_identifier("store.author_column", &config.author_column)?;

        let expanded_path = expand_path(&config.path);
        // Use forward slashes for SQLite URL (works on both Windows and Unix)
        let db_url = format!(
            "sqlite://{}?mode=ro",
            expanded_path.to_string_lossy().replace('\\', "/")
        );

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(StorageError::SqlxError)?;

        tracing::debug!("Opened quotation store {}", expanded_path.display());

        Ok(Self {
            pool,
            count_sql: format!("SELECT COUNT(*) FROM {}", table),
            select_sql: format!(
                "SELECT {}, {} FROM {} LIMIT 1 OFFSET ?",
                text, author, table
            ),
        })
    }

    /// Number of stored quotations
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(&self.count_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::SqlxError)?;

        Ok(count.max(0) as u64)
    }

    /// Pick one quotation uniformly at random
    ///
    /// Returns `None` when the store is empty.
    pub async fn pick_random<R: Rng>(&self, rng: &mut R) -> Result<Option<Quotation>> {
        let count = self.count().await?;
        if count == 0 {
            return Ok(None);
        }

        let offset = rng.gen_range(0..count);
        let row: Option<(String, String)> = sqlx::query_as(&self.select_sql)
            .bind(offset as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::SqlxError)?;

        Ok(row.map(|(text, author)| Quotation { text, author }))
    }
}

/// Accept only plain SQL identifiers so configured names can be spliced into queries
fn validate_identifier<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if !valid {
        return Err(ConfigError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into());
    }

    Ok(value)
}
