//! RelationalAdapter — sqlx/Postgres
//!
//! The teacher carries no SQL crate (its persistence is file/vector
//! backed); `sqlx` is pack-enriched from the corpus's standard relational
//! stack (see the `extraction`/`server` packages in the pack, and
//! `coheara`'s `rusqlite` equivalent for the single-file case). Parameters
//! are always bound; identifier interpolation — needed for the transposed
//! wide tables — is restricted to `adapters::is_safe_identifier` and
//! applied before any SQL string is composed.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row as SqlxRow};
use std::collections::HashMap;

/// A single result row as a name → text-value mapping. Handlers read
/// columns by name and parse them to the type they expect, so the adapter
/// need not know the table shape in advance (transposed tables have a
/// different column per member id).
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub columns: HashMap<String, Option<String>>,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns.get(name).and_then(|v| v.as_deref())
    }
}

#[async_trait]
pub trait RelationalAdapter: Send + Sync {
    /// Every query handlers issue binds only string parameters (member ids,
    /// dobs, service names, and — after `adapters::is_safe_identifier`
    /// validation — column identifiers folded into `sql` itself). This
    /// keeps the trait object-safe without a generic `Encode` bound.
    async fn query_with_strings(&self, sql: &str, params: &[String]) -> CoreResult<Vec<Row>>;

    async fn is_initialized(&self) -> bool;
}

pub struct PgRelationalAdapter {
    pool: PgPool,
}

impl PgRelationalAdapter {
    pub async fn connect(database_url: &str) -> CoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_from_pg(row: &sqlx::postgres::PgRow) -> Row {
        use sqlx::Column;
        let mut columns = HashMap::new();
        for col in row.columns() {
            let name = col.name().to_string();
            let value: Option<String> = row.try_get(col.ordinal()).unwrap_or(None);
            columns.insert(name, value);
        }
        Row { columns }
    }
}

#[async_trait]
impl RelationalAdapter for PgRelationalAdapter {
    async fn query_with_strings(&self, sql: &str, params: &[String]) -> CoreResult<Vec<Row>> {
        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(p);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(rows.iter().map(Self::row_from_pg).collect())
    }

    async fn is_initialized(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
