use crate::domain::company::Company;
use anyhow::Context;

/// Read-only name → code resolution.
#[async_trait::async_trait]
pub trait CompanyLookup: Send + Sync {
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Company>>;
}

#[derive(Debug, Clone)]
pub struct PgCompanyLookup {
    pool: sqlx::PgPool,
}

impl PgCompanyLookup {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CompanyLookup for PgCompanyLookup {
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Company>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT name, code \
             FROM krx_listed_companies \
             WHERE name = $1 \
             ORDER BY id ASC \
             LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("select krx_listed_companies failed (name={name})"))?;

        Ok(row.map(|(name, code)| Company { name, code }))
    }
}

/// Inserts or renames companies keyed by code, in one transaction.
pub async fn upsert_companies(pool: &sqlx::PgPool, companies: &[Company]) -> anyhow::Result<u64> {
    anyhow::ensure!(!companies.is_empty(), "companies must be non-empty");

    let chunk_size: usize = std::env::var("COMPANIES_UPSERT_BATCH")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(500);
    anyhow::ensure!(chunk_size >= 1, "COMPANIES_UPSERT_BATCH must be >= 1");

    let mut tx = pool.begin().await.context("begin transaction failed")?;
    let mut affected: u64 = 0;

    for (batch_idx, chunk) in companies.chunks(chunk_size).enumerate() {
        let mut qb = sqlx::QueryBuilder::new("INSERT INTO krx_listed_companies (name, code) ");
        qb.push_values(chunk, |mut b, company| {
            b.push_bind(company.name.trim()).push_bind(company.code.trim());
        });
        qb.push(
            " ON CONFLICT (code) DO UPDATE \
               SET name = EXCLUDED.name, updated_at = now() \
               WHERE krx_listed_companies.name IS DISTINCT FROM EXCLUDED.name",
        );

        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("batch upsert krx_listed_companies failed")?;
        affected += res.rows_affected();

        tracing::debug!(
            batch_idx,
            batch_size = chunk.len(),
            "krx_listed_companies batch upsert"
        );
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(affected)
}
