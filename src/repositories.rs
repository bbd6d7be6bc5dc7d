use crate::{
    db::Database,
    domain::GenerationRepository,
    errors::RepoError,
    models::Generation,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{self, info};

/// The name of the table holding generation records.
pub const GENERATIONS_TABLE: &str = "banita";

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS banita (
        id SERIAL PRIMARY KEY,
        prompt TEXT NOT NULL,
        image_url TEXT NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )";

const INSERT_SQL: &str = "INSERT INTO banita (prompt, image_url) VALUES ($1, $2) \
     RETURNING id, prompt, image_url, created_at";

const LIST_SQL: &str = "SELECT id, prompt, image_url, created_at FROM banita \
     ORDER BY created_at ASC, id ASC";

#[derive(Clone)]
pub struct PostgresGenerationRepository {
    db: Database,
}

impl PostgresGenerationRepository {
    pub fn new(db: Database) -> Self {
        info!(table_name = GENERATIONS_TABLE, "Initializing PostgresGenerationRepository");
        Self { db }
    }
}

#[async_trait]
impl GenerationRepository for PostgresGenerationRepository {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        self.db.query(CREATE_TABLE_SQL, &[]).await?;
        tracing::debug!(table_name = GENERATIONS_TABLE, "Postgres: Table ensured");
        Ok(())
    }

    async fn create(&self, prompt: &str, image_url: &str) -> Result<Generation, RepoError> {
        let rows = self.db.query(INSERT_SQL, &[&prompt, &image_url]).await?;
        let row = rows
            .first()
            .context("Postgres: INSERT ... RETURNING produced no row")?;
        let generation = row_to_generation(row)?;

        tracing::debug!(generation_id = generation.id, table_name = GENERATIONS_TABLE, "Postgres: Generation stored");
        Ok(generation)
    }

    async fn list_all(&self) -> Result<Vec<Generation>, RepoError> {
        let rows = self.db.query(LIST_SQL, &[]).await?;
        let generations = rows
            .iter()
            .map(row_to_generation)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = generations.len(), "Postgres: Listed generations");
        Ok(generations)
    }
}

fn row_to_generation(row: &Row) -> Result<Generation, RepoError> {
    let id: i32 = row.try_get("id").context("Postgres: Bad 'id' column")?;
    let prompt: String = row.try_get("prompt").context("Postgres: Bad 'prompt' column")?;
    let image_url: String = row.try_get("image_url").context("Postgres: Bad 'image_url' column")?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .context("Postgres: Bad 'created_at' column")?;

    Ok(Generation {
        id,
        prompt,
        image_url,
        created_at,
    })
}

// These need a disposable Postgres: TEST_DATABASE_URL=postgres://... cargo test -- --ignored
#[cfg(test)]
mod tests {
    use super::*;

    fn test_repository() -> anyhow::Result<PostgresGenerationRepository> {
        let url = std::env::var("TEST_DATABASE_URL").context("TEST_DATABASE_URL is not set")?;
        Ok(PostgresGenerationRepository::new(Database::connect(&url)?))
    }

    #[tokio::test]
    #[ignore]
    async fn ensure_schema_is_idempotent() -> anyhow::Result<()> {
        let repo = test_repository()?;
        repo.ensure_schema().await?;
        repo.ensure_schema().await?;

        let rows = repo
            .db
            .query(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = $1",
                &[&GENERATIONS_TABLE],
            )
            .await?;
        let count: i64 = rows[0].get(0);
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    #[ignore]
    async fn inserted_generation_is_listed() -> anyhow::Result<()> {
        let repo = test_repository()?;
        repo.ensure_schema().await?;

        let before = Utc::now();
        let created = repo
            .create("a red fox in snow", "https://blobs.example/generated-1.png")
            .await?;
        let listed = repo.list_all().await?;

        let found = listed
            .iter()
            .find(|g| g.id == created.id)
            .context("inserted row missing from list")?;
        assert_eq!(found.prompt, "a red fox in snow");
        assert_eq!(found.image_url, "https://blobs.example/generated-1.png");
        // Database and test clocks may differ slightly; allow a second of skew.
        assert!(found.created_at >= before - chrono::Duration::seconds(1));

        let ids: Vec<i32> = listed.iter().map(|g| g.id).collect();
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at), "{:?}", ids);
        Ok(())
    }
}
