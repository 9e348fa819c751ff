use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[r"
CREATE TABLE IF NOT EXISTS notifications (
    id            UUID PRIMARY KEY,
    recipient_id  UUID        NOT NULL,
    type          TEXT        NOT NULL,
    title         TEXT        NOT NULL,
    message       TEXT        NOT NULL,
    related_type  TEXT,
    related_id    UUID,
    is_read       BOOLEAN     NOT NULL DEFAULT FALSE,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT notifications_related_pair
        CHECK (related_id IS NULL OR related_type IS NOT NULL)
)"];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS notifications_recipient_created_idx \
     ON notifications (recipient_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS notifications_recipient_unread_idx \
     ON notifications (recipient_id) WHERE is_read = FALSE",
];

const STAGES: &[(Stage, &[&str])] = &[(Stage::Schema, SCHEMA), (Stage::Indexes, INDEXES)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Schema,
    Indexes,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Schema => "schema",
            Stage::Indexes => "indexes",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database error during {stage} bootstrap: {source}")]
    Sql {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Creates the notification table and its indexes if they are missing. Each stage runs in its own
/// transaction; re-running against an initialized database is a no-op.
pub async fn run(pool: &PgPool) -> Result<(), BootstrapError> {
    info!("running database bootstrap");

    for (stage, statements) in STAGES {
        let sql_error = |source| BootstrapError::Sql {
            stage: stage.label(),
            source,
        };

        let mut transaction = pool.begin().await.map_err(sql_error)?;
        for statement in *statements {
            debug!(stage = %stage, "executing bootstrap statement");
            sqlx::query(statement)
                .execute(&mut *transaction)
                .await
                .map_err(sql_error)?;
        }
        transaction.commit().await.map_err(sql_error)?;
        info!(stage = %stage, count = statements.len(), "bootstrap stage applied");
    }

    Ok(())
}

/// Simple liveness check used during startup.
pub async fn ensure_liveness(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Readiness probe: the database answers and the notification table exists.
pub async fn ensure_readiness(pool: &PgPool) -> Result<(), sqlx::Error> {
    let present: bool =
        sqlx::query_scalar("SELECT to_regclass('public.notifications') IS NOT NULL")
            .fetch_one(pool)
            .await?;

    if present {
        Ok(())
    } else {
        Err(sqlx::Error::RowNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_runs_before_indexes() {
        let order: Vec<Stage> = STAGES.iter().map(|(stage, _)| *stage).collect();
        assert_eq!(order, vec![Stage::Schema, Stage::Indexes]);
    }

    #[test]
    fn statements_are_idempotent() {
        for (_, statements) in STAGES {
            for statement in *statements {
                assert!(
                    statement.contains("IF NOT EXISTS"),
                    "bootstrap statement must be re-runnable: {statement}"
                );
            }
        }
    }

    #[test]
    fn unread_index_is_partial() {
        assert!(INDEXES.iter().any(|sql| sql.contains("WHERE is_read = FALSE")));
    }
}
