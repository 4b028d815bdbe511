//! DDL execution against a routed tenant pool
//!
//! A [`Session`] is one orchestrator call: it carries the operation name and
//! target used in logs and errors, and a deadline that bounds every catalog
//! read and the DDL batch itself.
//!
//! Batches run sequentially inside one transaction (PostgreSQL DDL is
//! transactional), so a failing statement leaves the tenant database exactly
//! as it was. When the deadline fires the outcome is unknown: the commit may
//! have reached the server. [`Session::settle`] then re-reads the catalog to
//! decide.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::Instant;
use uuid::Uuid;

use super::error::SchemaError;

/// Budget for the post-timeout catalog check
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of running a DDL batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Committed and acknowledged
    Applied,
    /// Deadline passed before the acknowledgment arrived
    Unknown,
}

pub struct Session {
    pool: PgPool,
    project_id: Uuid,
    operation: &'static str,
    target: String,
    timeout: Duration,
    deadline: Instant,
}

impl Session {
    pub fn new(
        pool: PgPool,
        project_id: Uuid,
        operation: &'static str,
        target: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            pool,
            project_id,
            operation,
            target: target.into(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn timed_out(&self) -> SchemaError {
        SchemaError::Timeout {
            operation: self.operation,
            target: self.target.clone(),
            timeout_secs: self.timeout.as_secs(),
        }
    }

    /// Run a catalog read within the session deadline
    pub async fn read<T, F>(&self, query: F) -> Result<T, SchemaError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout_at(self.deadline, query).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(
                    project_id = %self.project_id,
                    operation = self.operation,
                    target = %self.target,
                    error = %e,
                    "Catalog read failed"
                );
                Err(SchemaError::execution(self.operation, self.target.clone(), e))
            }
            Err(_) => Err(self.timed_out()),
        }
    }

    /// Execute statements in order inside one transaction
    pub async fn apply(&self, statements: &[String]) -> Result<Outcome, SchemaError> {
        match tokio::time::timeout_at(self.deadline, self.run_batch(statements)).await {
            Ok(Ok(())) => Ok(Outcome::Applied),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    project_id = %self.project_id,
                    operation = self.operation,
                    target = %self.target,
                    timeout_secs = self.timeout.as_secs(),
                    "DDL deadline passed, outcome unknown"
                );
                Ok(Outcome::Unknown)
            }
        }
    }

    async fn run_batch(&self, statements: &[String]) -> Result<(), SchemaError> {
        let fail = |e| SchemaError::execution(self.operation, self.target.clone(), e);

        let mut tx = self.pool.begin().await.map_err(fail)?;

        for (i, sql) in statements.iter().enumerate() {
            tracing::debug!(
                project_id = %self.project_id,
                operation = self.operation,
                target = %self.target,
                step = i + 1,
                of = statements.len(),
                sql = %sql,
                "Executing DDL"
            );
            if let Err(e) = sqlx::raw_sql(sql).execute(&mut *tx).await {
                tracing::warn!(
                    project_id = %self.project_id,
                    operation = self.operation,
                    target = %self.target,
                    step = i + 1,
                    error = %e,
                    "DDL failed, rolling back"
                );
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "Rollback failed");
                }
                return Err(fail(e));
            }
        }

        tx.commit().await.map_err(fail)?;
        tracing::debug!(
            project_id = %self.project_id,
            operation = self.operation,
            target = %self.target,
            statements = statements.len(),
            "DDL committed"
        );
        Ok(())
    }

    /// Resolve an [`Outcome`] against the expected post-condition
    ///
    /// `Applied` passes straight through. For `Unknown`, `holds` is evaluated
    /// with a fresh budget: if the change is visible the call succeeds and the
    /// deadline is extended so the caller can re-introspect, otherwise it
    /// fails with a timeout.
    pub async fn settle<F>(&mut self, outcome: Outcome, holds: F) -> Result<(), SchemaError>
    where
        F: Future<Output = Result<bool, sqlx::Error>>,
    {
        if outcome == Outcome::Applied {
            return Ok(());
        }

        match tokio::time::timeout(SETTLE_TIMEOUT, holds).await {
            Ok(Ok(true)) => {
                tracing::warn!(
                    project_id = %self.project_id,
                    operation = self.operation,
                    target = %self.target,
                    "DDL committed after deadline"
                );
                self.deadline = Instant::now() + SETTLE_TIMEOUT;
                Ok(())
            }
            Ok(Ok(false)) => Err(self.timed_out()),
            Ok(Err(e)) => {
                tracing::error!(
                    project_id = %self.project_id,
                    operation = self.operation,
                    target = %self.target,
                    error = %e,
                    "Could not verify DDL outcome after deadline"
                );
                Err(self.timed_out())
            }
            Err(_) => Err(self.timed_out()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn session(timeout: Duration) -> Session {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://basalt@127.0.0.1:1/tenant_x")
            .unwrap();
        Session::new(pool, Uuid::nil(), "create_table", "public.users", timeout)
    }

    #[tokio::test]
    async fn test_read_maps_errors_to_execution() {
        let session = session(Duration::from_secs(5));
        let err = session
            .read(async { Err::<bool, _>(sqlx::Error::RowNotFound) })
            .await
            .unwrap_err();
        assert_eq!(err.key(), "database.error.execution");
        assert!(err.to_string().starts_with("create_table on public.users"));
    }

    #[tokio::test]
    async fn test_read_respects_deadline() {
        let session = session(Duration::from_millis(10));
        let err = session
            .read(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(true)
            })
            .await
            .unwrap_err();
        assert_eq!(err.key(), "database.error.timeout");
    }

    #[tokio::test]
    async fn test_settle_applied_skips_check() {
        let mut session = session(Duration::from_secs(5));
        session
            .settle(Outcome::Applied, async { Err(sqlx::Error::RowNotFound) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_settle_unknown_uses_post_condition() {
        let mut session = session(Duration::from_secs(1));
        session
            .settle(Outcome::Unknown, async { Ok(true) })
            .await
            .unwrap();

        let err = session
            .settle(Outcome::Unknown, async { Ok(false) })
            .await
            .unwrap_err();
        assert_eq!(err.key(), "database.error.timeout");

        let err = session
            .settle(Outcome::Unknown, async { Err(sqlx::Error::PoolTimedOut) })
            .await
            .unwrap_err();
        assert_eq!(err.key(), "database.error.timeout");
    }

    #[tokio::test]
    async fn test_apply_reports_unreachable_database() {
        let session = session(Duration::from_secs(5));
        let err = session
            .apply(&["CREATE TABLE \"public\".\"users\" (\"id\" SERIAL)".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.key(), "database.error.execution");
    }
}
