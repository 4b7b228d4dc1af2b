use super::DBClient;
use tokio_cron_scheduler::{Job, JobScheduler};

impl DBClient {
    /// Nightly purge of accounts that never exchanged their confirmation
    /// code within the allowed window. Does not block startup.
    pub async fn start_cleanup_task(&self, confirmation_maxage: i64) {
        let sched = JobScheduler::new().await.unwrap();
        let pool = self.pool.clone();

        let job = Job::new_async("0 0 1 * * *", move |uuid, _l| {
            let pool = pool.clone();
            Box::pin(async move {
                tracing::info!("Running stale signup cleanup job {:?}", uuid);

                let result = sqlx::query(
                    "DELETE FROM users
                     WHERE is_active = FALSE
                       AND created_at < NOW() - make_interval(secs => $1)",
                )
                .bind(confirmation_maxage as f64)
                .execute(&pool)
                .await;

                match result {
                    Ok(r) => {
                        tracing::info!(
                            "Cleanup job {:?} finished, deleted {} rows",
                            uuid,
                            r.rows_affected()
                        );
                    }
                    Err(e) => {
                        tracing::error!("Cleanup job {:?} failed: {:?}", uuid, e);
                    }
                }
            })
        })
        .unwrap();

        sched.add(job).await.unwrap();
        sched.start().await.unwrap();
    }
}
