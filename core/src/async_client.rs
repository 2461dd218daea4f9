//! Asynchronous front end over the blocking client.
//!
//! # Design
//! Each operation is one independent unit of work: the blocking call runs on
//! tokio's blocking thread pool via `spawn_blocking`, and the returned future
//! resolves when the round trip (or the composite's two/three sequential
//! round trips) completes. Operations share nothing mutable, so callers may
//! issue any number of them concurrently; no ordering is guaranteed across
//! in-flight operations. Dropping the future detaches the already-dispatched
//! request rather than cancelling it on the wire.

use tokio::task;

use crate::client::FitnessClient;
use crate::error::Result;
use crate::types::{DataPoint, DataSource, Session};

/// Async view of a [`FitnessClient`]. Cheap to clone.
#[derive(Clone)]
pub struct AsyncFitnessClient {
    inner: FitnessClient,
}

impl AsyncFitnessClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            inner: FitnessClient::new(base_url, access_token),
        }
    }

    /// Wrap an existing blocking client, keeping its transport.
    pub fn from_blocking(inner: FitnessClient) -> Self {
        Self { inner }
    }

    pub async fn create_data_source(
        &self,
        user_id: &str,
        data_source: DataSource,
    ) -> Result<DataSource> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        run_blocking(move || client.create_data_source(&user_id, &data_source)).await
    }

    pub async fn get_data_sources(&self, user_id: &str) -> Result<Vec<DataSource>> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        run_blocking(move || client.get_data_sources(&user_id)).await
    }

    pub async fn insert_data_points(
        &self,
        user_id: &str,
        data_source_id: &str,
        dataset_id: &str,
        data_points: Vec<DataPoint>,
    ) -> Result<()> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        let data_source_id = data_source_id.to_string();
        let dataset_id = dataset_id.to_string();
        run_blocking(move || {
            client.insert_data_points(&user_id, &data_source_id, &dataset_id, &data_points)
        })
        .await
    }

    pub async fn get_data_points(
        &self,
        user_id: &str,
        data_source_id: &str,
        dataset_id: &str,
    ) -> Result<Vec<DataPoint>> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        let data_source_id = data_source_id.to_string();
        let dataset_id = dataset_id.to_string();
        run_blocking(move || client.get_data_points(&user_id, &data_source_id, &dataset_id)).await
    }

    pub async fn create_session(&self, user_id: &str, session: Session) -> Result<Session> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        run_blocking(move || client.create_session(&user_id, &session)).await
    }

    pub async fn get_sessions(
        &self,
        user_id: &str,
        start_millis: Option<i64>,
        end_millis: Option<i64>,
    ) -> Result<Vec<Session>> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        run_blocking(move || client.get_sessions(&user_id, start_millis, end_millis)).await
    }

    /// Composite: the create and insert run sequentially inside a single
    /// blocking task.
    pub async fn record_steps(
        &self,
        user_id: &str,
        steps: i64,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<()> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        run_blocking(move || client.record_steps(&user_id, steps, start_millis, end_millis)).await
    }

    /// Composite: one to three sequential calls inside a single blocking
    /// task; the first failure aborts the rest.
    pub async fn record_workout(
        &self,
        user_id: &str,
        name: &str,
        activity_type: i32,
        start_millis: i64,
        end_millis: i64,
        calories: f64,
    ) -> Result<()> {
        let client = self.inner.clone();
        let user_id = user_id.to_string();
        let name = name.to_string();
        run_blocking(move || {
            client.record_workout(
                &user_id,
                &name,
                activity_type,
                start_millis,
                end_millis,
                calories,
            )
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(f).await {
        Ok(result) => result,
        // Surface a panicked operation on the awaiting task. spawn_blocking
        // tasks are never aborted by this client, so the only other join
        // failure is runtime shutdown.
        Err(err) => match err.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            Err(err) => panic!("blocking fitness operation did not complete: {err}"),
        },
    }
}
