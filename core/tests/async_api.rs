//! Async client lifecycle against the live mock server.
//!
//! Every operation is its own thread-pool-backed task, so these tests also
//! exercise the fire-many-at-once pattern the blocking suite cannot.

use fitness_core::types::activity_types;
use fitness_core::{AsyncFitnessClient, DataSource};

/// Boot the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test(flavor = "multi_thread")]
async fn full_lifecycle_through_the_async_client() {
    let base = start_server();
    let c = AsyncFitnessClient::new(&base, "integration-test-token");

    let created = c
        .create_data_source("user-1", DataSource::steps())
        .await
        .unwrap();
    let stream_id = created.data_stream_id.unwrap();

    let sources = c.get_data_sources("user-1").await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].data_stream_id.as_deref(), Some(stream_id.as_str()));

    c.record_workout("user-1", "Evening run", activity_types::RUNNING, 0, 1_800_000, 250.0)
        .await
        .unwrap();

    let sessions = c.get_sessions("user-1", None, None).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "Evening run");
    assert!(sessions[0].id.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_step_recordings_share_the_canonical_source() {
    let base = start_server();
    let c = AsyncFitnessClient::new(&base, "integration-test-token");

    // All four race to create the same canonical source; whichever loses the
    // race rides through the 409 and still inserts its own interval.
    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let c = c.clone();
            tokio::spawn(async move {
                c.record_steps("user-1", 100 + i, i * 60_000, (i + 1) * 60_000)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let sources = c.get_data_sources("user-1").await.unwrap();
    assert_eq!(sources.len(), 1, "identity dedup must collapse the races");

    let stream_id = sources[0].data_stream_id.clone().unwrap();
    for i in 0..4i64 {
        let dataset = fitness_core::dataset_id(
            fitness_core::millis_to_nanos(i * 60_000),
            fitness_core::millis_to_nanos((i + 1) * 60_000),
        );
        let points = c
            .get_data_points("user-1", &stream_id, &dataset)
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value[0].int_val, Some(100 + i));
    }
}
