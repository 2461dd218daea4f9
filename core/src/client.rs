//! Blocking client for the fitness API.
//!
//! # Design
//! `FitnessClient` holds a shared transport and no other state; every
//! operation is one serialize → send → deserialize pass, so independent
//! operations can run concurrently without coordination. The two composite
//! operations (`record_steps`, `record_workout`) chain two or three resource
//! calls sequentially and stop at the first failure; effects already
//! committed on the server are not rolled back.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpTransport, Method, Transport};
use crate::types::{
    dataset_id, millis_to_nanos, DataPoint, DataPointsRequest, DataPointsResponse, DataSource,
    DataSourcesResponse, Session, SessionsResponse,
};

const API_ROOT: &str = "/api/fitness/v1";

/// Client for one fitness API server.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct FitnessClient {
    transport: Arc<dyn Transport>,
}

impl FitnessClient {
    /// Client over the default HTTP transport with 10 second timeouts.
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new(base_url, access_token)))
    }

    /// Client over a caller-supplied transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a data source. The returned record carries the
    /// server-populated stream id.
    pub fn create_data_source(&self, user_id: &str, data_source: &DataSource) -> Result<DataSource> {
        const OP: &str = "failed to create data source";
        let path = format!("{API_ROOT}/users/{user_id}/dataSources");
        let body = encode(OP, data_source)?;
        self.request(OP, Method::Post, &path, Some(&body))
    }

    /// List the user's data sources, in the order the server returns them.
    pub fn get_data_sources(&self, user_id: &str) -> Result<Vec<DataSource>> {
        const OP: &str = "failed to get data sources";
        let path = format!("{API_ROOT}/users/{user_id}/dataSources");
        let envelope: DataSourcesResponse = self.request(OP, Method::Get, &path, None)?;
        Ok(envelope.data_sources)
    }

    /// Insert data points into a dataset. Success is any 2xx; the response
    /// body carries nothing of interest.
    pub fn insert_data_points(
        &self,
        user_id: &str,
        data_source_id: &str,
        dataset_id: &str,
        data_points: &[DataPoint],
    ) -> Result<()> {
        const OP: &str = "failed to insert data points";
        let path =
            format!("{API_ROOT}/users/{user_id}/dataSources/{data_source_id}/datasets/{dataset_id}");
        let body = encode(OP, &DataPointsRequest { data_points })?;
        self.transport
            .send(Method::Patch, &path, Some(&body))
            .map_err(|kind| Error::new(OP, kind))?;
        Ok(())
    }

    /// Read a dataset's points back.
    pub fn get_data_points(
        &self,
        user_id: &str,
        data_source_id: &str,
        dataset_id: &str,
    ) -> Result<Vec<DataPoint>> {
        const OP: &str = "failed to get data points";
        let path =
            format!("{API_ROOT}/users/{user_id}/dataSources/{data_source_id}/datasets/{dataset_id}");
        let envelope: DataPointsResponse = self.request(OP, Method::Get, &path, None)?;
        Ok(envelope.data_points)
    }

    /// Create a session. The returned record carries the server-assigned id.
    pub fn create_session(&self, user_id: &str, session: &Session) -> Result<Session> {
        const OP: &str = "failed to create session";
        let path = format!("{API_ROOT}/users/{user_id}/sessions");
        let body = encode(OP, session)?;
        self.request(OP, Method::Post, &path, Some(&body))
    }

    /// List sessions, optionally bounded to a millisecond window. The query
    /// parameters go out in nanoseconds, as the contract requires.
    pub fn get_sessions(
        &self,
        user_id: &str,
        start_millis: Option<i64>,
        end_millis: Option<i64>,
    ) -> Result<Vec<Session>> {
        const OP: &str = "failed to get sessions";
        let mut path = format!("{API_ROOT}/users/{user_id}/sessions");
        let mut params = Vec::new();
        if let Some(start) = start_millis {
            params.push(format!("startTime={}", millis_to_nanos(start)));
        }
        if let Some(end) = end_millis {
            params.push(format!("endTime={}", millis_to_nanos(end)));
        }
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }
        let envelope: SessionsResponse = self.request(OP, Method::Get, &path, None)?;
        Ok(envelope.sessions)
    }

    /// Record a step count over a millisecond interval: re-create the
    /// canonical steps source, then insert one point into the dataset named
    /// by the interval.
    pub fn record_steps(
        &self,
        user_id: &str,
        steps: i64,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<()> {
        let stream_id = self.create_or_reuse_source(user_id, &DataSource::steps())?;
        let points = [DataPoint::steps(steps, start_millis, end_millis)];
        let dataset = dataset_id(millis_to_nanos(start_millis), millis_to_nanos(end_millis));
        self.insert_data_points(user_id, &stream_id, &dataset, &points)
    }

    /// Record a workout session; when `calories > 0` also record the
    /// expended calories as a data point over the same interval.
    pub fn record_workout(
        &self,
        user_id: &str,
        name: &str,
        activity_type: i32,
        start_millis: i64,
        end_millis: i64,
        calories: f64,
    ) -> Result<()> {
        let session = Session::new(name, activity_type, start_millis, end_millis);
        self.create_session(user_id, &session)?;

        if calories > 0.0 {
            let stream_id = self.create_or_reuse_source(user_id, &DataSource::calories())?;
            let points = [DataPoint::calories(calories, start_millis, end_millis)];
            let dataset = dataset_id(millis_to_nanos(start_millis), millis_to_nanos(end_millis));
            self.insert_data_points(user_id, &stream_id, &dataset, &points)?;
        }
        Ok(())
    }

    /// Re-create a canonical source and let the server deduplicate by
    /// identity: a 409 means it already exists under its deterministic
    /// stream id, which is then used as-is. Any other failure propagates.
    fn create_or_reuse_source(&self, user_id: &str, source: &DataSource) -> Result<String> {
        match self.create_data_source(user_id, source) {
            Ok(created) => Ok(created
                .data_stream_id
                .or_else(|| source.data_stream_id.clone())
                .unwrap_or_default()),
            Err(err) if err.status() == Some(409) => {
                // Canonical sources always carry their deterministic id.
                Ok(source.data_stream_id.clone().unwrap_or_default())
            }
            Err(err) => Err(err),
        }
    }

    fn request<T: DeserializeOwned>(
        &self,
        op: &'static str,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<T> {
        let text = self
            .transport
            .send(method, path, body)
            .map_err(|kind| Error::new(op, kind))?;
        serde_json::from_str(&text).map_err(|err| Error::new(op, ErrorKind::Decode(err)))
    }
}

fn encode<B: Serialize>(op: &'static str, body: &B) -> Result<String> {
    serde_json::to_string(body).map_err(|err| Error::new(op, ErrorKind::Encode(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::FakeTransport;
    use crate::types::activity_types;

    fn client(transport: &Arc<FakeTransport>) -> FitnessClient {
        FitnessClient::with_transport(transport.clone())
    }

    fn steps_source_json() -> String {
        serde_json::to_string(&DataSource::steps()).unwrap()
    }

    fn calories_source_json() -> String {
        serde_json::to_string(&DataSource::calories()).unwrap()
    }

    #[test]
    fn create_data_source_posts_the_record() {
        let echo = steps_source_json();
        let transport = FakeTransport::new(vec![Ok(echo.as_str())]);
        let created = client(&transport)
            .create_data_source("user-1", &DataSource::steps())
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].path, "/api/fitness/v1/users/user-1/dataSources");
        let body: serde_json::Value =
            serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["dataStreamName"], "Steps Data Source");
        assert_eq!(body["type"], "derived");
        assert!(created.data_stream_id.is_some());
    }

    #[test]
    fn create_data_source_returns_the_server_assigned_id() {
        let transport = FakeTransport::new(vec![Ok(
            r#"{"dataStreamId":"raw:com.ultimatequack.heart_rate.bpm:com.acme.watch","dataStreamName":"Watch HR","type":"raw","dataType":[]}"#,
        )]);
        let source = DataSource {
            data_stream_id: None,
            data_stream_name: "Watch HR".to_string(),
            source_type: crate::types::DataSourceType::Raw,
            data_type: vec![],
            application: None,
            device: None,
        };
        let created = client(&transport)
            .create_data_source("user-1", &source)
            .unwrap();
        assert_eq!(
            created.data_stream_id.as_deref(),
            Some("raw:com.ultimatequack.heart_rate.bpm:com.acme.watch")
        );
        let body: serde_json::Value =
            serde_json::from_str(transport.calls()[0].body.as_deref().unwrap()).unwrap();
        assert!(body.get("dataStreamId").is_none(), "create body must omit the id");
    }

    #[test]
    fn get_data_sources_unwraps_the_envelope_in_order() {
        let transport = FakeTransport::new(vec![Ok(
            r#"{"dataSources":[
                {"dataStreamId":"b","dataStreamName":"B","type":"raw","dataType":[]},
                {"dataStreamId":"a","dataStreamName":"A","type":"derived","dataType":[]}
            ]}"#,
        )]);
        let sources = client(&transport).get_data_sources("user-1").unwrap();
        let ids: Vec<_> = sources
            .iter()
            .map(|s| s.data_stream_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(transport.calls()[0].method, Method::Get);
    }

    #[test]
    fn insert_data_points_patches_the_dataset_path() {
        let transport = FakeTransport::new(vec![Ok("{}")]);
        let points = [DataPoint::steps(42, 100, 200)];
        client(&transport)
            .insert_data_points("user-1", "src-1", "100000000-200000000", &points)
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].method, Method::Patch);
        assert_eq!(
            calls[0].path,
            "/api/fitness/v1/users/user-1/dataSources/src-1/datasets/100000000-200000000"
        );
        let body: serde_json::Value =
            serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["dataPoints"][0]["value"][0]["intVal"], 42);
        assert_eq!(body["dataPoints"][0]["startTimeNanos"], 100_000_000);
    }

    #[test]
    fn get_data_points_unwraps_the_envelope() {
        let transport = FakeTransport::new(vec![Ok(
            r#"{"dataPoints":[{"startTimeNanos":1,"endTimeNanos":2,"dataTypeName":"com.ultimatequack.step_count.delta","value":[{"intVal":7}]}]}"#,
        )]);
        let points = client(&transport)
            .get_data_points("user-1", "src-1", "1-2")
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value[0].int_val, Some(7));
    }

    #[test]
    fn create_session_returns_the_assigned_id() {
        let transport = FakeTransport::new(vec![Ok(
            r#"{"id":"sess-1","name":"Morning run","startTimeMillis":1000,"endTimeMillis":2000,"activityType":8,"modifiedTimeMillis":5000}"#,
        )]);
        let session = Session::new("Morning run", activity_types::RUNNING, 1000, 2000);
        let created = client(&transport).create_session("user-1", &session).unwrap();
        assert_eq!(created.id.as_deref(), Some("sess-1"));
        assert_eq!(created.modified_time_millis, Some(5000));
        assert_eq!(
            transport.calls()[0].path,
            "/api/fitness/v1/users/user-1/sessions"
        );
    }

    #[test]
    fn get_sessions_without_bounds_sends_no_query() {
        let transport = FakeTransport::new(vec![Ok(r#"{"sessions":[]}"#)]);
        client(&transport).get_sessions("user-1", None, None).unwrap();
        assert_eq!(
            transport.calls()[0].path,
            "/api/fitness/v1/users/user-1/sessions"
        );
    }

    #[test]
    fn get_sessions_bounds_go_out_in_nanos() {
        let transport = FakeTransport::new(vec![
            Ok(r#"{"sessions":[]}"#),
            Ok(r#"{"sessions":[]}"#),
        ]);
        let c = client(&transport);
        c.get_sessions("user-1", Some(1_000), Some(2_000)).unwrap();
        c.get_sessions("user-1", None, Some(2_000)).unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0].path,
            "/api/fitness/v1/users/user-1/sessions?startTime=1000000000&endTime=2000000000"
        );
        assert_eq!(
            calls[1].path,
            "/api/fitness/v1/users/user-1/sessions?endTime=2000000000"
        );
    }

    #[test]
    fn error_statuses_surface_with_status_and_body() {
        let transport = FakeTransport::new(vec![Err(FakeTransport::request_error(
            400,
            r#"{"error":"Missing required fields"}"#,
        ))]);
        let err = client(&transport).get_data_sources("user-1").unwrap_err();
        assert_eq!(err.operation(), "failed to get data sources");
        assert_eq!(err.status(), Some(400));
        match err.kind() {
            ErrorKind::Request { body, .. } => {
                assert_eq!(body, r#"{"error":"Missing required fields"}"#);
            }
            other => panic!("expected Request kind, got {other:?}"),
        }
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let transport = FakeTransport::new(vec![Ok("not json")]);
        let err = client(&transport)
            .create_data_source("user-1", &DataSource::steps())
            .unwrap_err();
        assert_eq!(err.operation(), "failed to create data source");
        assert!(matches!(err.kind(), ErrorKind::Decode(_)));
    }

    #[test]
    fn record_steps_creates_the_source_then_inserts() {
        let echo = steps_source_json();
        let transport = FakeTransport::new(vec![Ok(echo.as_str()), Ok("{}")]);
        client(&transport)
            .record_steps("user-1", 1200, 1_000, 61_000)
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[1].method, Method::Patch);
        assert_eq!(
            calls[1].path,
            format!(
                "/api/fitness/v1/users/user-1/dataSources/{}/datasets/1000000000-61000000000",
                DataSource::steps().data_stream_id.unwrap()
            )
        );
        let body: serde_json::Value =
            serde_json::from_str(calls[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["dataPoints"][0]["value"][0]["intVal"], 1200);
    }

    #[test]
    fn record_steps_treats_conflict_as_reuse() {
        let transport = FakeTransport::new(vec![
            Err(FakeTransport::request_error(
                409,
                r#"{"error":"data source already exists"}"#,
            )),
            Ok("{}"),
        ]);
        client(&transport)
            .record_steps("user-1", 500, 1_000, 2_000)
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2, "conflict must not abort the insert");
        assert!(calls[1]
            .path
            .contains(&DataSource::steps().data_stream_id.unwrap()));
    }

    #[test]
    fn record_steps_aborts_on_any_other_create_failure() {
        let transport =
            FakeTransport::new(vec![Err(FakeTransport::request_error(400, "bad payload"))]);
        let err = client(&transport)
            .record_steps("user-1", 500, 1_000, 2_000)
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(transport.calls().len(), 1, "first failure wins");
    }

    #[test]
    fn record_workout_without_calories_is_a_single_write() {
        let transport = FakeTransport::new(vec![Ok(
            r#"{"id":"sess-1","name":"Yoga","startTimeMillis":1,"endTimeMillis":2,"activityType":0}"#,
        )]);
        client(&transport)
            .record_workout("user-1", "Yoga", activity_types::UNKNOWN, 1, 2, 0.0)
            .unwrap();
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(
            transport.calls()[0].path,
            "/api/fitness/v1/users/user-1/sessions"
        );
    }

    #[test]
    fn record_workout_with_calories_is_three_writes() {
        let echo = calories_source_json();
        let transport = FakeTransport::new(vec![
            Ok(r#"{"id":"sess-1","name":"Run","startTimeMillis":1000,"endTimeMillis":2000,"activityType":8}"#),
            Ok(echo.as_str()),
            Ok("{}"),
        ]);
        client(&transport)
            .record_workout("user-1", "Run", activity_types::RUNNING, 1_000, 2_000, 250.5)
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].path, "/api/fitness/v1/users/user-1/sessions");
        assert_eq!(calls[1].path, "/api/fitness/v1/users/user-1/dataSources");
        assert_eq!(calls[2].method, Method::Patch);
        let body: serde_json::Value =
            serde_json::from_str(calls[2].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["dataPoints"][0]["value"][0]["fpVal"], 250.5);
    }

    #[test]
    fn record_workout_aborts_when_the_session_fails() {
        let transport =
            FakeTransport::new(vec![Err(FakeTransport::request_error(401, "Unauthorized"))]);
        let err = client(&transport)
            .record_workout("user-1", "Run", activity_types::RUNNING, 1, 2, 100.0)
            .unwrap_err();
        assert_eq!(err.operation(), "failed to create session");
        assert_eq!(transport.calls().len(), 1, "calorie steps must not run");
    }
}
