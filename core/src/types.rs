//! Domain records for the fitness API.
//!
//! # Design
//! These types mirror the wire JSON (camelCase keys) and are defined
//! independently from the mock-server crate; the integration tests catch any
//! schema drift between the two. Records are plain data: nothing here is
//! mutated after being sent, and every round trip goes through a full
//! serialize, transmit, deserialize cycle.
//!
//! Timestamps come in two units and the API is strict about which goes
//! where: data points and dataset ids use nanosecond epochs, sessions use
//! millisecond epochs. `millis_to_nanos` and `dataset_id` are the only two
//! conversions the contract needs.

use serde::{Deserialize, Serialize};

/// Well-known data type names understood by the server.
pub mod data_type_names {
    pub const STEP_COUNT_DELTA: &str = "com.ultimatequack.step_count.delta";
    pub const DISTANCE_DELTA: &str = "com.ultimatequack.distance.delta";
    pub const CALORIES_EXPENDED: &str = "com.ultimatequack.calories.expended";
    pub const HEART_RATE_BPM: &str = "com.ultimatequack.heart_rate.bpm";
    pub const WEIGHT: &str = "com.ultimatequack.weight";
    pub const HEIGHT: &str = "com.ultimatequack.height";
}

/// Numeric activity codes for sessions.
pub mod activity_types {
    pub const UNKNOWN: i32 = 0;
    pub const BIKING: i32 = 1;
    pub const ON_FOOT: i32 = 2;
    pub const STILL: i32 = 3;
    pub const TILTING: i32 = 5;
    pub const WALKING: i32 = 7;
    pub const RUNNING: i32 = 8;
}

/// Convert a millisecond epoch to the nanosecond epoch the dataset endpoints
/// expect.
pub fn millis_to_nanos(millis: i64) -> i64 {
    millis * 1_000_000
}

/// Compose a dataset id from a nanosecond time range.
pub fn dataset_id(start_nanos: i64, end_nanos: i64) -> String {
    format!("{start_nanos}-{end_nanos}")
}

/// A stream of fitness data owned by an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Assigned by the server when omitted from a create request. The
    /// canonical steps/calories sources supply a deterministic id so the
    /// server can deduplicate by identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_stream_id: Option<String>,
    pub data_stream_name: String,
    #[serde(rename = "type")]
    pub source_type: DataSourceType,
    #[serde(default)]
    pub data_type: Vec<DataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
}

impl DataSource {
    /// The canonical derived source for step counts.
    pub fn steps() -> Self {
        Self::canonical(data_type_names::STEP_COUNT_DELTA, "steps", FieldFormat::Integer, "Steps Data Source")
    }

    /// The canonical derived source for expended calories.
    pub fn calories() -> Self {
        Self::canonical(data_type_names::CALORIES_EXPENDED, "calories", FieldFormat::FloatPoint, "Calories Data Source")
    }

    fn canonical(
        data_type_name: &str,
        field_name: &str,
        format: FieldFormat,
        stream_name: &str,
    ) -> Self {
        let application = Application::default_client();
        Self {
            data_stream_id: Some(format!("derived:{data_type_name}:{}", application.package_name)),
            data_stream_name: stream_name.to_string(),
            source_type: DataSourceType::Derived,
            data_type: vec![DataType {
                name: data_type_name.to_string(),
                field: vec![DataTypeField {
                    name: field_name.to_string(),
                    format,
                }],
            }],
            application: Some(application),
            device: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    Raw,
    Derived,
}

/// Shape of the values carried by a stream's data points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    pub name: String,
    #[serde(default)]
    pub field: Vec<DataTypeField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeField {
    pub name: String,
    pub format: FieldFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldFormat {
    Integer,
    FloatPoint,
    String,
}

/// One measurement over a nanosecond time range. Immutable once built;
/// `start_time_nanos <= end_time_nanos` must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub start_time_nanos: i64,
    pub end_time_nanos: i64,
    pub data_type_name: String,
    #[serde(default)]
    pub value: Vec<DataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_data_source_id: Option<String>,
}

impl DataPoint {
    /// A step-count point over a millisecond interval.
    pub fn steps(steps: i64, start_millis: i64, end_millis: i64) -> Self {
        Self {
            start_time_nanos: millis_to_nanos(start_millis),
            end_time_nanos: millis_to_nanos(end_millis),
            data_type_name: data_type_names::STEP_COUNT_DELTA.to_string(),
            value: vec![DataValue::int(steps)],
            origin_data_source_id: None,
        }
    }

    /// An expended-calories point over a millisecond interval.
    pub fn calories(calories: f64, start_millis: i64, end_millis: i64) -> Self {
        Self {
            start_time_nanos: millis_to_nanos(start_millis),
            end_time_nanos: millis_to_nanos(end_millis),
            data_type_name: data_type_names::CALORIES_EXPENDED.to_string(),
            value: vec![DataValue::float(calories)],
            origin_data_source_id: None,
        }
    }
}

/// A single typed value; exactly one arm is expected to be set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_val: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fp_val: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_val: Option<String>,
}

impl DataValue {
    pub fn int(value: i64) -> Self {
        Self {
            int_val: Some(value),
            ..Self::default()
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            fp_val: Some(value),
            ..Self::default()
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_val: Some(value.into()),
            ..Self::default()
        }
    }
}

/// One workout or activity interval, timed in millisecond epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Assigned by the server on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
    /// Stamped by the server on every write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time_millis: Option<i64>,
    pub activity_type: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_time_millis: Option<i64>,
}

impl Session {
    pub fn new(name: &str, activity_type: i32, start_millis: i64, end_millis: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            description: None,
            start_time_millis: start_millis,
            end_time_millis: end_millis,
            modified_time_millis: None,
            activity_type,
            application: Some(Application::default_client()),
            active_time_millis: None,
        }
    }
}

/// The calling application, attached to data sources and sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

impl Application {
    /// The identity this library reports for sources it creates itself.
    pub fn default_client() -> Self {
        Self {
            package_name: "com.ultimatequack.fitness.rust".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            name: Some("Fitness Rust Client".to_string()),
            details_url: None,
        }
    }
}

/// The device a raw source reads from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub uid: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub manufacturer: String,
    pub model: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Phone,
    Watch,
    Tablet,
    Scale,
    #[serde(other)]
    Unknown,
}

// Wire envelopes. List responses wrap their array under a resource-named
// key; inserts wrap the point list the same way.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataSourcesResponse {
    pub data_sources: Vec<DataSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataPointsResponse {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionsResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataPointsRequest<'a> {
    pub data_points: &'a [DataPoint],
}
