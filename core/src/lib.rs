//! Client library for the fitness tracking HTTP API.
//!
//! # Overview
//! Thin typed client over the REST contract: data sources, datasets of data
//! points, and workout sessions, plus two convenience composites for
//! recording steps and workouts. Requests carry bearer-token auth; payloads
//! are serde-derived records mirroring the wire JSON.
//!
//! # Design
//! - [`FitnessClient`] is the blocking core: one HTTP round trip per
//!   operation, no caching, no retries, no shared mutable state.
//! - [`AsyncFitnessClient`] wraps it in thread-pool-backed futures, one
//!   independent task per operation.
//! - The network sits behind the [`Transport`] trait so tests can substitute
//!   a fake; [`HttpTransport`] is the production implementation.
//! - Failures are operation-tagged [`Error`]s with a
//!   transport/status/codec taxonomy in [`ErrorKind`].
//!
//! Timestamps are millisecond epochs at the session surface and nanosecond
//! epochs at the dataset surface; [`types::millis_to_nanos`] and
//! [`types::dataset_id`] are the bridging helpers.

pub mod async_client;
pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use async_client::AsyncFitnessClient;
pub use client::FitnessClient;
pub use error::{Error, ErrorKind, Result};
pub use http::{HttpTransport, Method, Transport, DEFAULT_TIMEOUT};
pub use types::{
    dataset_id, millis_to_nanos, Application, DataPoint, DataSource, DataSourceType, DataType,
    DataTypeField, DataValue, Device, DeviceType, FieldFormat, Session,
};
