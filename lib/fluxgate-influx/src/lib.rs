//! A minimal InfluxDB v2 write client.
//!
//! Points are encoded as line protocol and sent to the `/api/v2/write` endpoint with token authentication. There is no
//! batching across calls, no buffering, and no retrying: each call to [`PointWriter::write_points`] is one request.
#![deny(warnings)]
#![deny(missing_docs)]

mod client;
pub use self::client::{InfluxClient, PointWriter};

mod config;
pub use self::config::{ClientConfiguration, Precision, Transport};

mod error;
pub use self::error::{ClientError, WriteError};

pub mod line_protocol;

mod point;
pub use self::point::{FieldValue, Point};
