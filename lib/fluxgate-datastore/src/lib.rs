//! InfluxDB v2 datastore for polled device metrics.
//!
//! [`MetricWriter`] takes a measurement for a device, along with its tags and fields, and writes it as a single point.
//! Along the way, measurements, tags and fields are filtered through operator-configured allow-lists, and field values
//! are coerced so that a field's type stays stable across writes. Write failures are logged and never surface to the
//! poller.
#![deny(warnings)]
#![deny(missing_docs)]

mod allowlist;
pub use self::allowlist::{AllowList, Matching};

pub mod coerce;
pub use self::coerce::RawFieldValue;

mod config;
pub use self::config::{is_enabled, InfluxDbV2Configuration};

mod device;
pub use self::device::{Device, DeviceContext};

mod telemetry;
pub use self::telemetry::{MetricsWriteStatistics, WriteStatistics};

mod writer;
pub use self::writer::{
    Datastore, Fields, MetricWriter, PutOutcome, SkipReason, Tags, BLANK_TAG_VALUE, HOSTNAME_TAG,
};
