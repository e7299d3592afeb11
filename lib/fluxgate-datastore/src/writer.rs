use std::{
    collections::BTreeMap,
    slice,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use async_trait::async_trait;
use fluxgate_config::{GenericConfiguration, GenericError};
use fluxgate_influx::{InfluxClient, Point, PointWriter, WriteError};
use tracing::{debug, error, info, warn};

use crate::{
    allowlist::AllowList,
    coerce::{force_type, RawFieldValue},
    config::{self, InfluxDbV2Configuration},
    device::DeviceContext,
    telemetry::{MetricsWriteStatistics, WriteStatistics},
};

/// Tags handed to a datastore.
pub type Tags = BTreeMap<String, String>;

/// Fields handed to a datastore.
pub type Fields = BTreeMap<String, RawFieldValue>;

/// Tag always added to written points, holding the device's host name.
pub const HOSTNAME_TAG: &str = "hostname";

/// Stand-in for empty or falsy tag values.
pub const BLANK_TAG_VALUE: &str = "_blank_";

const RESERVED_FIELD: &str = "time";
const RENAMED_RESERVED_FIELD: &str = "rtime";

/// A store backend for polled device metrics.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Returns the display name of the backend.
    fn name(&self) -> &'static str;

    /// Returns `true` if the backend is enabled in the given configuration.
    ///
    /// Callable without an instance, so that disabled backends are never constructed.
    fn is_enabled(config: &GenericConfiguration) -> bool
    where
        Self: Sized;

    /// Returns `true` if the backend expects RRD-style tags to be folded into the tag set before `put` is called.
    fn wants_rrd_tags(&self) -> bool;

    /// Stores a measurement for the given device.
    ///
    /// Never fails: problems are logged and the measurement is dropped.
    async fn put(&self, device: &dyn DeviceContext, measurement: &str, tags: &Tags, fields: &Fields);
}

/// Why a measurement was not written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The measurement name is not in the measurement allow-list.
    MeasurementNotAllowed,

    /// No fields were left after filtering and coercion.
    NoFields,
}

/// Result of a successful pass through [`MetricWriter::try_put`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PutOutcome {
    /// The point was written.
    Written {
        /// Time from the start of processing until the write completed.
        elapsed: Duration,
    },

    /// Nothing was written.
    Skipped(SkipReason),
}

/// Writes polled device metrics to InfluxDB v2.
///
/// Measurements, tags and fields are first filtered through the configured allow-lists, field values are coerced (see
/// [`force_type`]), and the result is written as a single point. Each call is independent, and the underlying client is
/// shared across calls.
pub struct MetricWriter {
    writer: Arc<dyn PointWriter>,
    statistics: Arc<dyn WriteStatistics>,
    measurements: AllowList,
    tags: AllowList,
    fields: AllowList,
}

impl MetricWriter {
    /// Creates a new `MetricWriter` from the given configuration.
    ///
    /// No connection is made until the first write. Write statistics are reported through the `metrics` facade.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, or the client could not be built, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let config =
            InfluxDbV2Configuration::from_configuration(config).context("Invalid InfluxDB v2 configuration.")?;
        let client = InfluxClient::from_configuration(config.client()).context("Failed to build InfluxDB client.")?;

        debug!(
            url = %client.write_url(),
            bucket = %config.client().bucket,
            organization = %config.client().organization,
            measurements = config.measurements().len(),
            tags = config.tags().len(),
            fields = config.fields().len(),
            "Created InfluxDB v2 datastore."
        );

        Ok(Self::with_writer(&config, client))
    }

    /// Creates a new `MetricWriter` that writes through `writer`, using the allow-lists of `config`.
    ///
    /// The client settings of `config` are not used.
    pub fn with_writer<W>(config: &InfluxDbV2Configuration, writer: W) -> Self
    where
        W: PointWriter + 'static,
    {
        Self {
            writer: Arc::new(writer),
            statistics: Arc::new(MetricsWriteStatistics::new()),
            measurements: config.measurements().clone(),
            tags: config.tags().clone(),
            fields: config.fields().clone(),
        }
    }

    /// Sets the sink that write statistics are reported to.
    pub fn with_statistics<S>(mut self, statistics: S) -> Self
    where
        S: WriteStatistics + 'static,
    {
        self.statistics = Arc::new(statistics);
        self
    }

    /// Builds the point that would be written for the given measurement.
    ///
    /// Applies tag and field filtering, `_blank_` substitution for empty or falsy tag values, the `time` to `rtime` rename, and
    /// field coercion. The measurement allow-list is not consulted. Returns `None` if no fields are left.
    pub fn build_point(
        &self, device: &dyn DeviceContext, measurement: &str, tags: &Tags, fields: &Fields,
    ) -> Option<Point> {
        let mut point = Point::new(measurement);

        for (key, value) in tags {
            if key == HOSTNAME_TAG {
                debug!(measurement, value = %value, "Ignoring supplied hostname tag in favor of the device host name.");
                continue;
            }

            if !self.tags.allows(key) {
                debug!(measurement, tag = %key, "Tag not in allow-list. Skipping.");
                continue;
            }

            point.insert_tag(key.as_str(), tag_value_or_blank(value));
        }
        point.insert_tag(HOSTNAME_TAG, tag_value_or_blank(device.hostname()));

        for (key, value) in fields {
            if !self.fields.allows(key) {
                debug!(measurement, field = %key, "Field not in allow-list. Skipping.");
                continue;
            }

            let key = if key == RESERVED_FIELD {
                RENAMED_RESERVED_FIELD
            } else {
                key.as_str()
            };

            match force_type(value) {
                Some(value) => point.insert_field(key, value),
                None => debug!(measurement, field = %key, "Field has no value. Skipping."),
            }
        }

        if point.has_no_fields() {
            None
        } else {
            Some(point)
        }
    }

    /// Filters, coerces and writes a measurement, reporting the outcome.
    ///
    /// # Errors
    ///
    /// If the write fails, an error is returned. Nothing is retried.
    pub async fn try_put(
        &self, device: &dyn DeviceContext, measurement: &str, tags: &Tags, fields: &Fields,
    ) -> Result<PutOutcome, WriteError> {
        if !self.measurements.allows(measurement) {
            debug!(measurement, "Measurement not in allow-list. Skipping.");
            return Ok(PutOutcome::Skipped(SkipReason::MeasurementNotAllowed));
        }

        let start = Instant::now();

        let point = match self.build_point(device, measurement, tags, fields) {
            Some(point) => point,
            None => {
                warn!(measurement, fields = ?fields, "No fields left to write after filtering. Skipping.");
                return Ok(PutOutcome::Skipped(SkipReason::NoFields));
            }
        };

        info!(measurement, tags = ?tags, fields = ?fields, "Writing measurement.");

        match self.writer.write_points(slice::from_ref(&point)).await {
            Ok(()) => {
                let elapsed = start.elapsed();
                self.statistics.record_write(elapsed);
                Ok(PutOutcome::Written { elapsed })
            }
            Err(e) => {
                self.statistics.record_failure();
                Err(e)
            }
        }
    }
}

/// Empty values and `"0"` can't be stored as tag values, and are replaced by [`BLANK_TAG_VALUE`].
fn tag_value_or_blank(value: &str) -> &str {
    if value.is_empty() || value == "0" {
        BLANK_TAG_VALUE
    } else {
        value
    }
}

#[async_trait]
impl Datastore for MetricWriter {
    fn name(&self) -> &'static str {
        "InfluxDBv2"
    }

    fn is_enabled(config: &GenericConfiguration) -> bool {
        config::is_enabled(config)
    }

    fn wants_rrd_tags(&self) -> bool {
        false
    }

    async fn put(&self, device: &dyn DeviceContext, measurement: &str, tags: &Tags, fields: &Fields) {
        if let Err(e) = self.try_put(device, measurement, tags, fields).await {
            error!(measurement, error = %e, "Failed to write measurement to InfluxDB.");
            debug!(measurement, error = ?e, "Write failure details.");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fluxgate_config::ConfigurationLoader;
    use fluxgate_influx::FieldValue;

    use super::*;
    use crate::device::Device;

    #[derive(Clone, Default)]
    struct CapturingWriter {
        points: Arc<Mutex<Vec<Point>>>,
        fail: bool,
    }

    impl CapturingWriter {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn points(&self) -> Vec<Point> {
            self.points.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PointWriter for CapturingWriter {
        async fn write_points(&self, points: &[Point]) -> Result<(), WriteError> {
            self.points.lock().unwrap().extend_from_slice(points);
            if self.fail {
                Err(WriteError::Rejected {
                    status: 503,
                    body: "service unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingStatistics {
        writes: Arc<Mutex<Vec<Duration>>>,
        failures: Arc<Mutex<usize>>,
    }

    impl RecordingStatistics {
        fn writes(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        fn failures(&self) -> usize {
            *self.failures.lock().unwrap()
        }
    }

    impl WriteStatistics for RecordingStatistics {
        fn record_write(&self, elapsed: Duration) {
            self.writes.lock().unwrap().push(elapsed);
        }

        fn record_failure(&self) {
            *self.failures.lock().unwrap() += 1;
        }
    }

    struct Harness {
        writer: CapturingWriter,
        statistics: RecordingStatistics,
        metric_writer: MetricWriter,
    }

    fn harness(config: InfluxDbV2Configuration) -> Harness {
        harness_with_writer(config, CapturingWriter::default())
    }

    fn harness_with_writer(config: InfluxDbV2Configuration, writer: CapturingWriter) -> Harness {
        let statistics = RecordingStatistics::default();
        let metric_writer = MetricWriter::with_writer(&config, writer.clone()).with_statistics(statistics.clone());

        Harness {
            writer,
            statistics,
            metric_writer,
        }
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn fields(pairs: Vec<(&str, RawFieldValue)>) -> Fields {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn host1() -> Device {
        Device::new("host1")
    }

    #[tokio::test]
    async fn writes_filtered_point() {
        let h = harness(InfluxDbV2Configuration::default());

        let outcome = h
            .metric_writer
            .try_put(
                &host1(),
                "sensor",
                &tags(&[("region", "us")]),
                &fields(vec![("temp", 21.5f64.into())]),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PutOutcome::Written { .. }));

        let expected = Point::new("sensor")
            .with_tag("hostname", "host1")
            .with_tag("region", "us")
            .with_field("temp", 21.5f64);
        assert_eq!(h.writer.points(), vec![expected]);
        assert_eq!(h.statistics.writes(), 1);
        assert_eq!(h.statistics.failures(), 0);
    }

    #[tokio::test]
    async fn measurement_not_allowed() {
        let h = harness(InfluxDbV2Configuration::default().with_measurements("ports, processors"));

        for measurement in ["sensor", "Ports"] {
            let outcome = h
                .metric_writer
                .try_put(&host1(), measurement, &Tags::new(), &fields(vec![("value", 1i64.into())]))
                .await
                .unwrap();
            assert_eq!(outcome, PutOutcome::Skipped(SkipReason::MeasurementNotAllowed));
        }

        assert!(h.writer.points().is_empty());
        assert_eq!(h.statistics.writes(), 0);
        assert_eq!(h.statistics.failures(), 0);

        let outcome = h
            .metric_writer
            .try_put(&host1(), "ports", &Tags::new(), &fields(vec![("value", 1i64.into())]))
            .await
            .unwrap();
        assert!(matches!(outcome, PutOutcome::Written { .. }));
    }

    #[test]
    fn tag_allow_list_is_case_insensitive() {
        let h = harness(InfluxDbV2Configuration::default().with_tags("IFNAME"));

        let point = h
            .metric_writer
            .build_point(
                &host1(),
                "ports",
                &tags(&[("ifName", "eth0"), ("ifAlias", "uplink")]),
                &fields(vec![("ifInOctets", 1i64.into())]),
            )
            .unwrap();

        assert_eq!(point.tags(), &tags(&[("hostname", "host1"), ("ifName", "eth0")]));
    }

    #[test]
    fn hostname_always_present() {
        let h = harness(InfluxDbV2Configuration::default().with_tags("something_else"));

        let point = h
            .metric_writer
            .build_point(
                &host1(),
                "ports",
                &tags(&[("hostname", "spoofed"), ("ifName", "eth0")]),
                &fields(vec![("ifInOctets", 1i64.into())]),
            )
            .unwrap();

        assert_eq!(point.tags(), &tags(&[("hostname", "host1")]));
    }

    #[test]
    fn empty_tag_values_become_blank() {
        let h = harness(InfluxDbV2Configuration::default());

        let point = h
            .metric_writer
            .build_point(
                &host1(),
                "ports",
                &tags(&[("ifAlias", ""), ("ifName", "eth0")]),
                &fields(vec![("ifInOctets", 1i64.into())]),
            )
            .unwrap();

        assert_eq!(point.tags().get("ifAlias").map(String::as_str), Some(BLANK_TAG_VALUE));
        assert_eq!(point.tags().get("ifName").map(String::as_str), Some("eth0"));
    }

    #[test]
    fn falsy_tag_values_become_blank() {
        let h = harness(InfluxDbV2Configuration::default());

        let point = h
            .metric_writer
            .build_point(
                &host1(),
                "ports",
                &tags(&[("ifIndex", "0"), ("ifSpeed", "00"), ("ifType", "0.0")]),
                &fields(vec![("ifInOctets", 1i64.into())]),
            )
            .unwrap();

        assert_eq!(point.tags().get("ifIndex").map(String::as_str), Some(BLANK_TAG_VALUE));
        assert_eq!(point.tags().get("ifSpeed").map(String::as_str), Some("00"));
        assert_eq!(point.tags().get("ifType").map(String::as_str), Some("0.0"));
    }

    #[test]
    fn empty_hostname_becomes_blank() {
        let h = harness(InfluxDbV2Configuration::default());

        let point = h
            .metric_writer
            .build_point(
                &Device::new(""),
                "ports",
                &Tags::new(),
                &fields(vec![("ifInOctets", 1i64.into())]),
            )
            .unwrap();

        assert_eq!(point.tags().get(HOSTNAME_TAG).map(String::as_str), Some(BLANK_TAG_VALUE));
    }

    #[test]
    fn field_allow_list() {
        let h = harness(InfluxDbV2Configuration::default().with_fields("TEMP"));

        let point = h
            .metric_writer
            .build_point(
                &host1(),
                "sensor",
                &Tags::new(),
                &fields(vec![("temp", 21.5f64.into()), ("humidity", 40i64.into())]),
            )
            .unwrap();

        let expected = BTreeMap::from([("temp".to_string(), FieldValue::Float(21.5))]);
        assert_eq!(point.fields(), &expected);
    }

    #[test]
    fn time_field_is_renamed() {
        let h = harness(InfluxDbV2Configuration::default());

        let point = h
            .metric_writer
            .build_point(&host1(), "poller", &Tags::new(), &fields(vec![("time", 5i64.into())]))
            .unwrap();

        let expected = BTreeMap::from([("rtime".to_string(), FieldValue::Float(5.0))]);
        assert_eq!(point.fields(), &expected);
    }

    #[test]
    fn time_field_allow_list_uses_original_key() {
        let allowed = harness(InfluxDbV2Configuration::default().with_fields("time"));
        let point = allowed
            .metric_writer
            .build_point(&host1(), "poller", &Tags::new(), &fields(vec![("time", 5i64.into())]))
            .unwrap();
        assert!(point.fields().contains_key("rtime"));

        let renamed_only = harness(InfluxDbV2Configuration::default().with_fields("rtime"));
        let point = renamed_only.metric_writer.build_point(
            &host1(),
            "poller",
            &Tags::new(),
            &fields(vec![("time", 5i64.into())]),
        );
        assert!(point.is_none());
    }

    #[test]
    fn fields_are_coerced() {
        let h = harness(InfluxDbV2Configuration::default());

        let point = h
            .metric_writer
            .build_point(
                &host1(),
                "sensor",
                &Tags::new(),
                &fields(vec![
                    ("count", "42".into()),
                    ("state", "ok".into()),
                    ("unknown", "U".into()),
                    ("missing", RawFieldValue::Null),
                ]),
            )
            .unwrap();

        let expected = BTreeMap::from([
            ("count".to_string(), FieldValue::Float(42.0)),
            ("state".to_string(), FieldValue::String("ok".to_string())),
        ]);
        assert_eq!(point.fields(), &expected);
    }

    #[tokio::test]
    async fn no_fields_left() {
        let h = harness(InfluxDbV2Configuration::default());

        let outcome = h
            .metric_writer
            .try_put(&host1(), "sensor", &Tags::new(), &fields(vec![("sensor", "U".into())]))
            .await
            .unwrap();

        assert_eq!(outcome, PutOutcome::Skipped(SkipReason::NoFields));
        assert!(h.writer.points().is_empty());
        assert_eq!(h.statistics.writes(), 0);
    }

    #[tokio::test]
    async fn all_fields_filtered_out() {
        let h = harness(InfluxDbV2Configuration::default().with_fields("temp"));

        let outcome = h
            .metric_writer
            .try_put(&host1(), "sensor", &Tags::new(), &fields(vec![("humidity", 40i64.into())]))
            .await
            .unwrap();

        assert_eq!(outcome, PutOutcome::Skipped(SkipReason::NoFields));
        assert!(h.writer.points().is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_reported_by_try_put() {
        let h = harness_with_writer(InfluxDbV2Configuration::default(), CapturingWriter::failing());

        let result = h
            .metric_writer
            .try_put(&host1(), "sensor", &Tags::new(), &fields(vec![("temp", 21.5f64.into())]))
            .await;

        assert!(matches!(result, Err(WriteError::Rejected { status: 503, .. })));
        assert_eq!(h.writer.points().len(), 1);
        assert_eq!(h.statistics.writes(), 0);
        assert_eq!(h.statistics.failures(), 1);
    }

    #[tokio::test]
    async fn write_failure_is_swallowed_by_put() {
        let h = harness_with_writer(InfluxDbV2Configuration::default(), CapturingWriter::failing());

        h.metric_writer
            .put(&host1(), "sensor", &Tags::new(), &fields(vec![("temp", 21.5f64.into())]))
            .await;

        // Exactly one attempt: no retries.
        assert_eq!(h.writer.points().len(), 1);
        assert_eq!(h.statistics.writes(), 0);
        assert_eq!(h.statistics.failures(), 1);
    }

    #[tokio::test]
    async fn put_writes_one_point_per_call() {
        let h = harness(InfluxDbV2Configuration::default());

        for i in 0..3i64 {
            h.metric_writer
                .put(&host1(), "sensor", &Tags::new(), &fields(vec![("value", i.into())]))
                .await;
        }

        assert_eq!(h.writer.points().len(), 3);
        assert_eq!(h.statistics.writes(), 3);
    }

    #[test]
    fn metadata() {
        let h = harness(InfluxDbV2Configuration::default());

        assert_eq!(h.metric_writer.name(), "InfluxDBv2");
        assert!(!h.metric_writer.wants_rrd_tags());

        let enabled = ConfigurationLoader::default()
            .from_yaml_str("influxdbv2:\n  enable: true\n")
            .unwrap()
            .into_generic();
        assert!(MetricWriter::is_enabled(&enabled));

        let unset = ConfigurationLoader::default().from_yaml_str("{}").unwrap().into_generic();
        assert!(!MetricWriter::is_enabled(&unset));
    }

    #[test]
    fn from_configuration_makes_no_connection() {
        // Nothing listens on this port; construction must still succeed since connecting is deferred.
        let config = ConfigurationLoader::default()
            .from_yaml_str("influxdbv2:\n  host: 127.0.0.1\n  port: 9\n  measurements: ports\n")
            .unwrap()
            .into_generic();

        assert!(MetricWriter::from_configuration(&config).is_ok());
    }

    #[test]
    fn from_configuration_rejects_bad_endpoint() {
        let config = ConfigurationLoader::default()
            .from_yaml_str("influxdbv2:\n  host: \"not a host\"\n")
            .unwrap()
            .into_generic();

        let error = MetricWriter::from_configuration(&config).err().unwrap();
        assert_eq!(error.to_string(), "Failed to build InfluxDB client.");
    }

    #[test]
    fn from_configuration_reports_invalid_configuration() {
        let config = ConfigurationLoader::default()
            .from_yaml_str("influxdbv2:\n  port: eighty\n")
            .unwrap()
            .into_generic();

        let error = MetricWriter::from_configuration(&config).err().unwrap();
        assert_eq!(error.to_string(), "Invalid InfluxDB v2 configuration.");
    }
}
