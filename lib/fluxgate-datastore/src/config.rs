use fluxgate_config::{GenericConfiguration, GenericError};
use fluxgate_influx::{ClientConfiguration, Precision, Transport};

use crate::allowlist::{AllowList, Matching, RawAllowList};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8086;
const DEFAULT_BUCKET: &str = "librenms";
const DEFAULT_ORGANIZATION: &str = "librenms";
const DEFAULT_TIMEOUT_SECS: u64 = 0;

/// InfluxDB v2 datastore configuration.
///
/// Read once from the `influxdbv2.*` keys of the host configuration. See [`from_configuration`][Self::from_configuration]
/// for the keys and their defaults.
#[derive(Clone, Debug)]
pub struct InfluxDbV2Configuration {
    client: ClientConfiguration,
    measurements: AllowList,
    tags: AllowList,
    fields: AllowList,
}

impl InfluxDbV2Configuration {
    /// Creates a new `InfluxDbV2Configuration` from the given configuration.
    ///
    /// | key | default |
    /// |---|---|
    /// | `influxdbv2.transport` | `http` |
    /// | `influxdbv2.host` | `localhost` |
    /// | `influxdbv2.port` | `8086` |
    /// | `influxdbv2.bucket` | `librenms` |
    /// | `influxdbv2.organization` | `librenms` |
    /// | `influxdbv2.token` | empty |
    /// | `influxdbv2.verifySSL` | `true` |
    /// | `influxdbv2.timeout` | `0` (no timeout) |
    /// | `influxdbv2.allow_redirects` | `true` |
    /// | `influxdbv2.measurements` | empty (allow all) |
    /// | `influxdbv2.tags` | empty (allow all) |
    /// | `influxdbv2.fields` | empty (allow all) |
    ///
    /// Allow-lists are comma-separated strings or sequences of strings. Tag and field names are matched
    /// case-insensitively, measurement names case-sensitively.
    ///
    /// # Errors
    ///
    /// If any value is present but has the wrong type, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let client = ClientConfiguration {
            transport: config
                .try_get_typed::<Transport>("influxdbv2.transport")?
                .unwrap_or_default(),
            host: config
                .try_get_typed::<String>("influxdbv2.host")?
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: config.try_get_typed::<u16>("influxdbv2.port")?.unwrap_or(DEFAULT_PORT),
            bucket: config
                .try_get_typed::<String>("influxdbv2.bucket")?
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            organization: config
                .try_get_typed::<String>("influxdbv2.organization")?
                .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
            token: config.try_get_typed::<String>("influxdbv2.token")?.unwrap_or_default(),
            verify_tls: config.try_get_typed::<bool>("influxdbv2.verifySSL")?.unwrap_or(true),
            timeout_secs: config
                .try_get_typed::<u64>("influxdbv2.timeout")?
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            allow_redirects: config
                .try_get_typed::<bool>("influxdbv2.allow_redirects")?
                .unwrap_or(true),
            precision: Precision::Nanoseconds,
        };

        Ok(Self {
            client,
            measurements: read_allow_list(config, "influxdbv2.measurements", Matching::CaseSensitive)?,
            tags: read_allow_list(config, "influxdbv2.tags", Matching::CaseInsensitive)?,
            fields: read_allow_list(config, "influxdbv2.fields", Matching::CaseInsensitive)?,
        })
    }

    /// Creates a new `InfluxDbV2Configuration` with the given client configuration and no allow-lists.
    pub fn from_client_configuration(client: ClientConfiguration) -> Self {
        Self {
            client,
            measurements: AllowList::allow_all(Matching::CaseSensitive),
            tags: AllowList::allow_all(Matching::CaseInsensitive),
            fields: AllowList::allow_all(Matching::CaseInsensitive),
        }
    }

    /// Sets the measurement allow-list from a comma-separated string.
    pub fn with_measurements(mut self, raw: &str) -> Self {
        self.measurements = AllowList::parse(raw, Matching::CaseSensitive);
        self
    }

    /// Sets the tag allow-list from a comma-separated string.
    pub fn with_tags(mut self, raw: &str) -> Self {
        self.tags = AllowList::parse(raw, Matching::CaseInsensitive);
        self
    }

    /// Sets the field allow-list from a comma-separated string.
    pub fn with_fields(mut self, raw: &str) -> Self {
        self.fields = AllowList::parse(raw, Matching::CaseInsensitive);
        self
    }

    /// Returns the client configuration.
    pub fn client(&self) -> &ClientConfiguration {
        &self.client
    }

    /// Returns the measurement allow-list.
    pub fn measurements(&self) -> &AllowList {
        &self.measurements
    }

    /// Returns the tag allow-list.
    pub fn tags(&self) -> &AllowList {
        &self.tags
    }

    /// Returns the field allow-list.
    pub fn fields(&self) -> &AllowList {
        &self.fields
    }
}

impl Default for InfluxDbV2Configuration {
    fn default() -> Self {
        Self::from_client_configuration(ClientConfiguration {
            bucket: DEFAULT_BUCKET.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            ..Default::default()
        })
    }
}

/// Returns `true` if the InfluxDB v2 datastore is enabled in the given configuration.
///
/// Reads `influxdbv2.enable`, defaulting to `false` when missing or not a boolean.
pub fn is_enabled(config: &GenericConfiguration) -> bool {
    config.get_typed_or_default::<bool>("influxdbv2.enable")
}

fn read_allow_list(config: &GenericConfiguration, key: &str, matching: Matching) -> Result<AllowList, GenericError> {
    Ok(config
        .try_get_typed::<RawAllowList>(key)?
        .map(|raw| raw.into_allow_list(matching))
        .unwrap_or_else(|| AllowList::allow_all(matching)))
}
