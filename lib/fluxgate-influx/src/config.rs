use std::{fmt, time::Duration};

use serde::Deserialize;
use snafu::ResultExt as _;
use url::Url;

use crate::error::{ClientError, InvalidEndpoint};

/// URL scheme used to reach the server.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Plain HTTP.
    #[default]
    Http,

    /// HTTP over TLS.
    Https,
}

impl Transport {
    /// Returns the URL scheme.
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Timestamp precision of written points.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Precision {
    /// Seconds.
    Seconds,

    /// Milliseconds.
    Milliseconds,

    /// Microseconds.
    Microseconds,

    /// Nanoseconds.
    #[default]
    Nanoseconds,
}

impl Precision {
    /// Returns the value of the `precision` query parameter for this precision.
    pub const fn as_query_value(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
            Self::Nanoseconds => "ns",
        }
    }
}

/// Client configuration.
///
/// The defaults match a stock local InfluxDB v2 install: `http://localhost:8086`, no token, TLS verification on, no
/// client-side timeout, redirects followed, nanosecond precision.
#[derive(Clone, Debug)]
pub struct ClientConfiguration {
    /// URL scheme.
    pub transport: Transport,

    /// Server host name or address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Bucket to write to.
    pub bucket: String,

    /// Organization owning the bucket.
    pub organization: String,

    /// API token.
    pub token: String,

    /// Whether to verify the server's TLS certificate.
    pub verify_tls: bool,

    /// Request timeout, in seconds. Zero disables the timeout.
    pub timeout_secs: u64,

    /// Whether to follow HTTP redirects.
    pub allow_redirects: bool,

    /// Timestamp precision.
    pub precision: Precision,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            host: "localhost".to_string(),
            port: 8086,
            bucket: String::new(),
            organization: String::new(),
            token: String::new(),
            verify_tls: true,
            timeout_secs: 0,
            allow_redirects: true,
            precision: Precision::Nanoseconds,
        }
    }
}

impl ClientConfiguration {
    /// Returns the request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Returns the base URL of the server.
    ///
    /// # Errors
    ///
    /// If the transport, host and port don't form a valid URL, an error is returned.
    pub fn base_url(&self) -> Result<Url, ClientError> {
        // Bare IPv6 addresses need brackets to be used as a URL authority.
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        let endpoint = format!("{}://{}:{}/", self.transport, host, self.port);
        Url::parse(&endpoint).context(InvalidEndpoint { endpoint })
    }

    /// Returns the URL of the write API.
    ///
    /// # Errors
    ///
    /// If the transport, host and port don't form a valid URL, an error is returned.
    pub fn write_url(&self) -> Result<Url, ClientError> {
        let base_url = self.base_url()?;
        let endpoint = base_url.to_string();
        base_url.join("api/v2/write").context(InvalidEndpoint { endpoint })
    }
}
