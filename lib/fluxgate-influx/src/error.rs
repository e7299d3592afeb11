use snafu::Snafu;

/// Client construction errors.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum ClientError {
    /// The configured endpoint could not be turned into a valid URL.
    #[snafu(display("invalid endpoint '{}': {}", endpoint, source))]
    InvalidEndpoint {
        /// The endpoint, as assembled from the configuration.
        endpoint: String,

        /// Error source.
        source: url::ParseError,
    },

    /// The underlying HTTP client could not be built.
    #[snafu(display("failed to build HTTP client: {}", source))]
    BuildHttpClient {
        /// Error source.
        source: reqwest::Error,
    },
}

/// Write errors.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum WriteError {
    /// A point had no fields left to write.
    #[snafu(display("point for measurement '{}' has no fields", measurement))]
    EmptyFields {
        /// Measurement of the offending point.
        measurement: String,
    },

    /// A float field was NaN or infinite, which line protocol cannot represent.
    #[snafu(display("field '{}' of measurement '{}' is not a finite number", field, measurement))]
    NonFiniteField {
        /// Measurement of the offending point.
        measurement: String,

        /// Key of the offending field.
        field: String,
    },

    /// The request could not be sent, or the response could not be received.
    #[snafu(display("failed to send write request: {}", source))]
    Request {
        /// Error source.
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[snafu(display("write rejected by server ({}): {}", status, body))]
    Rejected {
        /// HTTP status code.
        status: u16,

        /// Response body, as returned by the server.
        body: String,
    },
}
