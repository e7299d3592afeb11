use async_trait::async_trait;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    redirect::Policy,
};
use snafu::ResultExt as _;
use tracing::trace;
use url::Url;

use crate::{
    config::{ClientConfiguration, Precision},
    error::{BuildHttpClient, ClientError, Request, WriteError},
    line_protocol, Point,
};

/// A sink for points.
///
/// This is the seam between code that decides what to write and code that knows how to get it to the server.
#[async_trait]
pub trait PointWriter: Send + Sync {
    /// Writes the given points as a single batch.
    ///
    /// Writing an empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// If the points could not be encoded, the request failed, or the server rejected the write, an error is
    /// returned. Nothing is retried.
    async fn write_points(&self, points: &[Point]) -> Result<(), WriteError>;
}

/// An InfluxDB v2 write client.
///
/// Holds a pooled HTTP client: no connection is made until the first write, and connections are reused across writes.
#[derive(Clone, Debug)]
pub struct InfluxClient {
    http: reqwest::Client,
    write_url: Url,
    bucket: String,
    organization: String,
    authorization: String,
    precision: Precision,
}

impl InfluxClient {
    /// Creates a new `InfluxClient` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the endpoint is not a valid URL, or the HTTP client could not be built, an error is returned.
    pub fn from_configuration(config: &ClientConfiguration) -> Result<Self, ClientError> {
        let write_url = config.write_url()?;

        let redirect_policy = if config.allow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .redirect(redirect_policy);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context(BuildHttpClient)?;

        Ok(Self {
            http,
            write_url,
            bucket: config.bucket.clone(),
            organization: config.organization.clone(),
            authorization: format!("Token {}", config.token),
            precision: config.precision,
        })
    }

    /// Returns the URL of the write API.
    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

#[async_trait]
impl PointWriter for InfluxClient {
    async fn write_points(&self, points: &[Point]) -> Result<(), WriteError> {
        if points.is_empty() {
            return Ok(());
        }

        let body = line_protocol::encode_points(points)?;
        trace!(url = %self.write_url, points = points.len(), body_len = body.len(), "Sending write request.");

        let response = self
            .http
            .post(self.write_url.clone())
            .query(&[
                ("org", self.organization.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", self.precision.as_query_value()),
            ])
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .context(Request)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_else(|_| String::from("<no body>"));
            Err(WriteError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
