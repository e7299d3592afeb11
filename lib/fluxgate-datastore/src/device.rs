/// A polled device, as seen by a datastore.
pub trait DeviceContext: Send + Sync {
    /// Returns the host name the device is polled under.
    fn hostname(&self) -> &str;
}

/// A minimal device record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Device {
    hostname: String,
}

impl Device {
    /// Creates a new `Device` with the given host name.
    pub fn new<H: Into<String>>(hostname: H) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

impl DeviceContext for Device {
    fn hostname(&self) -> &str {
        &self.hostname
    }
}
