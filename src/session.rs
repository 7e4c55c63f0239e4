//! Connection identity.

/// Opaque identity of one physical connection.
///
/// The correlation layer never interprets the value; it exists so handler
/// resolution and log lines can name the connection a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw connection number.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// The raw connection number.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
