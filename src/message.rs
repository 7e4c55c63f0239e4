//! In-flight message representation and its construction seam.
//!
//! A [`RawRequest`] is what the connection front end hands over after
//! protocol parsing (out of scope here). A [`Message`] is the internal
//! representation travelling through the backend pipeline: an opaque payload,
//! string metadata, and a thread-access marker enforcing the ownership
//! handoff described in [`crate::ownership`]. Message construction is an
//! external concern exposed through [`MessageFactory`].

use std::collections::HashMap;

use bytes::Bytes;

use crate::ownership::{AccessControl, AccessViolation};

/// Metadata key under which the request method is recorded at admission.
pub const METHOD_KEY: &str = "method";

/// Raw inbound request as delivered by the connection front end.
#[derive(Clone, Debug)]
pub struct RawRequest {
    /// Routing target used for handler lookup.
    pub target: String,
    /// Request method or verb, attached to the message metadata at admission.
    pub method: String,
    /// Opaque request payload.
    pub payload: Bytes,
}

impl RawRequest {
    /// Build a raw request from its parts.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        method: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
            payload: payload.into(),
        }
    }
}

/// Internal message handed to the backend pipeline.
///
/// Mutators verify the thread-access marker before touching state, so a
/// message mutated on a pipeline thread cannot be silently mutated again on
/// the connection side until the marker is reset.
#[derive(Debug)]
pub struct Message {
    payload: Bytes,
    metadata: HashMap<String, String>,
    access: AccessControl,
}

impl Message {
    /// Create a message carrying `payload` with an unbound access marker.
    #[must_use]
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            metadata: HashMap::new(),
            access: AccessControl::new(),
        }
    }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Replace the payload.
    ///
    /// # Errors
    ///
    /// Returns [`AccessViolation`] if another thread holds the access marker.
    pub fn set_payload(&mut self, payload: Bytes) -> Result<(), AccessViolation> {
        self.access.check()?;
        self.payload = payload;
        Ok(())
    }

    /// Look up a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Insert a metadata entry.
    ///
    /// # Errors
    ///
    /// Returns [`AccessViolation`] if another thread holds the access marker.
    pub fn set_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), AccessViolation> {
        self.access.check()?;
        self.metadata.insert(key.into(), value.into());
        Ok(())
    }

    /// Clear the thread-access marker, handing mutation rights to the next
    /// mutating thread.
    pub fn reset_access_control(&self) { self.access.reset(); }

    /// Returns `true` while no thread holds the access marker.
    #[must_use]
    pub fn access_is_unbound(&self) -> bool { self.access.is_unbound() }
}

/// External seam constructing a [`Message`] from a raw request.
pub trait MessageFactory: Send + Sync {
    /// Build the internal message for `raw`.
    fn build(&self, raw: &RawRequest) -> Message;
}

/// Factory carrying the raw payload over unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMessageFactory;

impl MessageFactory for DefaultMessageFactory {
    fn build(&self, raw: &RawRequest) -> Message { Message::new(raw.payload.clone()) }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{DefaultMessageFactory, Message, MessageFactory, RawRequest};

    #[test]
    fn factory_copies_the_raw_payload() {
        let raw = RawRequest::new("echo", "GET", Bytes::from_static(b"ping"));
        let message = DefaultMessageFactory.build(&raw);
        assert_eq!(message.payload().as_ref(), b"ping");
        assert!(message.access_is_unbound());
    }

    #[test]
    fn payload_replacement_honors_the_access_marker() {
        let mut message = Message::new(Bytes::from_static(b"before"));
        message
            .set_payload(Bytes::from_static(b"after"))
            .expect("creating thread binds the marker");

        std::thread::spawn(move || {
            assert!(message.set_payload(Bytes::from_static(b"hijack")).is_err());
            assert_eq!(message.payload().as_ref(), b"after");
        })
        .join()
        .expect("worker thread");
    }

    #[test]
    fn mutation_from_a_foreign_thread_fails_until_reset() {
        let mut message = Message::new(Bytes::from_static(b"x"));
        message
            .set_metadata("method", "GET")
            .expect("creating thread binds the marker");

        let message = std::thread::spawn(move || {
            assert!(message.set_metadata("k", "v").is_err());
            message.reset_access_control();
            message
                .set_metadata("k", "v")
                .expect("reset hands over the marker");
            message
        })
        .join()
        .expect("worker thread");

        assert_eq!(message.metadata("k"), Some("v"));
    }
}
