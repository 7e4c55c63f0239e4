//! Exchange reuse across sequential requests on one connection.

mod common;

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use common::{EchoInline, RecordingWriter, WorkerDetached, recording_driver};
use holdwire::{ConnectionDriver, ConnectionId, HandlerRegistry, RawRequest};

#[tokio::test]
async fn sequential_requests_never_see_a_predecessors_result() {
    let registry = HandlerRegistry::new();
    registry.register(
        "work",
        Arc::new(WorkerDetached {
            payload: Bytes::from_static(b"DONE"),
            delay: Duration::ZERO,
        }),
    );
    let mut driver = ConnectionDriver::new(
        ConnectionId::new(9),
        Arc::new(registry),
        RecordingWriter::default(),
    );

    // One driver, one exchange, several requests: each must start from a
    // clean state and deliver exactly its own payload.
    for n in 0..3u8 {
        assert!(driver.suspension_handle().is_initial());
        assert_eq!(driver.writer_mut().frames.len(), usize::from(n));
        driver
            .handle_request(RawRequest::new("work", "GET", vec![n]))
            .await
            .expect("sequential request");
    }

    let frames = driver.into_writer().frames;
    assert_eq!(frames.len(), 3, "exactly one response per request");
    assert!(
        frames
            .iter()
            .all(|frame| frame.as_ref() == b"DONE"),
        "every request got a fresh completion, no residual results"
    );
}

#[tokio::test]
async fn distinct_payloads_map_to_their_own_requests() {
    let mut driver = recording_driver("echo", Arc::new(EchoInline));

    driver
        .handle_request(RawRequest::new("echo", "GET", Bytes::from_static(b"first")))
        .await
        .expect("first request");
    driver
        .handle_request(RawRequest::new("echo", "GET", Bytes::from_static(b"second")))
        .await
        .expect("second request");

    assert_eq!(
        driver.into_writer().frames,
        vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]
    );
}
