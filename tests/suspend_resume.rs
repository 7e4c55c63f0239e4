//! Suspend/resume delivery scenarios: fast pipelines that complete before
//! the suspend point and delayed pipelines completing from worker threads.

mod common;

use std::{sync::Arc, thread, time::Duration};

use bytes::Bytes;
use common::{FastDetached, WorkerDetached, recording_driver};
use holdwire::RawRequest;

#[tokio::test]
async fn fast_pipeline_completing_inside_dispatch_is_delivered() {
    // The handler invokes the callback before dispatch even returns, so the
    // completion races ahead of the suspend transition. The result must still
    // be delivered; nothing may hang.
    let mut driver = recording_driver(
        "fast",
        Arc::new(FastDetached {
            payload: Bytes::from_static(b"OK"),
        }),
    );

    driver
        .handle_request(RawRequest::new("fast", "GET", Bytes::new()))
        .await
        .expect("fast pipeline");
    assert_eq!(driver.into_writer().frames, vec![Bytes::from_static(b"OK")]);
}

#[tokio::test]
async fn delayed_worker_completion_is_delivered_on_the_connection_task() {
    let mut driver = recording_driver(
        "slow",
        Arc::new(WorkerDetached {
            payload: Bytes::from_static(b"DONE"),
            delay: Duration::from_millis(20),
        }),
    );

    let connection_thread = thread::current().id();
    driver
        .handle_request(RawRequest::new("slow", "GET", Bytes::new()))
        .await
        .expect("delayed pipeline");

    let writer = driver.into_writer();
    assert_eq!(writer.frames, vec![Bytes::from_static(b"DONE")]);
    // The response is written on the driver's re-entry, never on the worker
    // thread that invoked the callback.
    assert_eq!(writer.writer_threads, vec![connection_thread]);
}

#[tokio::test]
async fn worker_completing_before_the_suspend_registers_is_not_lost() {
    // Zero delay makes the worker race the connection task to the suspend
    // point; whichever side wins, exactly one response results.
    for _ in 0..16 {
        let mut driver = recording_driver(
            "race",
            Arc::new(WorkerDetached {
                payload: Bytes::from_static(b"WON"),
                delay: Duration::ZERO,
            }),
        );
        driver
            .handle_request(RawRequest::new("race", "GET", Bytes::new()))
            .await
            .expect("racing pipeline");
        assert_eq!(driver.into_writer().frames, vec![Bytes::from_static(b"WON")]);
    }
}
