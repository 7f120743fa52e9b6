// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn first_json_line(sink: &SharedBuffer) -> serde_json::Value {
    let bytes = sink.0.lock().expect("lock output").clone();
    let text = String::from_utf8(bytes).expect("utf8 log output");
    let line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .expect("log line");
    serde_json::from_str(line).expect("json log line")
}

#[test]
fn request_completion_log_is_json_with_span_fields() {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .json()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let span = tracing::info_span!(
            "http.request",
            request_id = %"req-0000000000000001",
            method = %"GET",
            route = %"/waveforms.json",
        );
        span.in_scope(|| {
            tracing::info!(
                target: "wavescope_server",
                status = 200_u16,
                latency_ms = 12_u64,
                "request completed"
            );
        });
    });

    let parsed = first_json_line(&sink);
    assert_eq!(parsed.get("level").and_then(|v| v.as_str()), Some("INFO"));
    assert_eq!(
        parsed.get("target").and_then(|v| v.as_str()),
        Some("wavescope_server")
    );
    let fields = parsed.get("fields").expect("fields object");
    assert_eq!(
        fields.get("message").and_then(|v| v.as_str()),
        Some("request completed")
    );
    assert_eq!(fields.get("status").and_then(|v| v.as_u64()), Some(200));
    let span = parsed.get("span").expect("span object");
    assert_eq!(
        span.get("name").and_then(|v| v.as_str()),
        Some("http.request")
    );
    assert_eq!(
        span.get("request_id").and_then(|v| v.as_str()),
        Some("req-0000000000000001")
    );
    assert_eq!(
        span.get("route").and_then(|v| v.as_str()),
        Some("/waveforms.json")
    );
}

#[test]
fn security_warnings_carry_a_boolean_marker() {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .json()
        .with_max_level(Level::WARN)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("dropped below max level");
        tracing::warn!(
            security = true,
            computer = "..",
            dir = "run",
            file = "x.parquet",
            "rejected index path"
        );
    });

    let parsed = first_json_line(&sink);
    assert_eq!(parsed.get("level").and_then(|v| v.as_str()), Some("WARN"));
    let fields = parsed.get("fields").expect("fields object");
    assert_eq!(
        fields.get("security").and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(fields.get("computer").and_then(|v| v.as_str()), Some(".."));
}
