// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::output::FakeOutputSink;
use crate::store::{FakeRecordStore, MemoryStore};
use lg_core::{HolderToken, OutputId};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a future on a fresh runtime with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn g1() -> ResourceId {
    ResourceId::new("G1")
}

#[test]
fn cas_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let store = TracedRecordStore::new(MemoryStore::new());
        store
            .compare_and_set_lease(
                &g1(),
                &LeaseState::Free,
                LeaseState::Held {
                    holder: HolderToken::new("t-1"),
                },
            )
            .await
    });

    assert!(result.unwrap());
    assert!(logs.contains("store.cas_lease"), "Logs:\n{}", logs);
    assert!(logs.contains("applied"), "Logs:\n{}", logs);
    assert!(logs.contains("elapsed_ms"), "Logs:\n{}", logs);
}

#[test]
fn cas_logs_lost_race() {
    let (logs, result) = with_tracing(|| async {
        let store = TracedRecordStore::new(MemoryStore::new());
        store
            .compare_and_set_lease(
                &g1(),
                &LeaseState::Held {
                    holder: HolderToken::new("t-0"),
                },
                LeaseState::Free,
            )
            .await
    });

    assert!(!result.unwrap());
    assert!(logs.contains("lost race"), "Logs:\n{}", logs);
}

#[test]
fn store_errors_are_logged() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeRecordStore::new();
        fake.set_unavailable(true);
        TracedRecordStore::new(fake).lease(&g1()).await
    });

    assert!(result.is_err());
    assert!(logs.contains("lease read failed"), "Logs:\n{}", logs);
    assert!(logs.contains("injected"), "Logs:\n{}", logs);
}

#[test]
fn output_failure_is_a_warning() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeOutputSink::new();
        fake.fail_output(OutputId(2));
        TracedOutputSink::new(fake)
            .send(OutputCommand::off(OutputId(2)))
            .await
    });

    assert!(result.is_err());
    assert!(logs.contains("output.send"), "Logs:\n{}", logs);
    assert!(logs.contains("OFF:2"), "Logs:\n{}", logs);
    assert!(logs.contains("WARN"), "Logs:\n{}", logs);
}
