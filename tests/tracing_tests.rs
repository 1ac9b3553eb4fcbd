//! Integration tests verifying the engine's tracing output, captured with a
//! custom `MakeWriter` the way the wider pack's tracing suites do it, since
//! `tracing`'s own dispatcher has no public "read back what was logged" API.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use stagegraph::backend::MemoryBackend;
use stagegraph::engine::{Engine, EchoPlugin, PluginRegistry};
use stagegraph::fingerprint::Sha256Hasher;
use stagegraph::store::session_create;
use stagegraph::{manifest_parse, EngineConfig, StatusCode};

#[derive(Clone, Default)]
struct LogBuf(Arc<Mutex<Vec<u8>>>);

impl LogBuf {
    fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl std::io::Write for LogBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuf {
    type Writer = LogBuf;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn setup_tracing() -> (LogBuf, tracing::subscriber::DefaultGuard) {
    let buf = LogBuf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buf, guard)
}

fn two_stage_dag() -> stagegraph::Dag {
    let text = r#"
[header]
name = "m"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = ["out"]
commands = ["alpha"]
handler = "echo"

[[stages]]
id = "beta"
name = "Beta"
previous = "alpha"
produces = ["out"]
commands = ["beta"]
handler = "echo"
"#;
    let mut known = HashSet::new();
    known.insert("echo".to_string());
    manifest_parse(text, &known).unwrap()
}

#[test]
fn dispatch_traces_stage_and_status_on_success() {
    let (logs, _guard) = setup_tracing();

    let dag = two_stage_dag();
    let backend = MemoryBackend::new();
    let config = EngineConfig::default();
    let hasher = Sha256Hasher;
    let mut registry = PluginRegistry::new();
    registry.register("echo", Box::new(EchoPlugin));
    let engine = Engine::new(&backend, &config, &hasher, &registry, &dag);
    let mut session = session_create(&backend, &config, "alice", "1.0").unwrap();
    let mut last_intent = None;

    let response = engine.dispatch(&mut session, &mut last_intent, "alpha").unwrap();
    assert_eq!(response.status_code, StatusCode::Ok);

    assert!(logs.contains("stage dispatched"), "logs: {}", logs.contents());
    assert!(logs.contains("alpha"), "logs: {}", logs.contents());
}

#[test]
fn phase_jump_pending_is_traced_before_confirmation() {
    let (logs, _guard) = setup_tracing();

    let dag = two_stage_dag();
    let backend = MemoryBackend::new();
    let config = EngineConfig::default();
    let hasher = Sha256Hasher;
    let mut registry = PluginRegistry::new();
    registry.register("echo", Box::new(EchoPlugin));
    let engine = Engine::new(&backend, &config, &hasher, &registry, &dag);
    let mut session = session_create(&backend, &config, "alice", "1.0").unwrap();
    let mut last_intent = None;

    let response = engine.dispatch(&mut session, &mut last_intent, "beta").unwrap();
    assert_eq!(response.status_code, StatusCode::Blocked);

    assert!(
        logs.contains("phase jump pending confirmation"),
        "logs: {}",
        logs.contents()
    );
    assert!(logs.contains("beta"), "logs: {}", logs.contents());
}

#[test]
fn unrecognized_command_is_traced() {
    let (logs, _guard) = setup_tracing();

    let dag = two_stage_dag();
    let backend = MemoryBackend::new();
    let config = EngineConfig::default();
    let hasher = Sha256Hasher;
    let registry = PluginRegistry::new();
    let engine = Engine::new(&backend, &config, &hasher, &registry, &dag);
    let mut session = session_create(&backend, &config, "alice", "1.0").unwrap();
    let mut last_intent = None;

    let response = engine.dispatch(&mut session, &mut last_intent, "frobnicate").unwrap();
    assert_eq!(response.status_code, StatusCode::Unknown);

    assert!(
        logs.contains("unrecognized command"),
        "logs: {}",
        logs.contents()
    );
}

#[test]
fn blocked_missing_prerequisite_is_traced_as_warning() {
    let (logs, _guard) = setup_tracing();

    let dag = two_stage_dag();
    let backend = MemoryBackend::new();
    let config = EngineConfig::default();
    let hasher = Sha256Hasher;
    let mut registry = PluginRegistry::new();
    registry.register("echo", Box::new(EchoPlugin));
    let engine = Engine::new(&backend, &config, &hasher, &registry, &dag);
    let mut session = session_create(&backend, &config, "alice", "1.0").unwrap();
    let mut last_intent = None;

    // confirm the phase jump straight to "beta" without ever running "alpha".
    engine.dispatch(&mut session, &mut last_intent, "beta").unwrap();
    let response = engine.dispatch(&mut session, &mut last_intent, "yes").unwrap();
    assert_eq!(response.status_code, StatusCode::BlockedMissing);

    assert!(
        logs.contains("dispatch blocked on missing prerequisites"),
        "logs: {}",
        logs.contents()
    );
}

#[test]
fn telemetry_emit_is_traced_at_debug() {
    let (logs, _guard) = setup_tracing();

    let backend = MemoryBackend::new();
    let (telemetry, _rx) = stagegraph::telemetry::Telemetry::new("test-actor", 8);
    let event = stagegraph::telemetry::TelemetryEvent::new(
        stagegraph::telemetry::TelemetryKind::Status,
        Some("sess-1"),
        Some("alpha"),
    );
    telemetry.emit(&backend, event).unwrap();

    assert!(
        logs.contains("telemetry event appended"),
        "logs: {}",
        logs.contents()
    );
    assert!(logs.contains("test-actor"), "logs: {}", logs.contents());
}
