//! Integration tests for stream sessions: range resolution, encoder launch,
//! cancellation and header assembly.

use assert_matches::assert_matches;
use castforged::config::Config;
use castforged::{SessionEngine, SessionError, SessionRequest};
use castforged_av::{
    DiagnosticsSink, ExitOutcome, FfprobeProber, ProcessError, TranscodeProfile,
    TranscodeSettings,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingSink {
    failures: Mutex<Vec<ProcessError>>,
}

impl DiagnosticsSink for RecordingSink {
    fn encoder_output(&self, _program: &str, _line: &str) {}

    fn encoder_failed(&self, error: &ProcessError) {
        self.failures.lock().unwrap().push(error.clone());
    }
}

fn engine(sink: Arc<RecordingSink>) -> SessionEngine {
    SessionEngine::new(
        TranscodeSettings::default(),
        Arc::new(FfprobeProber::new("nonexistent_ffprobe_12345")),
        sink,
    )
}

fn custom_session(command: &str, range: Option<&str>) -> SessionRequest {
    SessionRequest {
        source_path: PathBuf::from("/media/films/clip.mkv"),
        total_size: 10_000,
        total_duration: Duration::from_secs(600),
        range_header: range.map(String::from),
        profile: TranscodeProfile::Custom,
        custom_command: Some(command.to_string()),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn custom_session_streams_encoder_output() {
    let sink = Arc::new(RecordingSink::default());
    let mut session = engine(sink.clone())
        .open(
            &custom_session("printf %s {filename}", None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let mut body = String::new();
    session.process.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "clip.mkv");

    let termination = session.process.wait().await;
    assert_eq!(termination.outcome, ExitOutcome::Completed);
    assert!(sink.failures.lock().unwrap().is_empty());
    assert_eq!(session.headers.content_type, "application/octet-stream");
}

#[cfg(unix)]
#[tokio::test]
async fn placeholders_receive_resolved_range() {
    let mut session = engine(Arc::default())
        .open(
            &custom_session("printf %s {start}", Some("bytes=5000-")),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let mut body = String::new();
    session.process.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "0:05:00");
    assert_eq!(session.range.map(|r| r.start), Some(Duration::from_secs(300)));
}

#[cfg(unix)]
#[tokio::test]
async fn cancelling_request_is_not_a_failure() {
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    let mut session = engine(sink.clone())
        .open(&custom_session("sleep 30", None), &cancel)
        .await
        .unwrap();

    cancel.cancel();

    let mut body = Vec::new();
    session.process.read_to_end(&mut body).await.unwrap();
    assert!(body.is_empty());

    let termination = session.process.wait().await;
    assert_eq!(termination.outcome, ExitOutcome::Cancelled);
    assert!(termination.interrupted);
    assert!(sink.failures.lock().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn encoder_failure_reaches_sink_only() {
    let sink = Arc::new(RecordingSink::default());
    let mut session = engine(sink.clone())
        .open(&custom_session("sh -c 'exit 1'", None), &CancellationToken::new())
        .await
        .unwrap();

    let mut body = Vec::new();
    session.process.read_to_end(&mut body).await.unwrap();

    let termination = session.process.wait().await;
    assert!(termination.outcome.is_failure());
    assert_eq!(sink.failures.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_range_is_rejected_before_launch() {
    let result = engine(Arc::default())
        .open(
            &custom_session("sleep 30", Some("bytes=a-b")),
            &CancellationToken::new(),
        )
        .await;

    let err = result.unwrap_err();
    assert_matches!(err, SessionError::Range(_));
    assert_eq!(err.http_status(), 416);
}

#[tokio::test]
async fn probe_failure_is_a_server_error() {
    let mut session = custom_session("unused", None);
    session.profile = TranscodeProfile::DlnaMpegPs;

    let err = engine(Arc::default())
        .open(&session, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        SessionError::Transcode(castforged_av::Error::Probe(_))
    );
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn missing_encoder_is_a_launch_error() {
    let err = engine(Arc::default())
        .open(
            &custom_session("nonexistent_encoder_12345 {input}", None),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        SessionError::Transcode(castforged_av::Error::Launch { .. })
    );
}

#[test]
fn engine_from_config_uses_configured_values() {
    let config: Config = toml::from_str(
        r#"
        [transcode]
        custom_command = "enc {input}"

        [dlna]
        flags = "81700000000000000000000000000000"
        "#,
    )
    .unwrap();

    let engine = SessionEngine::from_config(&config);
    let mut request = custom_session("ignored", None);
    request.custom_command = None;

    let resolved = engine.resolve(&request).unwrap();
    assert_eq!(resolved.request.custom_command.as_deref(), Some("enc {input}"));
    assert!(resolved
        .headers
        .content_features
        .ends_with("DLNA.ORG_FLAGS=81700000000000000000000000000000"));
}
