//! One streaming response, end to end.
//!
//! A [`SessionEngine`] turns a client request (source, optional `Range`
//! header, delivery profile) into a running encoder plus the DLNA response
//! headers that describe it.

use crate::config::Config;
use castforged_av::{
    transcode, DiagnosticsSink, EncoderProcess, StreamProber, TracingSink, TranscodeProfile,
    TranscodeRequest, TranscodeSettings,
};
use castforged_dlna::{
    http_range_to_npt_range, time_seek_range_header, ContentFeatures, NptRange,
    CONTENT_FEATURES_DOMAIN, TIME_SEEK_RANGE_DOMAIN, TRANSFER_MODE_DOMAIN,
    TRANSFER_MODE_STREAMING,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Errors opening a stream session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The `Range` header could not be satisfied.
    #[error("range not satisfiable: {0}")]
    Range(#[from] castforged_dlna::Error),

    /// The encoder could not be planned or started.
    #[error(transparent)]
    Transcode(#[from] castforged_av::Error),
}

impl SessionError {
    /// HTTP status an HTTP layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            SessionError::Range(_) => 416,
            SessionError::Transcode(_) => 500,
        }
    }
}

/// What a client asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Source media file.
    pub source_path: PathBuf,
    /// Size advertised for the transcoded resource.
    pub total_size: u64,
    /// Duration of the source.
    pub total_duration: Duration,
    /// Raw HTTP `Range` header, if any.
    pub range_header: Option<String>,
    /// Delivery profile.
    pub profile: TranscodeProfile,
    /// Command for [`TranscodeProfile::Custom`]; falls back to configuration.
    pub custom_command: Option<String>,
}

/// DLNA response header values for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeaders {
    /// `Content-Type`.
    pub content_type: &'static str,
    /// `contentFeatures.dlna.org`.
    pub content_features: String,
    /// `transferMode.dlna.org`.
    pub transfer_mode: &'static str,
    /// `TimeSeekRange.dlna.org`, when a seekable range was requested.
    pub time_seek_range: Option<String>,
}

impl StreamHeaders {
    /// Header name/value pairs in response order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("Content-Type", self.content_type),
            (CONTENT_FEATURES_DOMAIN, self.content_features.as_str()),
            (TRANSFER_MODE_DOMAIN, self.transfer_mode),
        ];
        if let Some(ref range) = self.time_seek_range {
            pairs.push((TIME_SEEK_RANGE_DOMAIN, range.as_str()));
        }
        pairs
    }
}

/// A request resolved into encoder inputs, before anything is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    /// Encoder request.
    pub request: TranscodeRequest,
    /// Range derived from the `Range` header, if one was sent.
    pub range: Option<NptRange>,
    /// Response headers.
    pub headers: StreamHeaders,
}

/// A live session: the encoder output plus its headers.
#[derive(Debug)]
pub struct StreamSession {
    /// Running encoder; read it to obtain the body.
    pub process: EncoderProcess,
    /// Range derived from the `Range` header, if one was sent.
    pub range: Option<NptRange>,
    /// Response headers.
    pub headers: StreamHeaders,
}

/// Opens stream sessions with shared settings and collaborators.
#[derive(Clone)]
pub struct SessionEngine {
    settings: TranscodeSettings,
    prober: Arc<dyn StreamProber>,
    sink: Arc<dyn DiagnosticsSink>,
    custom_command: Option<String>,
    dlna_flags: Option<String>,
}

impl SessionEngine {
    /// Create an engine with explicit collaborators.
    pub fn new(
        settings: TranscodeSettings,
        prober: Arc<dyn StreamProber>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            settings,
            prober,
            sink,
            custom_command: None,
            dlna_flags: None,
        }
    }

    /// Create an engine from configuration, probing with ffprobe and
    /// reporting diagnostics to `tracing`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.transcode_settings(),
            Arc::new(config.prober()),
            Arc::new(TracingSink),
        )
        .with_custom_command(config.transcode.custom_command.clone())
        .with_dlna_flags(config.dlna.flags.clone())
    }

    /// Builder: default command for the custom profile.
    pub fn with_custom_command(mut self, command: Option<String>) -> Self {
        self.custom_command = command;
        self
    }

    /// Builder: `DLNA.ORG_FLAGS` override.
    pub fn with_dlna_flags(mut self, flags: Option<String>) -> Self {
        self.dlna_flags = flags;
        self
    }

    /// Encoder settings in use.
    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }

    /// Resolve the range and build the encoder request and headers.
    ///
    /// An absent `Range` header means the whole resource. A range covering
    /// the whole resource leaves the length open so the encoder runs to the
    /// end of the source.
    ///
    /// # Errors
    ///
    /// [`SessionError::Range`] when the header is malformed or out of bounds.
    pub fn resolve(&self, session: &SessionRequest) -> Result<ResolvedSession, SessionError> {
        let range = session
            .range_header
            .as_deref()
            .map(|header| {
                http_range_to_npt_range(header, session.total_size, session.total_duration)
            })
            .transpose()?;

        let mut request = TranscodeRequest::new(&session.source_path, session.profile);
        if let Some(ref range) = range {
            request.start_offset = range.start;
            if !covers_whole_resource(range, session.total_duration) {
                request.length = range.length();
            }
        }
        request.custom_command = session
            .custom_command
            .clone()
            .or_else(|| self.custom_command.clone());

        let seekable = session.profile.supports_seek();
        let features = ContentFeatures {
            profile_name: session.profile.dlna_profile_name().to_string(),
            support_time_seek: seekable,
            support_range: seekable,
            transcoded: true,
            flags: self.dlna_flags.clone(),
        };
        let time_seek_range = range
            .as_ref()
            .filter(|_| seekable)
            .map(|r| time_seek_range_header(r, session.total_duration, session.total_size));

        tracing::debug!(
            "Resolved {:?} ({}) to start {:?}, length {:?}",
            session.source_path,
            session.profile,
            request.start_offset,
            request.length
        );

        Ok(ResolvedSession {
            request,
            range,
            headers: StreamHeaders {
                content_type: session.profile.mime_type(),
                content_features: features.to_string(),
                transfer_mode: TRANSFER_MODE_STREAMING,
                time_seek_range,
            },
        })
    }

    /// Resolve `session` and start its encoder.
    ///
    /// Cancelling `cancel` (or dropping the returned process) interrupts the
    /// encoder.
    ///
    /// # Errors
    ///
    /// Range errors, and every encoder error detectable before streaming.
    pub async fn open(
        &self,
        session: &SessionRequest,
        cancel: &CancellationToken,
    ) -> Result<StreamSession, SessionError> {
        let resolved = self.resolve(session)?;
        let process = transcode(
            &resolved.request,
            self.prober.as_ref(),
            &self.settings,
            Arc::clone(&self.sink),
            cancel,
        )
        .await?;

        Ok(StreamSession {
            process,
            range: resolved.range,
            headers: resolved.headers,
        })
    }
}

fn covers_whole_resource(range: &NptRange, total_duration: Duration) -> bool {
    range.start.is_zero() && range.end == Some(total_duration)
}
