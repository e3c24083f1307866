//! Castforged - transcoding and seek engine for DLNA and Chromecast streaming
//!
//! This library crate ties the encoder side (`castforged-av`) and the protocol
//! side (`castforged-dlna`) together into stream sessions, and exposes the
//! configuration used by the CLI.

pub mod config;
pub mod session;

pub use session::{
    ResolvedSession, SessionEngine, SessionError, SessionRequest, StreamHeaders, StreamSession,
};
