use castforged_av::TranscodeProfile;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "castforged")]
#[command(author, version, about = "Transcoding and seek engine for DLNA and Chromecast streaming")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and list its streams
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the encoder command line for a file and profile
    Plan {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,

        /// Delivery profile
        #[arg(short, long, default_value = "dlna-mpeg-ps")]
        profile: TranscodeProfile,

        /// Start offset as NPT (H:MM:SS.mmm)
        #[arg(long)]
        start: Option<String>,

        /// Length as NPT (H:MM:SS.mmm)
        #[arg(long)]
        length: Option<String>,

        /// Command line for the custom profile
        #[arg(long)]
        custom_command: Option<String>,
    },

    /// Split a custom command line into arguments
    Tokenize {
        /// Command line to split
        #[arg(required = true)]
        command: String,

        /// Treat the first character as escaped
        #[arg(long)]
        escape_first_char: bool,
    },

    /// Convert an HTTP byte range into an NPT range
    Range {
        /// Range header value, e.g. "bytes=1000-"
        #[arg(required = true)]
        header: String,

        /// Total resource size in bytes
        #[arg(long)]
        size: u64,

        /// Total duration as NPT (H:MM:SS.mmm)
        #[arg(long)]
        duration: String,
    },

    /// Format a contentFeatures.dlna.org header value
    Features {
        /// DLNA profile name
        #[arg(long, default_value = "")]
        profile_name: String,

        /// Advertise time-seek support
        #[arg(long)]
        time_seek: bool,

        /// Advertise byte-range support
        #[arg(long)]
        byte_range: bool,

        /// Mark the content as transcoded
        #[arg(long)]
        transcoded: bool,

        /// Override DLNA.ORG_FLAGS
        #[arg(long)]
        flags: Option<String>,
    },

    /// Transcode a file the way a streaming request would
    Transcode {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,

        /// Delivery profile
        #[arg(short, long, default_value = "dlna-mpeg-ps")]
        profile: TranscodeProfile,

        /// Range header value, e.g. "bytes=1000-"
        #[arg(long, requires = "duration")]
        range: Option<String>,

        /// Advertised resource size in bytes (default: source file size)
        #[arg(long)]
        size: Option<u64>,

        /// Source duration as NPT (H:MM:SS.mmm)
        #[arg(long)]
        duration: Option<String>,

        /// Command line for the custom profile
        #[arg(long)]
        custom_command: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        #[arg(value_name = "CONFIG")]
        file: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
