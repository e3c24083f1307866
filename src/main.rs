mod cli;

use castforged::config::{self, Config};
use castforged::{SessionEngine, SessionRequest};
use castforged_av::tools::{get_tool_path, FFMPEG};
use castforged_av::{
    build_command, check_tools, parse_command_line_with, ExitOutcome, StreamProber,
    TokenizerOptions, TranscodeProfile, TranscodeRequest,
};
use castforged_dlna::{
    format_npt_range, http_range_to_npt_range, parse_npt, time_seek_range_header,
    ContentFeatures, CONTENT_FEATURES_DOMAIN,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "castforged=trace,castforged_av=trace,castforged_dlna=debug".to_string()
        } else {
            "castforged=info,castforged_av=info,castforged_dlna=info".to_string()
        }
    });

    // Logs go to stderr; stdout may carry a transcoded stream.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { file, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&config, &file, json))
        }
        Commands::Plan {
            file,
            profile,
            start,
            length,
            custom_command,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let mut request = TranscodeRequest::new(file, profile);
            if let Some(start) = start {
                request.start_offset = parse_npt_arg("--start", &start)?;
            }
            if let Some(length) = length {
                request.length = Some(parse_npt_arg("--length", &length)?);
            }
            request.custom_command = custom_command.or(config.transcode.custom_command.clone());

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(plan(&config, &request))
        }
        Commands::Tokenize {
            command,
            escape_first_char,
        } => tokenize(&command, escape_first_char),
        Commands::Range {
            header,
            size,
            duration,
        } => range(&header, size, &duration),
        Commands::Features {
            profile_name,
            time_seek,
            byte_range,
            transcoded,
            flags,
        } => {
            let features = ContentFeatures {
                profile_name,
                support_time_seek: time_seek,
                support_range: byte_range,
                transcoded,
                flags,
            };
            println!("{}", features);
            Ok(())
        }
        Commands::Transcode {
            file,
            profile,
            range,
            size,
            duration,
            custom_command,
            output,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let request = session_request(file, profile, range, size, duration, custom_command)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(transcode_file(&config, &request, output.as_deref()))
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_external_tools(&config)
        }
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("castforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_npt_arg(flag: &str, value: &str) -> Result<Duration> {
    parse_npt(value).with_context(|| format!("Invalid {} value", flag))
}

async fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let streams = config.prober().probe_streams(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&streams)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Streams: {}", streams.len());
    for stream in &streams {
        print!("  [{}] {} {}", stream.index, stream.codec_type, stream.codec_name);
        if let Some(channels) = stream.channels {
            print!(" {}ch", channels);
        }
        println!();
    }

    Ok(())
}

async fn plan(config: &Config, request: &TranscodeRequest) -> Result<()> {
    let settings = config.transcode_settings();
    let prober = config.prober();
    let argv = build_command(request, &prober, &settings).await?;

    println!("{}", argv.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" "));
    Ok(())
}

/// Quote an argument for display when it would not survive a shell as-is.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn tokenize(command: &str, escape_first_char: bool) -> Result<()> {
    let argv = parse_command_line_with(command, TokenizerOptions { escape_first_char })?;
    println!("{}", serde_json::to_string(&argv)?);
    Ok(())
}

fn range(header: &str, size: u64, duration: &str) -> Result<()> {
    let duration = parse_npt_arg("--duration", duration)?;
    let range = http_range_to_npt_range(header, size, duration)?;

    println!("npt={}", format_npt_range(&range));
    println!("bytes={}-{}", range.start_byte, range.end_byte);
    println!("TimeSeekRange.dlna.org: {}", time_seek_range_header(&range, duration, size));
    Ok(())
}

fn session_request(
    file: PathBuf,
    profile: TranscodeProfile,
    range: Option<String>,
    size: Option<u64>,
    duration: Option<String>,
    custom_command: Option<String>,
) -> Result<SessionRequest> {
    if !file.exists() {
        anyhow::bail!("Input file does not exist: {:?}", file);
    }

    let total_size = match size {
        Some(size) => size,
        None => std::fs::metadata(&file)
            .with_context(|| format!("Failed to stat {:?}", file))?
            .len(),
    };
    let total_duration = match duration {
        Some(ref d) => parse_npt_arg("--duration", d)?,
        None => Duration::ZERO,
    };

    Ok(SessionRequest {
        source_path: file,
        total_size,
        total_duration,
        range_header: range,
        profile,
        custom_command,
    })
}

async fn transcode_file(config: &Config, request: &SessionRequest, output: Option<&Path>) -> Result<()> {
    let mut config = config.clone();
    if request.profile != TranscodeProfile::Custom {
        let ffmpeg = get_tool_path(FFMPEG, config.tools.ffmpeg_path.as_deref())?;
        config.tools.ffmpeg_path = Some(ffmpeg);
    }

    let engine = SessionEngine::from_config(&config);
    let cancel = CancellationToken::new();
    let mut session = engine.open(request, &cancel).await?;

    for (name, value) in session.headers.pairs() {
        tracing::info!("{}: {}", name, value);
    }
    if let Some(ref range) = session.range {
        tracing::info!("Seeking to {}", format_npt_range(range));
    }

    let mut sink: Box<dyn AsyncWrite + Unpin> = match output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {:?}", path))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let copied = tokio::select! {
        result = tokio::io::copy(&mut session.process, &mut sink) => Some(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping encoder");
            None
        }
    };

    let termination = match copied {
        Some(result) => {
            let bytes = result.context("Failed to write transcoded output")?;
            sink.flush().await?;
            tracing::info!("Wrote {} bytes", bytes);
            session.process.wait().await
        }
        None => {
            // Drain what the encoder writes while finalizing.
            session.process.cancel();
            let _ = tokio::io::copy(&mut session.process, &mut sink).await;
            sink.flush().await?;
            session.process.wait().await
        }
    };

    match termination.outcome {
        ExitOutcome::Completed => Ok(()),
        ExitOutcome::Cancelled => {
            tracing::info!("Transcode cancelled");
            Ok(())
        }
        ExitOutcome::Failed(err) => Err(err.into()),
    }
}

fn check_external_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = check_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable transcoding.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let settings = config.transcode_settings();
    println!("  Encoder: {}", settings.ffmpeg.display());
    println!("  Threads: {}", settings.threads);
    println!("  Policy: {}", settings.policy);
    println!("  Minimum length: {:?}", settings.min_length);
    println!(
        "  Custom command: {}",
        config.transcode.custom_command.as_deref().unwrap_or("(none)")
    );
    let features = ContentFeatures {
        flags: config.dlna.flags.clone(),
        ..Default::default()
    };
    println!("  {}: {}", CONTENT_FEATURES_DOMAIN, features);

    Ok(())
}
