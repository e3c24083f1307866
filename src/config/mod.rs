mod types;

pub use types::*;

use anyhow::{Context, Result};
use castforged_av::parse_command_line_with;
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_tool_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./castforged.toml",
        "./config.toml",
        "~/.config/castforged/config.toml",
        "/etc/castforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_tool_paths(config: &mut Config) {
    for path in [&mut config.tools.ffmpeg_path, &mut config.tools.ffprobe_path]
        .into_iter()
        .flatten()
    {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        *path = PathBuf::from(expanded);
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.transcode.min_length_ms == 0 {
        anyhow::bail!("transcode.min_length_ms must be greater than 0");
    }

    if config.transcode.threads == Some(0) {
        anyhow::bail!("transcode.threads cannot be 0");
    }

    if let Some(ref flags) = config.dlna.flags {
        if flags.len() != 32 || !flags.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("dlna.flags must be 32 hexadecimal digits, got {:?}", flags);
        }
    }

    if let Some(ref command) = config.transcode.custom_command {
        let options = config.transcode_settings().tokenizer;
        let argv = parse_command_line_with(command, options)
            .context("Invalid transcode.custom_command")?;
        if argv.is_empty() {
            anyhow::bail!("transcode.custom_command is empty");
        }
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforged_av::PlannerPolicy;
    use std::time::Duration;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate_config(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.transcode.policy, PlannerPolicy::Permissive);
        assert_eq!(config.transcode.min_length_ms, 100);
        assert!(!config.tokenizer.escape_first_char);
        assert!(config.dlna.flags.is_none());

        let settings = config.transcode_settings();
        assert_eq!(settings.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(settings.min_length, Duration::from_millis(100));
        assert!(settings.threads > 0);
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [transcode]
            policy = "strict"
            threads = 2
            min_length_ms = 250
            custom_command = "encoder -i {input} -"

            [tokenizer]
            escape_first_char = true

            [dlna]
            flags = "81700000000000000000000000000000"
            "#,
        )
        .unwrap();

        let settings = config.transcode_settings();
        assert_eq!(settings.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(settings.threads, 2);
        assert_eq!(settings.min_length, Duration::from_millis(250));
        assert_eq!(settings.policy, PlannerPolicy::Strict);
        assert!(settings.tokenizer.escape_first_char);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse("[transcode]\nmin_length_ms = 0").is_err());
        assert!(parse("[transcode]\nthreads = 0").is_err());
        assert!(parse("[transcode]\npolicy = \"lenient\"").is_err());
        assert!(parse("[transcode]\ncustom_command = \"enc 'oops\"").is_err());
        assert!(parse("[dlna]\nflags = \"xyz\"").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castforged.toml");
        std::fs::write(&path, "[transcode]\npolicy = \"strict\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.transcode.policy, PlannerPolicy::Strict);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_config(Path::new("/nonexistent/castforged.toml")).is_err());
    }
}
