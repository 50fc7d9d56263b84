use super::models::PrompterConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parse sectioned TOML into a flat config. Missing tables and keys take
/// their defaults.
pub fn parse_config(contents: &str) -> Result<PrompterConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Invalid config TOML")?;
    Ok(PrompterConfig::from(tables))
}

pub fn serialize_config(config: &PrompterConfig) -> Result<String> {
    toml::to_string_pretty(&ConfigTables::from(config)).context("Failed to serialize config")
}

/// Load config from `path`, falling back to defaults on any failure so the
/// prompter can always start.
pub fn load_config(path: &Path) -> PrompterConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return PrompterConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config; using defaults: {err:#}");
            PrompterConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FollowStrategy, LogLevel};

    #[test]
    fn partial_tables_fill_in_defaults() {
        let cfg = parse_config(
            r#"
            [scroll]
            base_velocity = 40.0

            [recognition]
            follow_strategy = "transcript"
            language = "fr-FR"

            [logging]
            log_level = "warn"
            "#,
        )
        .expect("valid toml");
        assert_eq!(cfg.base_velocity, 40.0);
        assert_eq!(cfg.autoplay_speed_factor, 1.5);
        assert_eq!(cfg.follow_strategy, FollowStrategy::Transcript);
        assert_eq!(cfg.language, "fr-FR");
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert_eq!(cfg.lookahead_tokens, 30);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = PrompterConfig::default();
        cfg.max_multiplier = 2.0;
        cfg.silence_timeout_ms = 900;
        let text = serialize_config(&cfg).expect("serialize");
        assert!(text.contains("[voice]"));
        assert_eq!(parse_config(&text).expect("parse"), cfg);
    }

    #[test]
    fn invalid_values_are_rejected_and_missing_file_falls_back() {
        assert!(parse_config("[scroll]\nbase_velocity = \"fast\"").is_err());
        let cfg = load_config(Path::new("/nonexistent/prompter/config.toml"));
        assert_eq!(cfg, PrompterConfig::default());
    }
}
