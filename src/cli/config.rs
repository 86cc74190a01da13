//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{
    Background, EditingParams, StudioConfig, GRADIENT_PRESETS, SHADOW_OFFSET_RANGE,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to service configuration and editing parameters
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the client configuration; the endpoint falls back to the default
    pub(crate) fn studio_config(cli: &Cli) -> Result<StudioConfig> {
        let mut builder = StudioConfig::builder();
        if let Some(endpoint) = &cli.endpoint {
            builder = builder.endpoint(endpoint.trim());
        }
        if let Some(seconds) = cli.timeout {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        Ok(builder.build()?)
    }

    /// Build editing parameters from a preset plus explicit flags
    ///
    /// The base is `--params` if given, else the user's default preset if it
    /// exists, else the built-in defaults. Flags override the base.
    pub(crate) fn editing_params(cli: &Cli) -> Result<EditingParams> {
        let base = match &cli.params {
            Some(path) => EditingParams::load(path)
                .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
            None => Self::user_preset().unwrap_or_default(),
        };

        let (base_x, base_y) = (base.shadow.offset_x, base.shadow.offset_y);
        let mut builder = EditingParams::builder()
            .background(base.background)
            .shadow_blur(base.shadow.blur)
            .shadow_offset(base.shadow.offset_x, base.shadow.offset_y)
            .shadow_color(base.shadow.color)
            .brightness(base.adjustments.brightness)
            .contrast(base.adjustments.contrast)
            .saturation(base.adjustments.saturation);

        if let Some(color) = &cli.background_color {
            builder = builder.background(Background::color(color.trim()));
        }
        if let Some(gradient) = &cli.gradient {
            builder = builder.background(Background::gradient(Self::resolve_gradient(gradient)));
        }
        if let Some(blur) = cli.shadow_blur {
            builder = builder.shadow_blur(blur);
        }
        if cli.shadow_offset_x.is_some() || cli.shadow_offset_y.is_some() {
            builder = builder.shadow_offset(
                cli.shadow_offset_x.unwrap_or(base_x),
                cli.shadow_offset_y.unwrap_or(base_y),
            );
        }
        if let Some(color) = &cli.shadow_color {
            builder = builder.shadow_color(color.trim());
        }
        if let Some(value) = cli.brightness {
            builder = builder.brightness(value);
        }
        if let Some(value) = cli.contrast {
            builder = builder.contrast(value);
        }
        if let Some(value) = cli.saturation {
            builder = builder.saturation(value);
        }

        Ok(builder.build()?)
    }

    /// Validate CLI arguments that the builders would otherwise silently clamp
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(blur) = cli.shadow_blur {
            if blur > 50 {
                anyhow::bail!("Shadow blur must be between 0 and 50, got {}", blur);
            }
        }

        let (min, max) = SHADOW_OFFSET_RANGE;
        for (name, offset) in [("x", cli.shadow_offset_x), ("y", cli.shadow_offset_y)] {
            if let Some(offset) = offset {
                if !(min..=max).contains(&offset) {
                    anyhow::bail!(
                        "Shadow offset {} must be between {} and {}, got {}",
                        name,
                        min,
                        max,
                        offset
                    );
                }
            }
        }

        for (name, value, low) in [
            ("Brightness", cli.brightness, 0.1),
            ("Contrast", cli.contrast, 0.1),
            ("Saturation", cli.saturation, 0.0),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || !(low..=3.0).contains(&value) {
                    anyhow::bail!("{} must be between {} and 3.0, got {}", name, low, value);
                }
            }
        }

        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern '{}'", pattern))?;
        }

        Ok(())
    }

    /// Map a preset name to its CSS expression, passing other input through
    pub(crate) fn resolve_gradient(input: &str) -> String {
        let trimmed = input.trim();
        GRADIENT_PRESETS
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(trimmed))
            .map_or_else(|| trimmed.to_string(), |preset| preset.expression.to_string())
    }

    fn user_preset() -> Option<EditingParams> {
        let path = EditingParams::default_preset_path()?;
        if !path.is_file() {
            return None;
        }
        match EditingParams::load(&path) {
            Ok(params) => {
                log::debug!("Using editing parameters from {}", path.display());
                Some(params)
            },
            Err(e) => {
                log::warn!("Ignoring preset {}: {}", path.display(), e);
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENDPOINT;
    use clap::Parser;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["bgremove-studio"];
        argv.extend_from_slice(args);
        argv.push("input.png");
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_studio_config_conversion() {
        let cli = parse(&["--endpoint", "https://bg.example.com/api/remove-background", "--timeout", "30"]);
        let config = CliConfigBuilder::studio_config(&cli).unwrap();
        assert_eq!(config.endpoint, "https://bg.example.com/api/remove-background");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));

        let mut cli = parse(&[]);
        cli.endpoint = None;
        let config = CliConfigBuilder::studio_config(&cli).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, None);

        let cli = parse(&["--endpoint", "nonsense"]);
        assert!(CliConfigBuilder::studio_config(&cli).is_err());
    }

    #[test]
    fn test_editing_params_from_flags() {
        let mut cli = parse(&[
            "--gradient",
            "green to yellow",
            "--shadow-blur",
            "12",
            "--shadow-offset-y",
            "-3",
            "--shadow-color",
            "#333333",
            "--brightness",
            "1.24",
        ]);
        cli.params = Some(std::path::PathBuf::from("/nonexistent/preset.json"));
        assert!(CliConfigBuilder::editing_params(&cli).is_err());

        let dir = tempdir().unwrap();
        let preset = dir.path().join("preset.json");
        EditingParams::builder()
            .shadow_offset(7, 7)
            .contrast(2.0)
            .build()
            .unwrap()
            .save(&preset)
            .unwrap();
        cli.params = Some(preset);

        let params = CliConfigBuilder::editing_params(&cli).unwrap();
        assert_eq!(params.background, Background::gradient(GRADIENT_PRESETS[1].expression));
        assert_eq!(params.shadow.blur, 12);
        assert_eq!(params.shadow.offset_x, 7);
        assert_eq!(params.shadow.offset_y, -3);
        assert_eq!(params.shadow.color, "#333333");
        assert!((params.adjustments.brightness - 1.2).abs() < 1e-6);
        assert!((params.adjustments.contrast - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_gradient() {
        assert_eq!(
            CliConfigBuilder::resolve_gradient("Orange to Red"),
            GRADIENT_PRESETS[2].expression
        );
        assert_eq!(
            CliConfigBuilder::resolve_gradient(" radial-gradient(#fff, #000) "),
            "radial-gradient(#fff, #000)"
        );
    }

    #[test]
    fn test_cli_validation() {
        assert!(CliConfigBuilder::validate_cli(&parse(&[])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--shadow-blur", "51"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--shadow-offset-x", "-60"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--saturation", "0"])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--contrast", "0"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--pattern", "["])).is_err());
    }

    #[test]
    fn test_invalid_background_color_rejected() {
        let cli = parse(&["--background-color", "blue"]);
        assert!(CliConfigBuilder::editing_params(&cli).is_err());
    }
}
