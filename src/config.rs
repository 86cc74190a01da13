//! Configuration types for editing parameters and the removal service client

use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default removal service endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/api/remove-background";

/// Environment variable overriding the removal service endpoint
pub const ENDPOINT_ENV_VAR: &str = "BGREMOVE_STUDIO_ENDPOINT";

/// Color value meaning "keep the removed background transparent"
pub const TRANSPARENT: &str = "transparent";

/// Solid background colors offered by the tools panel
pub const SOLID_COLOR_PRESETS: &[&str] = &[
    TRANSPARENT,
    "#FFFFFF",
    "#000000",
    "#FF0000",
    "#00FF00",
    "#0000FF",
    "#FFFF00",
    "#00FFFF",
    "#FF00FF",
];

/// A named gradient background preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientPreset {
    pub name: &'static str,
    pub expression: &'static str,
}

/// Gradient backgrounds offered by the tools panel
pub const GRADIENT_PRESETS: &[GradientPreset] = &[
    GradientPreset {
        name: "Blue to Purple",
        expression: "linear-gradient(45deg, #2196F3 30%, #9C27B0 90%)",
    },
    GradientPreset {
        name: "Green to Yellow",
        expression: "linear-gradient(45deg, #4CAF50 30%, #FFEB3B 90%)",
    },
    GradientPreset {
        name: "Orange to Red",
        expression: "linear-gradient(45deg, #FF9800 30%, #F44336 90%)",
    },
];

/// Valid range for shadow blur radius
pub const SHADOW_BLUR_RANGE: (u32, u32) = (0, 50);
/// Valid range for shadow offsets on either axis
pub const SHADOW_OFFSET_RANGE: (i32, i32) = (-50, 50);
/// Valid range for brightness and contrast
pub const TONE_RANGE: (f32, f32) = (0.1, 3.0);
/// Valid range for saturation
pub const SATURATION_RANGE: (f32, f32) = (0.0, 3.0);

/// Background composited behind the cut-out subject by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    /// Solid color as a hex string, or `transparent`
    Color { value: String },
    /// CSS gradient expression
    Gradient { expression: String },
    /// Custom uploaded image; only its name survives serialization
    Image {
        name: String,
        #[serde(skip)]
        bytes: Arc<Vec<u8>>,
    },
}

impl Default for Background {
    fn default() -> Self {
        Self::transparent()
    }
}

impl Background {
    #[must_use]
    pub fn transparent() -> Self {
        Self::Color {
            value: TRANSPARENT.to_string(),
        }
    }

    pub fn color<S: Into<String>>(value: S) -> Self {
        Self::Color {
            value: value.into(),
        }
    }

    pub fn gradient<S: Into<String>>(expression: S) -> Self {
        Self::Gradient {
            expression: expression.into(),
        }
    }

    pub fn image<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self::Image {
            name: name.into(),
            bytes: Arc::new(bytes),
        }
    }

    /// Wire name of the background kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Color { .. } => "color",
            Self::Gradient { .. } => "gradient",
            Self::Image { .. } => "image",
        }
    }

    /// Wire value: color, gradient expression or image file name
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Color { value } => value,
            Self::Gradient { expression } => expression,
            Self::Image { name, .. } => name,
        }
    }

    /// Validate the background selection
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Color { value } => {
                if value.eq_ignore_ascii_case(TRANSPARENT) || is_hex_color(value) {
                    Ok(())
                } else {
                    Err(StudioError::invalid_config(format!(
                        "Background color must be a hex color or '{}', got '{}'",
                        TRANSPARENT, value
                    )))
                }
            },
            Self::Gradient { expression } => {
                let trimmed = expression.trim();
                if trimmed.contains("gradient(") && trimmed.ends_with(')') {
                    Ok(())
                } else {
                    Err(StudioError::invalid_config(format!(
                        "Background gradient must be a CSS gradient expression, got '{}'",
                        expression
                    )))
                }
            },
            Self::Image { name, .. } => {
                if name.trim().is_empty() {
                    Err(StudioError::invalid_config(
                        "Background image must have a file name",
                    ))
                } else {
                    Ok(())
                }
            },
        }
    }
}

/// Check `#RGB`, `#RRGGBB` and `#RRGGBBAA` hex colors
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').is_some_and(|digits| {
        matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Drop shadow rendered under the subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowParams {
    pub blur: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub color: String,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            blur: 0,
            offset_x: 0,
            offset_y: 0,
            color: "#000000".to_string(),
        }
    }
}

impl ShadowParams {
    /// Whether the service would render a shadow at all
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.blur > 0 || self.offset_x != 0 || self.offset_y != 0
    }

    pub fn validate(&self) -> Result<()> {
        let (min_blur, max_blur) = SHADOW_BLUR_RANGE;
        if !(min_blur..=max_blur).contains(&self.blur) {
            return Err(StudioError::config_value_error(
                "shadow blur",
                self.blur,
                "0-50",
                Some(0),
            ));
        }

        let (min_offset, max_offset) = SHADOW_OFFSET_RANGE;
        for (axis, offset) in [("shadow offset x", self.offset_x), ("shadow offset y", self.offset_y)] {
            if !(min_offset..=max_offset).contains(&offset) {
                return Err(StudioError::config_value_error(axis, offset, "-50-50", Some(0)));
            }
        }

        if !is_hex_color(&self.color) {
            return Err(StudioError::invalid_config(format!(
                "Shadow color must be a hex color, got '{}'",
                self.color
            )));
        }

        Ok(())
    }
}

/// Color adjustments applied to the cut-out subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for AdjustmentParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl AdjustmentParams {
    /// Whether all adjustments are neutral
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        let (tone_min, tone_max) = TONE_RANGE;
        for (name, value) in [("brightness", self.brightness), ("contrast", self.contrast)] {
            if !value.is_finite() || !(tone_min..=tone_max).contains(&value) {
                return Err(StudioError::config_value_error(name, value, "0.1-3.0", Some(1.0)));
            }
        }

        let (sat_min, sat_max) = SATURATION_RANGE;
        if !self.saturation.is_finite() || !(sat_min..=sat_max).contains(&self.saturation) {
            return Err(StudioError::config_value_error(
                "saturation",
                self.saturation,
                "0.0-3.0",
                Some(1.0),
            ));
        }

        Ok(())
    }
}

/// Snap a slider value to the 0.1 step grid and clamp it to a range
#[must_use]
pub fn snap_to_step(value: f32, (min, max): (f32, f32)) -> f32 {
    if !value.is_finite() {
        return 1.0_f32.clamp(min, max);
    }
    ((value * 10.0).round() / 10.0).clamp(min, max)
}

/// Global editing parameters shared by every queued image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditingParams {
    pub background: Background,
    pub shadow: ShadowParams,
    pub adjustments: AdjustmentParams,
}

impl EditingParams {
    /// Create a new parameter builder
    ///
    /// Builder setters clamp numeric values to their valid range and snap
    /// adjustments to the 0.1 step used by the sliders.
    ///
    /// ```rust
    /// use bgremove_studio::config::{Background, EditingParams};
    ///
    /// let params = EditingParams::builder()
    ///     .background(Background::color("#FFFFFF"))
    ///     .shadow_blur(12)
    ///     .brightness(1.23)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(params.adjustments.brightness, 1.2);
    /// ```
    #[must_use]
    pub fn builder() -> EditingParamsBuilder {
        EditingParamsBuilder::default()
    }

    /// Validate all parameters
    pub fn validate(&self) -> Result<()> {
        self.background.validate()?;
        self.shadow.validate()?;
        self.adjustments.validate()?;
        Ok(())
    }

    /// Load a parameter preset from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| StudioError::file_io_error("read parameter preset", path_ref, &e))?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// Save the parameters as a JSON preset
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::services::ImageIOService::write_bytes(path, json.as_bytes())
    }

    /// Location of the user's default preset, if a config directory exists
    #[must_use]
    pub fn default_preset_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bgremove-studio").join("params.json"))
    }
}

/// Builder for `EditingParams`
#[derive(Debug, Default)]
pub struct EditingParamsBuilder {
    params: EditingParams,
}

impl EditingParamsBuilder {
    #[must_use]
    pub fn background(mut self, background: Background) -> Self {
        self.params.background = background;
        self
    }

    #[must_use]
    pub fn shadow_blur(mut self, blur: u32) -> Self {
        self.params.shadow.blur = blur.clamp(SHADOW_BLUR_RANGE.0, SHADOW_BLUR_RANGE.1);
        self
    }

    #[must_use]
    pub fn shadow_offset(mut self, x: i32, y: i32) -> Self {
        let (min, max) = SHADOW_OFFSET_RANGE;
        self.params.shadow.offset_x = x.clamp(min, max);
        self.params.shadow.offset_y = y.clamp(min, max);
        self
    }

    #[must_use]
    pub fn shadow_color<S: Into<String>>(mut self, color: S) -> Self {
        self.params.shadow.color = color.into();
        self
    }

    #[must_use]
    pub fn brightness(mut self, value: f32) -> Self {
        self.params.adjustments.brightness = snap_to_step(value, TONE_RANGE);
        self
    }

    #[must_use]
    pub fn contrast(mut self, value: f32) -> Self {
        self.params.adjustments.contrast = snap_to_step(value, TONE_RANGE);
        self
    }

    #[must_use]
    pub fn saturation(mut self, value: f32) -> Self {
        self.params.adjustments.saturation = snap_to_step(value, SATURATION_RANGE);
        self
    }

    /// Build and validate the parameters
    pub fn build(self) -> Result<EditingParams> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// Configuration of the removal service client and export naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Removal service endpoint receiving the multipart POST
    pub endpoint: String,

    /// Request timeout; `None` leaves timing to the transport
    pub timeout: Option<Duration>,

    /// Suffix appended to the original file stem on export
    pub output_suffix: String,

    /// Extension of exported images
    pub output_extension: String,

    /// File name of the bulk export archive
    pub archive_name: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            output_suffix: "_processed".to_string(),
            output_extension: "png".to_string(),
            archive_name: "processed_images.zip".to_string(),
        }
    }
}

impl StudioConfig {
    #[must_use]
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder::default()
    }

    /// Default configuration with the endpoint taken from the environment if set
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV_VAR) {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint.trim().to_string();
            }
        }
        config
    }

    /// Validate endpoint and naming settings
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            StudioError::invalid_config(format!("Invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StudioError::invalid_config(format!(
                "Endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(StudioError::invalid_config("Timeout must be greater than zero"));
        }

        if self.output_extension.trim().is_empty() || self.output_extension.contains('.') {
            return Err(StudioError::invalid_config(format!(
                "Output extension must be a bare extension like 'png', got '{}'",
                self.output_extension
            )));
        }

        if self.archive_name.trim().is_empty() {
            return Err(StudioError::invalid_config("Archive name must not be empty"));
        }

        Ok(())
    }
}

/// Builder for `StudioConfig`
#[derive(Debug, Default)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    #[must_use]
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn output_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn output_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.config.output_extension = extension.into();
        self
    }

    #[must_use]
    pub fn archive_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.archive_name = name.into();
        self
    }

    pub fn build(self) -> Result<StudioConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
