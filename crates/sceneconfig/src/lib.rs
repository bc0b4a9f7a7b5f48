use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const TITLE_FONT_URL: &str =
    "https://github.com/google/fonts/raw/main/ofl/fjallaone/FjallaOne-Regular.ttf";
pub const SUBTITLE_FONT_URL: &str =
    "https://github.com/google/fonts/raw/main/ofl/tangerine/Tangerine-Bold.ttf";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_subtitle")]
    pub subtitle: String,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(
        default = "default_font_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub font_timeout: Duration,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub responsive: ResponsiveConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontsConfig {
    #[serde(default = "default_title_font")]
    pub title: FontEntry,
    #[serde(default = "default_subtitle_font")]
    pub subtitle: FontEntry,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            title: default_title_font(),
            subtitle: default_subtitle_font(),
        }
    }
}

/// A font family and where to fetch it from (local path or `http(s)://` URL).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontEntry {
    pub family: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EffectsConfig {
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_grain")]
    pub grain: f32,
    #[serde(default = "default_stripes")]
    pub stripes: u32,
    #[serde(default = "default_stripe_duty")]
    pub stripe_duty: f32,
    #[serde(default = "default_aperture")]
    pub aperture: bool,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            grain: default_grain(),
            stripes: default_stripes(),
            stripe_duty: default_stripe_duty(),
            aperture: default_aperture(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResponsiveConfig {
    #[serde(default = "default_breakpoint")]
    pub breakpoint: u32,
    #[serde(default = "default_wide")]
    pub wide: ProfileConfig,
    #[serde(default = "default_narrow")]
    pub narrow: ProfileConfig,
}

impl Default for ResponsiveConfig {
    fn default() -> Self {
        Self {
            breakpoint: default_breakpoint(),
            wide: default_wide(),
            narrow: default_narrow(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub radius: f32,
    pub title_size: f32,
    pub subtitle_size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AnimationConfig {
    #[serde(default = "default_len")]
    pub len: f32,
    #[serde(default = "default_len_step")]
    pub len_step: f32,
    #[serde(default = "default_active_amplitude")]
    pub active_amplitude: f32,
    #[serde(default)]
    pub fps: Option<f32>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            len: default_len(),
            len_step: default_len_step(),
            active_amplitude: default_active_amplitude(),
            fps: None,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            title: default_title(),
            subtitle: default_subtitle(),
            background: default_background(),
            text_color: default_text_color(),
            font_timeout: default_font_timeout(),
            fonts: FontsConfig::default(),
            effects: EffectsConfig::default(),
            responsive: ResponsiveConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_title() -> String {
    "LINES".to_string()
}

fn default_subtitle() -> String {
    "and a little grain".to_string()
}

fn default_background() -> String {
    "#9cbfa1".to_string()
}

fn default_text_color() -> String {
    "#e9e9e9".to_string()
}

fn default_font_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_title_font() -> FontEntry {
    FontEntry {
        family: "Fjalla One".to_string(),
        source: TITLE_FONT_URL.to_string(),
    }
}

fn default_subtitle_font() -> FontEntry {
    FontEntry {
        family: "Tangerine".to_string(),
        source: SUBTITLE_FONT_URL.to_string(),
    }
}

fn default_margin() -> f32 {
    0.10
}

fn default_grain() -> f32 {
    0.06
}

fn default_stripes() -> u32 {
    40
}

fn default_stripe_duty() -> f32 {
    0.57
}

fn default_aperture() -> bool {
    true
}

fn default_breakpoint() -> u32 {
    768
}

fn default_wide() -> ProfileConfig {
    ProfileConfig {
        radius: 0.315,
        title_size: 64.0,
        subtitle_size: 62.0,
    }
}

fn default_narrow() -> ProfileConfig {
    ProfileConfig {
        radius: 0.42,
        title_size: 28.0,
        subtitle_size: 30.0,
    }
}

fn default_len() -> f32 {
    1.0
}

fn default_len_step() -> f32 {
    0.05
}

fn default_active_amplitude() -> f32 {
    1.0
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("duration {v} is out of range: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        for (slot, entry) in [("title", &self.fonts.title), ("subtitle", &self.fonts.subtitle)] {
            if entry.family.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "fonts.{slot}.family must not be empty"
                )));
            }
            if entry.source.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "fonts.{slot}.source must not be empty"
                )));
            }
        }

        if self.font_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "font_timeout must be greater than zero".into(),
            ));
        }

        let effects = &self.effects;
        if !(0.0..0.5).contains(&effects.margin) {
            return Err(ConfigError::Invalid(format!(
                "effects.margin must be within [0, 0.5), got {}",
                effects.margin
            )));
        }
        if !(0.0..=1.0).contains(&effects.grain) {
            return Err(ConfigError::Invalid(format!(
                "effects.grain must be within [0, 1], got {}",
                effects.grain
            )));
        }
        if effects.stripes == 0 {
            return Err(ConfigError::Invalid(
                "effects.stripes must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&effects.stripe_duty) {
            return Err(ConfigError::Invalid(format!(
                "effects.stripe_duty must be within [0, 1], got {}",
                effects.stripe_duty
            )));
        }

        if self.responsive.breakpoint == 0 {
            return Err(ConfigError::Invalid(
                "responsive.breakpoint must be greater than zero".into(),
            ));
        }
        for (name, profile) in [
            ("wide", &self.responsive.wide),
            ("narrow", &self.responsive.narrow),
        ] {
            if profile.radius <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "responsive.{name}.radius must be positive"
                )));
            }
            if profile.title_size <= 0.0 || profile.subtitle_size <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "responsive.{name} font sizes must be positive"
                )));
            }
        }

        let animation = &self.animation;
        if !(0.45..=1.0).contains(&animation.len) {
            return Err(ConfigError::Invalid(format!(
                "animation.len must be within [0.45, 1], got {}",
                animation.len
            )));
        }
        if animation.len_step <= 0.0 {
            return Err(ConfigError::Invalid(
                "animation.len_step must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&animation.active_amplitude) {
            return Err(ConfigError::Invalid(format!(
                "animation.active_amplitude must be within [0, 1], got {}",
                animation.active_amplitude
            )));
        }
        if let Some(fps) = animation.fps {
            if fps < 0.0 {
                return Err(ConfigError::Invalid("animation.fps must be >= 0".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
title = "Fieldnotes"
subtitle = "volume two"
background = "#203040"
font_timeout = "2s 500ms"

[fonts.title]
family = "Inter"
source = "/usr/share/fonts/inter.ttf"

[effects]
margin = 0.15
stripes = 42

[responsive]
breakpoint = 1024

[responsive.narrow]
radius = 0.5
title_size = 24
subtitle_size = 20

[animation]
len = 0.75
fps = 30
"##;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.title, "Fieldnotes");
        assert_eq!(config.font_timeout, Duration::from_millis(2500));
        assert_eq!(config.fonts.title.family, "Inter");
        assert_eq!(config.fonts.subtitle.family, "Tangerine");
        assert_eq!(config.effects.stripes, 42);
        assert!((config.effects.grain - 0.06).abs() < f32::EPSILON);
        assert_eq!(config.responsive.breakpoint, 1024);
        assert_eq!(config.responsive.wide, default_wide());
        assert!((config.responsive.narrow.radius - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.animation.fps, Some(30.0));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = SceneConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn numeric_timeout_is_seconds() {
        let config = SceneConfig::from_toml_str("font_timeout = 3").unwrap();
        assert_eq!(config.font_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_unrepresentable_timeout() {
        for input in ["font_timeout = 1e30", "font_timeout = inf"] {
            let err = SceneConfig::from_toml_str(input).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{input}: {err}");
        }
    }

    #[test]
    fn rejects_out_of_range_len() {
        let err = SceneConfig::from_toml_str("[animation]\nlen = 0.2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_stripes() {
        let err = SceneConfig::from_toml_str("[effects]\nstripes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = SceneConfig::from_toml_str("version = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn default_config_survives_serialization() {
        let rendered = SceneConfig::default().to_toml_string().unwrap();
        let parsed = SceneConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, SceneConfig::default());
    }
}
