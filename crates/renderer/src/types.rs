use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use fontload::FontDescriptor;

use crate::color::Color;
use crate::runtime::RenderPolicy;

/// Pixel dimensions of the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `width / height`, or `None` when either side is zero.
    pub fn aspect(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Aperture radius and font sizes used on one side of the breakpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsiveProfile {
    pub radius: f32,
    pub title_size: f32,
    pub subtitle_size: f32,
}

/// Viewports strictly wider than `breakpoint` use the wide profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Responsive {
    pub breakpoint: u32,
    pub wide: ResponsiveProfile,
    pub narrow: ResponsiveProfile,
}

impl Responsive {
    pub fn is_wide(&self, width: u32) -> bool {
        width > self.breakpoint
    }

    pub fn profile(&self, width: u32) -> ResponsiveProfile {
        if self.is_wide(width) {
            self.wide
        } else {
            self.narrow
        }
    }
}

impl Default for Responsive {
    fn default() -> Self {
        Self {
            breakpoint: 768,
            wide: ResponsiveProfile {
                radius: 0.315,
                title_size: 64.0,
                subtitle_size: 62.0,
            },
            narrow: ResponsiveProfile {
                radius: 0.42,
                title_size: 28.0,
                subtitle_size: 30.0,
            },
        }
    }
}

/// Constants shared by the Base and Lines stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSettings {
    pub margin: f32,
    pub grain: f32,
    pub stripes: f32,
    pub stripe_duty: f32,
    pub aperture: bool,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            margin: 0.10,
            grain: 0.06,
            stripes: 40.0,
            stripe_duty: 0.57,
            aperture: true,
        }
    }
}

/// Strings and families drawn by the text layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSettings {
    pub title: String,
    pub subtitle: String,
    pub title_family: String,
    pub subtitle_family: String,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            title: "LINES".into(),
            subtitle: "and a little grain".into(),
            title_family: "Fjalla One".into(),
            subtitle_family: "Tangerine".into(),
        }
    }
}

/// Everything the compositor needs to build and drive the render tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    pub background: Color,
    pub text_color: Color,
    pub text: TextSettings,
    pub effects: EffectSettings,
    pub responsive: Responsive,
    /// Amplitude applied while a key is held.
    pub active_amplitude: f32,
    /// Slider increment applied by the arrow keys.
    pub len_step: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            background: Color::from_rgb8(0x9c, 0xbf, 0xa1),
            text_color: Color::from_rgb8(0xe9, 0xe9, 0xe9),
            text: TextSettings::default(),
            effects: EffectSettings::default(),
            responsive: Responsive::default(),
            active_amplitude: 1.0,
            len_step: 0.05,
        }
    }
}

/// Where the title and subtitle fonts come from and how long to wait for them.
#[derive(Debug, Clone)]
pub struct FontPlan {
    pub title: FontDescriptor,
    pub subtitle: FontDescriptor,
    pub cache_dir: Option<PathBuf>,
    pub cache_only: bool,
    pub timeout: Option<Duration>,
}

impl FontPlan {
    pub fn descriptors(&self) -> Vec<FontDescriptor> {
        vec![self.title.clone(), self.subtitle.clone()]
    }
}

/// How the renderer should present frames.
///
/// * `Windowed` opens a `winit` window and animates until it is closed.
/// * `Export` renders a single frame on the CPU and writes it to disk, which
///   works without a display or GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Windowed,
    Export,
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the scene file after both have been
/// validated and merged.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window or export size in physical pixels.
    pub surface_size: (u32, u32),
    /// Presentation mode (interactive window vs still export).
    pub mode: RenderMode,
    /// Frame pacing and time source behaviour.
    pub policy: RenderPolicy,
    /// Scene content and effect constants.
    pub scene: SceneSettings,
    /// Font sources for the text layer.
    pub fonts: FontPlan,
    /// Initial amplitude before any key input.
    pub amplitude: f32,
    /// Initial slider position.
    pub len: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_guards_zero_dimensions() {
        assert_eq!(ViewportSize::new(1024, 0).aspect(), None);
        assert_eq!(ViewportSize::new(0, 768).aspect(), None);
        let aspect = ViewportSize::new(1024, 768).aspect().unwrap();
        assert!((aspect - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn breakpoint_is_exclusive() {
        let responsive = Responsive::default();
        assert!(responsive.is_wide(1024));
        assert!(!responsive.is_wide(768));
        assert_eq!(responsive.profile(600).radius, 0.42);
        assert_eq!(responsive.profile(769).title_size, 64.0);
    }
}
