use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontload::{FontDescriptor, FontSource};
use renderer::{
    parse_color, EffectSettings, FontPlan, RenderMode, RenderPolicy, Renderer, RendererConfig,
    Responsive, ResponsiveProfile, SceneSettings, TextSettings,
};
use sceneconfig::{FontEntry, ProfileConfig, SceneConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{parse_surface_size, Cli, Command, ConfigAction, RunArgs};
use crate::paths::AppPaths;

const DEFAULT_SIZE: (u32, u32) = (1024, 768);

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    debug!(
        config = %paths.config_dir().display(),
        cache = %paths.cache_dir().display(),
        "resolved titlecard paths"
    );
    match cli.command {
        Some(Command::Config(command)) => run_config_command(command.action, &paths),
        None => {
            let config = prepare_run(&cli.run, &paths)?;
            Renderer::new(config).run()
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is reserved for `config` subcommand output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config_command(action: ConfigAction, paths: &AppPaths) -> Result<()> {
    match action {
        ConfigAction::Where => {
            println!("config dir: {}", paths.config_dir().display());
            println!("config file: {}", paths.config_file().display());
            println!("cache dir: {}", paths.cache_dir().display());
            println!("font cache: {}", paths.font_cache_dir().display());
        }
        ConfigAction::Default => {
            let rendered = SceneConfig::default()
                .to_toml_string()
                .context("failed to render default scene")?;
            print!("{rendered}");
        }
    }
    Ok(())
}

/// Loads the scene file, applies CLI overrides and builds the renderer
/// configuration.
pub fn prepare_run(args: &RunArgs, paths: &AppPaths) -> Result<RendererConfig> {
    let mut scene = load_scene(args, paths)?;
    apply_overrides(&mut scene, args);
    scene
        .validate()
        .context("scene is invalid after applying command-line overrides")?;
    renderer_config(&scene, args, paths)
}

fn load_scene(args: &RunArgs, paths: &AppPaths) -> Result<SceneConfig> {
    if let Some(path) = args.config.as_deref() {
        return read_scene(path);
    }
    let default_path = paths.config_file();
    if default_path.is_file() {
        return read_scene(&default_path);
    }
    debug!(path = %default_path.display(), "no scene file; using defaults");
    Ok(SceneConfig::default())
}

fn read_scene(path: &Path) -> Result<SceneConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file {}", path.display()))?;
    let scene = SceneConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load scene file {}", path.display()))?;
    info!(path = %path.display(), "loaded scene file");
    Ok(scene)
}

fn apply_overrides(scene: &mut SceneConfig, args: &RunArgs) {
    if let Some(title) = &args.title {
        scene.title = title.clone();
    }
    if let Some(subtitle) = &args.subtitle {
        scene.subtitle = subtitle.clone();
    }
    if let Some(background) = &args.background {
        scene.background = background.clone();
    }
    if let Some(text_color) = &args.text_color {
        scene.text_color = text_color.clone();
    }
    if let Some(fps) = args.fps {
        scene.animation.fps = Some(fps);
    }
    if let Some(len) = args.len {
        scene.animation.len = len;
    }
}

fn renderer_config(scene: &SceneConfig, args: &RunArgs, paths: &AppPaths) -> Result<RendererConfig> {
    let background = parse_color(&scene.background)
        .with_context(|| format!("invalid background color '{}'", scene.background))?;
    let text_color = parse_color(&scene.text_color)
        .with_context(|| format!("invalid text color '{}'", scene.text_color))?;
    let surface_size = match args.size.as_deref() {
        Some(value) => parse_surface_size(value).map_err(|err| anyhow!(err))?,
        None => DEFAULT_SIZE,
    };
    let amplitude = args.amplitude.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&amplitude) {
        return Err(anyhow!("--amplitude must be within [0, 1], got {amplitude}"));
    }

    let effects = &scene.effects;
    let settings = SceneSettings {
        background,
        text_color,
        text: TextSettings {
            title: scene.title.clone(),
            subtitle: scene.subtitle.clone(),
            title_family: scene.fonts.title.family.clone(),
            subtitle_family: scene.fonts.subtitle.family.clone(),
        },
        effects: EffectSettings {
            margin: effects.margin,
            grain: effects.grain,
            stripes: effects.stripes as f32,
            stripe_duty: effects.stripe_duty,
            aperture: effects.aperture,
        },
        responsive: Responsive {
            breakpoint: scene.responsive.breakpoint,
            wide: profile(&scene.responsive.wide),
            narrow: profile(&scene.responsive.narrow),
        },
        active_amplitude: scene.animation.active_amplitude,
        len_step: scene.animation.len_step,
    };

    let fonts = FontPlan {
        title: descriptor(&scene.fonts.title),
        subtitle: descriptor(&scene.fonts.subtitle),
        cache_dir: Some(paths.font_cache_dir()),
        cache_only: args.cache_only,
        timeout: Some(scene.font_timeout),
    };
    if args.cache_only {
        info!("remote font fetch disabled (--cache-only)");
    }

    let (mode, policy) = match &args.export {
        Some(path) => (
            RenderMode::Export,
            RenderPolicy::Export {
                time: args.time,
                path: path.clone(),
            },
        ),
        None => (
            RenderMode::Windowed,
            RenderPolicy::Animate {
                target_fps: scene.animation.fps.filter(|fps| *fps > 0.0),
            },
        ),
    };

    Ok(RendererConfig {
        surface_size,
        mode,
        policy,
        scene: settings,
        fonts,
        amplitude,
        len: scene.animation.len,
    })
}

fn profile(config: &ProfileConfig) -> ResponsiveProfile {
    ResponsiveProfile {
        radius: config.radius,
        title_size: config.title_size,
        subtitle_size: config.subtitle_size,
    }
}

fn descriptor(entry: &FontEntry) -> FontDescriptor {
    FontDescriptor::new(entry.family.clone(), FontSource::parse(&entry.source))
}
