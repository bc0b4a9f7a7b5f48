use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use sceneconfig::SceneConfig;
use tempfile::TempDir;

fn titlecard(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_titlecard"))
        .env("TITLECARD_CONFIG_DIR", root.join("config"))
        .env("TITLECARD_CACHE_DIR", root.join("cache"))
        .env_remove("TITLECARD_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run titlecard")
}

fn offline_scene(root: &Path) -> std::path::PathBuf {
    let scene = format!(
        r#"font_timeout = "2s"

[fonts.title]
family = "cli-test-title"
source = "{missing}"

[fonts.subtitle]
family = "cli-test-subtitle"
source = "{missing}"
"#,
        missing = root.join("missing.ttf").display()
    );
    let path = root.join("scene.toml");
    fs::write(&path, scene).unwrap();
    path
}

#[test]
fn config_default_prints_a_loadable_scene() {
    let root = TempDir::new().unwrap();
    let output = titlecard(root.path(), &["config", "default"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let scene = SceneConfig::from_toml_str(&stdout).unwrap();
    assert_eq!(scene, SceneConfig::default());
}

#[test]
fn config_where_reports_overridden_dirs() {
    let root = TempDir::new().unwrap();
    let output = titlecard(root.path(), &["config", "where"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&root.path().join("config/titlecard.toml").display().to_string()));
    assert!(stdout.contains(&root.path().join("cache/fonts").display().to_string()));
}

#[test]
fn export_without_fonts_still_writes_background_frame() {
    let root = TempDir::new().unwrap();
    let scene = offline_scene(root.path());
    let out = root.path().join("frames/still.png");

    let output = titlecard(
        root.path(),
        &[
            "--config",
            scene.to_str().unwrap(),
            "--cache-only",
            "--size",
            "64x48",
            "--export",
            out.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let image = image::open(&out).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (64, 48));
}

#[test]
fn invalid_color_fails_before_rendering() {
    let root = TempDir::new().unwrap();
    let out = root.path().join("never.png");
    let output = titlecard(
        root.path(),
        &["--background", "#12", "--export", out.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid background color"));
    assert!(!out.exists());
}
