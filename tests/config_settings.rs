// tests/config_settings.rs

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use watchrun::cli::CliArgs;
use watchrun::config::validate::normalize_extensions;
use watchrun::config::{RawConfigFile, Settings, SettingsSources, load_settings};
use watchrun::errors::WatchrunError;
use watchrun_test_utils::builders::CliArgsBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn cwd() -> PathBuf {
    PathBuf::from("/work")
}

fn resolve(cli: &CliArgs, file: Option<RawConfigFile>) -> Result<Settings, WatchrunError> {
    Settings::try_from(SettingsSources {
        cli,
        file: file.map(|f| (f, PathBuf::from("/conf"))),
        cwd: cwd(),
    })
}

fn tempdir() -> std::io::Result<tempfile::TempDir> {
    tempfile::Builder::new().prefix("watchrun").tempdir()
}

#[test]
fn defaults_apply_when_only_run_cmd_is_given() -> TestResult {
    let cli = CliArgsBuilder::new().run_cmd("./app").build();

    let settings = resolve(&cli, None)?;

    assert_eq!(settings.run_cmd, "./app");
    assert_eq!(settings.init_cmd, None);
    assert_eq!(settings.prep_cmd, None);
    assert_eq!(settings.extensions, vec![".go", ".mod"]);
    assert_eq!(settings.paths, vec![cwd()]);
    Ok(())
}

#[test]
fn missing_run_cmd_is_config_error() {
    let cli = CliArgsBuilder::new().prep_cmd("make").build();

    match resolve(&cli, None) {
        Err(WatchrunError::Config(msg)) => assert!(msg.contains("--run-cmd")),
        other => panic!("expected Config error, got {other:?}"),
    }

    // A blank value is as good as none.
    let cli = CliArgsBuilder::new().run_cmd("   ").build();
    assert!(matches!(resolve(&cli, None), Err(WatchrunError::Config(_))));
}

#[test]
fn cli_values_override_the_config_file() -> TestResult {
    let cli = CliArgsBuilder::new()
        .run_cmd("./cli-app")
        .extensions(&[".rs"])
        .path("/src")
        .build();
    let file = RawConfigFile {
        init_cmd: Some("echo hi".into()),
        prep_cmd: Some("make".into()),
        run_cmd: Some("./file-app".into()),
        file_extensions: Some(vec![".go".into()]),
        paths: vec![PathBuf::from("pkg")],
    };

    let settings = resolve(&cli, Some(file))?;

    assert_eq!(settings.run_cmd, "./cli-app");
    assert_eq!(settings.init_cmd.as_deref(), Some("echo hi"));
    assert_eq!(settings.prep_cmd.as_deref(), Some("make"));
    assert_eq!(settings.extensions, vec![".rs"]);
    assert_eq!(settings.paths, vec![PathBuf::from("/src")]);
    Ok(())
}

#[test]
fn file_paths_resolve_against_the_config_directory() -> TestResult {
    let cli = CliArgsBuilder::new().prep_cmd("  ").build();
    let file = RawConfigFile {
        prep_cmd: Some("make".into()),
        run_cmd: Some("./app".into()),
        paths: vec![PathBuf::from("cmd"), PathBuf::from("/abs")],
        ..Default::default()
    };

    let settings = resolve(&cli, Some(file))?;

    assert_eq!(settings.prep_cmd.as_deref(), Some("make"));
    assert_eq!(
        settings.paths,
        vec![PathBuf::from("/conf/cmd"), PathBuf::from("/abs")]
    );
    Ok(())
}

#[test]
fn empty_extension_list_allows_everything() -> TestResult {
    let cli = CliArgsBuilder::new().run_cmd("./app").extensions(&[""]).build();

    let settings = resolve(&cli, None)?;

    assert!(settings.extensions.is_empty());
    Ok(())
}

#[test]
fn extensions_are_trimmed_and_deduplicated() {
    let raw: Vec<String> = [" .go", ".go", "", ".mod ", ".GO"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    assert_eq!(normalize_extensions(&raw), vec![".go", ".mod", ".GO"]);
}

#[test]
fn cli_parses_flags_and_paths() -> TestResult {
    let cli = CliArgs::try_parse_from([
        "watchrun",
        "--init-cmd=echo start",
        "--prep-cmd",
        "go build -o app .",
        "--run-cmd=./app",
        "--file-extensions=.go,.mod,.tmpl",
        "--dry-run",
        "./cmd",
        "./internal",
    ])?;

    assert_eq!(cli.init_cmd.as_deref(), Some("echo start"));
    assert_eq!(cli.prep_cmd.as_deref(), Some("go build -o app ."));
    assert_eq!(cli.run_cmd.as_deref(), Some("./app"));
    assert_eq!(
        cli.file_extensions,
        Some(vec![".go".to_string(), ".mod".to_string(), ".tmpl".to_string()])
    );
    assert!(cli.dry_run);
    assert_eq!(
        cli.paths,
        vec![PathBuf::from("./cmd"), PathBuf::from("./internal")]
    );
    Ok(())
}

#[test]
fn default_config_file_is_picked_up() -> TestResult {
    let dir = tempdir()?;
    std::fs::write(
        dir.path().join("Watchrun.toml"),
        r#"
prep_cmd = "make"
run_cmd = "./server"
file_extensions = [".c", ".h"]
paths = ["src"]
"#,
    )?;

    let settings = load_settings(&CliArgs::default(), dir.path())?;

    assert_eq!(settings.prep_cmd.as_deref(), Some("make"));
    assert_eq!(settings.run_cmd, "./server");
    assert_eq!(settings.extensions, vec![".c", ".h"]);
    assert_eq!(settings.paths, vec![dir.path().join("src")]);
    Ok(())
}

#[test]
fn explicit_config_in_subdirectory() -> TestResult {
    let dir = tempdir()?;
    std::fs::create_dir(dir.path().join("conf"))?;
    std::fs::write(
        dir.path().join("conf/dev.toml"),
        "run_cmd = \"./app\"\npaths = [\"../src\"]\n",
    )?;

    let cli = CliArgsBuilder::new().config("conf/dev.toml").build();
    let settings = load_settings(&cli, dir.path())?;

    assert_eq!(settings.run_cmd, "./app");
    assert_eq!(settings.paths, vec![dir.path().join("conf").join("../src")]);
    Ok(())
}

#[test]
fn missing_explicit_config_is_path_error() -> TestResult {
    let dir = tempdir()?;
    let cli = CliArgsBuilder::new()
        .run_cmd("./app")
        .config("nope.toml")
        .build();

    assert!(matches!(
        load_settings(&cli, dir.path()),
        Err(WatchrunError::Path { .. })
    ));
    Ok(())
}

#[test]
fn unknown_config_keys_are_rejected() -> TestResult {
    let dir = tempdir()?;
    std::fs::write(
        dir.path().join("Watchrun.toml"),
        "run_cmd = \"./app\"\nrestart_delay = 3\n",
    )?;

    assert!(matches!(
        load_settings(&CliArgs::default(), dir.path()),
        Err(WatchrunError::Toml(_))
    ));
    Ok(())
}

#[test]
fn log_filter_prefers_the_flag_over_the_environment() {
    use watchrun::cli::LogLevel;
    use watchrun::logging::filter_directives;

    assert_eq!(filter_directives(Some(LogLevel::Debug), Some("trace")), "debug");
    assert_eq!(
        filter_directives(None, Some(" watchrun::engine=trace,warn ")),
        "watchrun::engine=trace,warn"
    );
    assert_eq!(filter_directives(None, Some("  ")), "info");
    assert_eq!(filter_directives(None, None), "info");
}
