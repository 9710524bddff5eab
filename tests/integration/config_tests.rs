use dupescout::config::{Settings, ENV_PREFIX};
use dupescout::duplicates::get_results;
use dupescout::scanner::KeyStrategy;
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_settings_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Settings::default()));
    let settings: Settings = figment.extract().unwrap();

    assert!(settings.roots.is_empty());
    assert_eq!(settings.key, KeyStrategy::Partial);
    assert!(!settings.filters.include_hidden);
}

#[test]
fn test_settings_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
roots = ["/srv/photos", "/mnt/backup"]
workers = 6
key = "full"

[filters]
include_hidden = true
exclude_dirs = ["node_modules"]
include_exts = ["jpg"]
"#;
    fs::write(&config_path, toml_content).unwrap();

    let settings = Settings::from_figment(&Settings::figment(Some(&config_path))).unwrap();

    assert_eq!(
        settings.roots,
        vec![PathBuf::from("/srv/photos"), PathBuf::from("/mnt/backup")]
    );
    assert_eq!(settings.workers, 6);
    assert_eq!(settings.key, KeyStrategy::Full);
    assert!(settings.filters.include_hidden);
    assert_eq!(settings.filters.exclude_dirs, vec!["node_modules".to_string()]);
    assert_eq!(settings.filters.include_exts, vec!["jpg".to_string()]);
}

#[test]
fn test_settings_partial_toml_keeps_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "key = \"size\"\n").unwrap();

    let settings = Settings::from_figment(&Settings::figment(Some(&config_path))).unwrap();

    assert_eq!(settings.key, KeyStrategy::Size);
    assert_eq!(settings.workers, 0);
    assert!(settings.filters.exclude_dirs.is_empty());
}

#[test]
fn test_settings_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "key = \"sha1\"\n").unwrap();

    assert!(Settings::from_figment(&Settings::figment(Some(&config_path))).is_err());
}

#[test]
fn test_settings_load_from_env() {
    std::env::set_var("DUPESCOUT_KEY", "size");
    // Use double underscore for nesting
    std::env::set_var("DUPESCOUT_FILTERS__INCLUDE_HIDDEN", "true");

    let figment = Settings::figment(None).merge(Env::prefixed(ENV_PREFIX).split("__"));
    let settings = Settings::from_figment(&figment).unwrap();

    assert_eq!(settings.key, KeyStrategy::Size);
    assert!(settings.filters.include_hidden);

    std::env::remove_var("DUPESCOUT_KEY");
    std::env::remove_var("DUPESCOUT_FILTERS__INCLUDE_HIDDEN");
}

#[test]
fn test_settings_serialize_to_toml() {
    let mut settings = Settings {
        roots: vec![PathBuf::from("/data")],
        workers: 2,
        key: KeyStrategy::Full,
        ..Default::default()
    };
    settings.filters.exclude_dirs.push(".git".to_string());

    let text = toml::to_string(&settings).unwrap();
    assert!(text.contains("key = \"full\""));

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("roundtrip.toml");
    fs::write(&config_path, text).unwrap();

    let loaded = Settings::from_figment(&Settings::figment(Some(&config_path))).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_settings_drive_a_search() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().join("root");
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join("a.txt"), "same").unwrap();
    fs::write(root.join("vendor/b.txt"), "same").unwrap();
    fs::write(root.join("c.txt"), "same").unwrap();

    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "roots = [{:?}]\nworkers = 2\n\n[filters]\nexclude_dirs = [\"vendor\"]\n",
            root.display().to_string()
        ),
    )
    .unwrap();

    let settings = Settings::from_figment(&Settings::figment(Some(&config_path))).unwrap();
    let config = settings.into_search_config().with_signal_handling(false);

    let mut results = get_results(config).unwrap();
    results.sort();
    assert_eq!(results, vec![root.join("a.txt"), root.join("c.txt")]);
}
