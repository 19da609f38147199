use meccabbs::config::Config;
use meccabbs::mecca::Charset;

#[tokio::test]
async fn default_config_roundtrips_through_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let loaded = Config::load(path).await.unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn default_charset_matches_omitted_setting() {
    assert_eq!(Config::default().mecca.charset, Charset::default());
    assert_eq!(Charset::default(), Charset::Utf8);
}

#[tokio::test]
async fn optional_mecca_settings_have_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let toml = r#"
[bbs]
name = "Test BBS"
sysop = "max"
location = "Here"

[server]
bind = "127.0.0.1:0"
max_sessions = 2
session_timeout = 5

[mecca]
template_root = "./mec"

[logging]
level = "debug"
"#;
    tokio::fs::write(&path, toml).await.unwrap();
    let config = Config::load(path.to_str().unwrap()).await.unwrap();
    assert_eq!(config.mecca.charset, Charset::Utf8);
    assert_eq!(config.mecca.screens.login, "misc/login");
    assert_eq!(config.bbs.default_level, 30);
    assert!(!config.mecca.preload);
    assert!(config.logging.file.is_none());
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let err = Config::load("/nonexistent/meccabbs/config.toml").await.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
