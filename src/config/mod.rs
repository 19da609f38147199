//! # Configuration Management Module
//!
//! Loads and writes the TOML configuration for MeccaBBS.
//!
//! ## Configuration Structure
//!
//! - [`BbsConfig`] - System identity (name, sysop, location) exposed to templates
//! - [`ServerConfig`] - Listener address and session limits
//! - [`MeccaConfig`] - Template root, output charset and the screens a session walks through
//! - [`LoggingConfig`] - Logging level and optional file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meccabbs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("BBS Name: {}", config.bbs.name);
//!     println!("Templates: {}", config.mecca.template_root);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bbs]
//! name = "My MECCA BBS"
//! sysop = "sysop"
//! location = "Somewhere"
//!
//! [server]
//! bind = "127.0.0.1:2323"
//! max_sessions = 16
//!
//! [mecca]
//! template_root = "./templates"
//! charset = "cp437"
//!
//! [mecca.screens]
//! connect = "misc/logo"
//! login = "misc/login"
//! main_menu = "misc/main_menu"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::mecca::Charset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub bbs: BbsConfig,
    pub server: ServerConfig,
    pub mecca: MeccaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BbsConfig {
    pub name: String,
    pub sysop: String,
    pub location: String,
    /// Privilege level given to callers after login.
    #[serde(default = "default_user_level")]
    pub default_level: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub max_sessions: usize,
    pub session_timeout: u32, // minutes
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeccaConfig {
    pub template_root: String,
    #[serde(default)]
    pub charset: Charset,
    /// Compile every template under the root at startup instead of on first use.
    #[serde(default)]
    pub preload: bool,
    #[serde(default)]
    pub screens: ScreenConfig,
}

/// Template shown for each session screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub connect: String,
    pub login: String,
    pub main_menu: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

fn default_user_level() -> u16 {
    crate::bbs::roles::LEVEL_NORMAL
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            connect: "misc/logo".to_string(),
            login: "misc/login".to_string(),
            main_menu: "misc/main_menu".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bbs: BbsConfig {
                name: "MeccaBBS Station".to_string(),
                sysop: "sysop".to_string(),
                location: "Your Location".to_string(),
                default_level: default_user_level(),
            },
            server: ServerConfig {
                bind: "127.0.0.1:2323".to_string(),
                max_sessions: 16,
                session_timeout: 10,
            },
            mecca: MeccaConfig {
                template_root: "./templates".to_string(),
                charset: Charset::default(),
                preload: false,
                screens: ScreenConfig::default(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("meccabbs.log".to_string()),
            },
        }
    }
}
