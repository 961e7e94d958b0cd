use std::fs;
use std::path::{Path, PathBuf};

use iced::Theme;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_SESSION_FILE: &str = "session.json";
pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme_name")]
    pub theme_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    /// Where the refresh token is kept between runs. `null` disables it.
    #[serde(default = "default_session_file")]
    pub session_file: Option<PathBuf>,
}

fn default_theme_name() -> String {
    theme_to_str(&Theme::Dark).to_string()
}

fn default_session_file() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_SESSION_FILE))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// Project URL, always ending in `/` so endpoints can be joined onto it.
    pub url: Url,
    pub anon_key: String,
    pub session_file: Option<PathBuf>,
}

/// Combines the config file with environment overrides. Environment values
/// win; blank values count as missing.
pub fn resolve_backend(
    config: &Config,
    env_url: Option<String>,
    env_key: Option<String>,
) -> Result<BackendSettings, ConfigError> {
    let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let url = non_blank(env_url)
        .or_else(|| non_blank(config.supabase_url.clone()))
        .ok_or(ConfigError::MissingBackend)?;
    let anon_key = non_blank(env_key)
        .or_else(|| non_blank(config.supabase_anon_key.clone()))
        .ok_or(ConfigError::MissingBackend)?;

    let mut normalized = url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
        url: url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            reason: format!("unsupported scheme {}", url.scheme()),
            url: url.to_string(),
        });
    }

    Ok(BackendSettings {
        url,
        anon_key: anon_key.trim().to_string(),
        session_file: config.session_file.clone(),
    })
}

pub fn backend_from_env(config: &Config) -> Result<BackendSettings, ConfigError> {
    resolve_backend(
        config,
        std::env::var(URL_VAR).ok(),
        std::env::var(ANON_KEY_VAR).ok(),
    )
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new(CONFIG_FILE))
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No {} found, using defaults", path.display());
            Ok(Config {
                theme_name: default_theme_name(),
                session_file: default_session_file(),
                ..Config::default()
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub fn save_theme(theme: &Theme) -> Result<(), ConfigError> {
    save_theme_to(Path::new(CONFIG_FILE), theme)
}

/// Rewrites only the theme and keeps every other setting in the file.
pub fn save_theme_to(path: &Path, theme: &Theme) -> Result<(), ConfigError> {
    let mut config = load_config_from(path)?;
    config.theme_name = theme_to_str(theme).to_string();
    let json = serde_json::to_string_pretty(&config)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn theme_from_str(name: &str) -> Option<Theme> {
    Theme::ALL
        .iter()
        .find(|t| theme_to_str(t).eq_ignore_ascii_case(name))
        .cloned()
}

pub fn theme_to_str(theme: &Theme) -> &'static str {
    match theme {
        Theme::Light => "Light",
        Theme::Dark => "Dark",
        Theme::Dracula => "Dracula",
        Theme::Nord => "Nord",
        Theme::SolarizedLight => "SolarizedLight",
        Theme::SolarizedDark => "SolarizedDark",
        Theme::GruvboxLight => "GruvboxLight",
        Theme::GruvboxDark => "GruvboxDark",
        Theme::CatppuccinLatte => "CatppuccinLatte",
        Theme::CatppuccinFrappe => "CatppuccinFrappe",
        Theme::CatppuccinMacchiato => "CatppuccinMacchiato",
        Theme::CatppuccinMocha => "CatppuccinMocha",
        Theme::TokyoNight => "TokyoNight",
        Theme::TokyoNightStorm => "TokyoNightStorm",
        Theme::TokyoNightLight => "TokyoNightLight",
        Theme::KanagawaWave => "KanagawaWave",
        Theme::KanagawaDragon => "KanagawaDragon",
        Theme::KanagawaLotus => "KanagawaLotus",
        Theme::Moonfly => "Moonfly",
        Theme::Nightfly => "Nightfly",
        Theme::Oxocarbon => "Oxocarbon",
        Theme::Ferra => "Ferra",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(url: &str, key: &str) -> Config {
        Config {
            theme_name: "Dark".to_string(),
            supabase_url: Some(url.to_string()),
            supabase_anon_key: Some(key.to_string()),
            session_file: None,
        }
    }

    #[test]
    fn environment_overrides_file() {
        let config = file_config("https://file.supabase.co", "file-key");
        let settings = resolve_backend(
            &config,
            Some("https://env.supabase.co".to_string()),
            Some("env-key".to_string()),
        )
        .unwrap();
        assert_eq!(settings.url.as_str(), "https://env.supabase.co/");
        assert_eq!(settings.anon_key, "env-key");
    }

    #[test]
    fn blank_environment_falls_back_to_file() {
        let config = file_config("https://file.supabase.co/", "file-key");
        let settings = resolve_backend(&config, Some("  ".to_string()), None).unwrap();
        assert_eq!(settings.url.as_str(), "https://file.supabase.co/");
        assert_eq!(settings.anon_key, "file-key");
    }

    #[test]
    fn missing_key_is_an_error() {
        let config = Config {
            supabase_url: Some("https://x.supabase.co".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            resolve_backend(&config, None, None),
            Err(ConfigError::MissingBackend)
        ));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let config = file_config("ftp://x.supabase.co", "k");
        assert!(matches!(
            resolve_backend(&config, None, None),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn saving_theme_keeps_backend_settings() {
        let path = std::env::temp_dir().join(format!("portal-config-{}.json", std::process::id()));
        let original = file_config("https://x.supabase.co/", "k");
        fs::write(&path, serde_json::to_string(&original).unwrap()).unwrap();

        save_theme_to(&path, &Theme::Nord).unwrap();
        let saved = load_config_from(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(saved.theme_name, "Nord");
        assert_eq!(saved.supabase_url, original.supabase_url);
        assert_eq!(saved.supabase_anon_key, original.supabase_anon_key);
    }

    #[test]
    fn theme_names_round_trip() {
        for theme in Theme::ALL {
            assert_eq!(theme_from_str(theme_to_str(theme)).as_ref(), Some(theme));
        }
    }
}
