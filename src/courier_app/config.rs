use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, DEFAULT_SERVER_URL};

/// Runtime configuration wrapper: static settings plus the courier's credential.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app, token: None })
    }

    pub fn from_app_config(app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { app, token: None })
    }

    /// Build from the environment.
    ///
    /// `COURIER_CONFIG` points at an optional TOML file; `COURIER_API_URL` and
    /// `COURIER_TOKEN` override the URL and credential.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut app = match std::env::var("COURIER_CONFIG") {
            Ok(path) => AppConfig::from_file(path)?,
            Err(_) => AppConfig::default(),
        };

        if let Ok(url) = std::env::var("COURIER_API_URL") {
            if url.trim().is_empty() {
                return Err(ConfigError::MissingValue("COURIER_API_URL"));
            }
            app.server_url = Some(url);
        }
        app.validate()?;

        let token = std::env::var("COURIER_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(Self { app, token })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }
}
