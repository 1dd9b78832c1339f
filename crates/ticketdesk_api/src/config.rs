use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "v9.2";
pub const DEFAULT_ENTITY_SET: &str = "cr76d_tickets";
pub const DEFAULT_DIRECTORY_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_USER_AGENT: &str = "ticketdesk";
pub const DEFAULT_COOLDOWN_MS: u64 = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub environment_url: String,
    pub api_version: String,
    pub entity_set: String,
    pub directory_url: String,
    pub token: String,
    pub directory_token: Option<String>,
    pub user_agent: String,
    pub cooldown: Duration,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ApiConfig {
    pub fn new(environment_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            environment_url: environment_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            entity_set: DEFAULT_ENTITY_SET.to_string(),
            directory_url: DEFAULT_DIRECTORY_BASE.to_string(),
            token: token.into(),
            directory_token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_entity_set(mut self, entity_set: impl Into<String>) -> Self {
        self.entity_set = entity_set.into();
        self
    }

    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    /// Uses a separate bearer token for directory calls; the record token is used otherwise.
    pub fn with_directory_token(mut self, token: impl Into<String>) -> Self {
        self.directory_token = Some(token.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_cooldown(mut self, duration: Duration) -> Self {
        self.cooldown = duration;
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    pub fn record_root(&self) -> String {
        format!(
            "{}/api/data/{}/",
            self.environment_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    pub fn directory_root(&self) -> String {
        format!("{}/", self.directory_url.trim_end_matches('/'))
    }

    pub fn directory_bearer(&self) -> &str {
        self.directory_token.as_deref().unwrap_or(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::ApiConfig;

    #[test]
    fn record_root_normalizes_slashes() {
        let config =
            ApiConfig::new("https://org.crm.dynamics.com/", "t").with_api_version("/v9.1/");
        assert_eq!(config.record_root(), "https://org.crm.dynamics.com/api/data/v9.1/");
    }

    #[test]
    fn directory_token_falls_back_to_record_token() {
        let config = ApiConfig::new("https://org.crm.dynamics.com", "record-token");
        assert_eq!(config.directory_bearer(), "record-token");

        let config = config.with_directory_token("graph-token");
        assert_eq!(config.directory_bearer(), "graph-token");
    }
}
