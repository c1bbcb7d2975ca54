use std::fmt;

pub const LIVE_API_URL: &str = "https://api.alpaca.markets/v2";
pub const PAPER_API_URL: &str = "https://paper-api.alpaca.markets/v2";
pub const DATA_API_URL: &str = "https://data.alpaca.markets/v2";

/// Version segment the options and news data endpoints still live under.
pub const LEGACY_DATA_VERSION: &str = "v1beta1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountMode {
    Live,
    Paper,
}

impl fmt::Display for AccountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountMode::Live => write!(f, "LIVE"),
            AccountMode::Paper => write!(f, "PAPER"),
        }
    }
}

/// Authentication scheme, fixed for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    KeySecret { key: String, secret: String },
    Bearer(String),
}

impl Credentials {
    pub fn key_secret(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials::KeySecret {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer(token.into())
    }

    /// Headers for this scheme; never a mix of both.
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            Credentials::KeySecret { key, secret } => vec![
                ("APCA-API-KEY-ID".to_string(), key.clone()),
                ("APCA-API-SECRET-KEY".to_string(), secret.clone()),
            ],
            Credentials::Bearer(token) => {
                vec![("Authorization".to_string(), format!("Bearer {}", token))]
            }
        }
    }

    pub fn is_bearer(&self) -> bool {
        matches!(self, Credentials::Bearer(_))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::KeySecret { .. } => f.write_str("Credentials::KeySecret(<redacted>)"),
            Credentials::Bearer(_) => f.write_str("Credentials::Bearer(<redacted>)"),
        }
    }
}

/// What an endpoint serves. Decides URL versioning, independent of the host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentRole {
    Trading,
    Data,
}

/// Base endpoint plus the credentials used against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub api: String,
    pub credentials: Credentials,
    pub role: EnvironmentRole,
}

impl Environment {
    /// A trading endpoint.
    pub fn new(api: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_role(api, credentials, EnvironmentRole::Trading)
    }

    /// A market-data endpoint at a custom URL (proxy, local mock server).
    pub fn data_at(api: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_role(api, credentials, EnvironmentRole::Data)
    }

    fn with_role(api: impl Into<String>, credentials: Credentials, role: EnvironmentRole) -> Self {
        Self {
            api: api.into().trim_end_matches('/').to_string(),
            credentials,
            role,
        }
    }

    pub fn live(credentials: Credentials) -> Self {
        Self::new(LIVE_API_URL, credentials)
    }

    pub fn paper(credentials: Credentials) -> Self {
        Self::new(PAPER_API_URL, credentials)
    }

    pub fn data(credentials: Credentials) -> Self {
        Self::data_at(DATA_API_URL, credentials)
    }

    pub fn is_paper(&self) -> bool {
        self.api.contains("paper")
    }

    pub fn is_data(&self) -> bool {
        self.role == EnvironmentRole::Data
    }

    pub fn mode(&self) -> AccountMode {
        if self.is_paper() {
            AccountMode::Paper
        } else {
            AccountMode::Live
        }
    }
}
