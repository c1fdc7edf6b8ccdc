//! Listener and middleware settings for the onboarding server.

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "3000";
/// The development server hosting the form.
const DEFAULT_FORM_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: &str = "30";

/// Where the server listens and which browser origins may call it.
///
/// Without any environment set this serves `http://localhost:3000` callers
/// on port 3000.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to submit the form from a browser.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `CORS_ORIGINS` and `REQUEST_TIMEOUT_SECS`.
    ///
    /// A non-numeric port or timeout aborts startup.
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        Self {
            host: var("HOST", DEFAULT_HOST),
            port: var("PORT", DEFAULT_PORT)
                .parse()
                .expect("PORT must be a valid u16"),
            cors_origins: parse_origins(&var("CORS_ORIGINS", DEFAULT_FORM_ORIGIN)),
            request_timeout_secs: var("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a valid u64"),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
