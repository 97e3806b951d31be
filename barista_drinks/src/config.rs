//! Command line and environment configuration

use std::{net::SocketAddr, time::Duration};

use axum::http::{header, HeaderValue, Method};
use barista::{jwa, jwt};
use barista_oauth2::{Authority, FetchError, KeyProvider};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Settings for the drinks service
///
/// Every flag falls back to an environment variable, so a `.env` file is
/// enough to run the service.
#[derive(Clone, Debug, Parser)]
#[command(name = "barista", version, about)]
pub struct Config {
    /// The Auth0 tenant domain issuing tokens, e.g. `barista.eu.auth0.com`
    #[arg(long, env = "AUTH0_DOMAIN")]
    pub auth0_domain: String,

    /// The audience tokens must be issued for
    #[arg(long, env = "API_AUDIENCE")]
    pub api_audience: String,

    /// Signature algorithms tokens may use
    #[arg(long, env = "ALGORITHMS", value_delimiter = ',', default_value = "RS256")]
    pub algorithms: Vec<jwa::Algorithm>,

    /// Path of the key set on the issuer
    #[arg(long, env = "JWKS_PATH", default_value = "/.well-known/jwks.json")]
    pub jwks_path: String,

    /// Timeout for a key set fetch, in seconds
    #[arg(long, env = "JWKS_TIMEOUT_SECS", default_value_t = 5)]
    pub jwks_timeout_secs: u64,

    /// Minimum time between refreshes triggered by unknown key ids, in
    /// seconds
    #[arg(long, env = "JWKS_REFRESH_COOLDOWN_SECS", default_value_t = 30)]
    pub jwks_refresh_cooldown_secs: u64,

    /// Refresh the key set periodically at this interval, in seconds
    #[arg(long, env = "JWKS_REFRESH_INTERVAL_SECS")]
    pub jwks_refresh_interval_secs: Option<u64>,

    /// Clock skew tolerated on `exp` and `nbf`, in seconds
    #[arg(long, env = "LEEWAY_SECS", default_value_t = 0)]
    pub leeway_secs: u64,

    /// Address to listen on
    #[arg(long = "listen", env = "LISTEN_ADDR", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Origins allowed to call the API from a browser; `*` allows any
    #[arg(
        long,
        env = "CORS_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_allowed_origins: Vec<HeaderValue>,
}

impl Config {
    /// The expected `iss` claim
    ///
    /// A bare domain becomes `https://<domain>/`; a value that already has a
    /// scheme is kept, with a trailing slash ensured.
    pub fn issuer(&self) -> jwt::Issuer {
        let domain = self.auth0_domain.trim();
        let mut issuer = if domain.contains("://") {
            domain.to_owned()
        } else {
            format!("https://{domain}")
        };
        if !issuer.ends_with('/') {
            issuer.push('/');
        }
        jwt::Issuer::new(issuer)
    }

    /// Where the issuer publishes its key set
    pub fn jwks_url(&self) -> String {
        let issuer = self.issuer();
        let origin = issuer.as_str().trim_end_matches('/');
        let path = self.jwks_path.trim_start_matches('/');
        format!("{origin}/{path}")
    }

    /// The periodic refresh interval, if enabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.jwks_refresh_interval_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// The claim validator for this service's tokens
    pub fn validator(&self) -> jwt::CoreValidator {
        jwt::CoreValidator::default()
            .extend_approved_algorithms(self.algorithms.iter().copied())
            .add_allowed_audience(jwt::Audience::new(self.api_audience.clone()))
            .require_issuer(self.issuer())
            .with_leeway_secs(self.leeway_secs)
    }

    /// A lazily loading key provider for the issuer's key set
    pub fn key_provider(&self) -> Result<KeyProvider, FetchError> {
        KeyProvider::builder(self.jwks_url())
            .timeout(Duration::from_secs(self.jwks_timeout_secs))
            .miss_refresh_cooldown(Duration::from_secs(self.jwks_refresh_cooldown_secs))
            .build()
    }

    /// Cross-origin policy for browser clients such as the menu frontend
    pub fn cors(&self) -> CorsLayer {
        let origins = if self.cors_allowed_origins.iter().any(|o| o == "*") {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(self.cors_allowed_origins.iter().cloned())
        };

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }

    /// The authority verifying this service's tokens
    pub fn authority(&self) -> Result<Authority, FetchError> {
        Ok(Authority::new(self.key_provider()?, self.validator()))
    }
}
