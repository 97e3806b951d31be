use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use barista::{jwa, jwk, Jwk, Jwks};
use reqwest::{
    header::{self, HeaderValue},
    Client, StatusCode,
};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};

use crate::{AuthError, FetchError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MISS_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct VolatileData {
    jwks: Jwks,
    loaded: bool,
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
}

impl VolatileData {
    fn unloaded() -> Self {
        Self {
            jwks: Jwks::default(),
            loaded: false,
            etag: None,
            last_modified: None,
        }
    }

    fn new(jwks: Jwks) -> Self {
        Self {
            jwks,
            loaded: true,
            etag: None,
            last_modified: None,
        }
    }

    fn select(&self, kid: &jwk::KeyIdRef, alg: Option<jwa::Algorithm>) -> Option<&Jwk> {
        if !self.loaded {
            return None;
        }

        match alg {
            Some(alg) => self.jwks.get_key(kid, alg),
            None => self.jwks.get_key_by_id(kid),
        }
    }
}

#[derive(Debug)]
struct RemoteOptions {
    jwks_url: String,
    client: Client,
}

#[derive(Debug, Default)]
struct RefreshState {
    last_attempt: Option<Instant>,
    last_failed: bool,
}

impl RefreshState {
    fn record(&mut self, result: &Result<(), FetchError>) {
        self.last_attempt = Some(Instant::now());
        self.last_failed = result.is_err();
    }
}

#[derive(Debug)]
struct Inner {
    data: ArcSwap<VolatileData>,
    remote: Option<RemoteOptions>,
    refresh: Mutex<RefreshState>,
    miss_refresh_cooldown: Duration,
}

/// Configures a [`KeyProvider`] that fetches its key set from a URL
#[derive(Clone, Debug)]
#[must_use]
pub struct KeyProviderBuilder {
    jwks_url: String,
    timeout: Duration,
    connect_timeout: Option<Duration>,
    miss_refresh_cooldown: Duration,
}

impl KeyProviderBuilder {
    /// Bounds the whole key set request (default 5 seconds)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bounds connection establishment (defaults to the request timeout)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The minimum time between refreshes triggered by unknown key ids
    /// (default 30 seconds)
    pub fn miss_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.miss_refresh_cooldown = cooldown;
        self
    }

    /// Builds a provider that fetches the key set on first use
    ///
    /// # Errors
    ///
    /// The HTTP client could not be constructed.
    pub fn build(self) -> Result<KeyProvider, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("barista_oauth2/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout.unwrap_or(self.timeout))
            .build()?;

        Ok(KeyProvider {
            inner: Arc::new(Inner {
                data: ArcSwap::from_pointee(VolatileData::unloaded()),
                remote: Some(RemoteOptions {
                    jwks_url: self.jwks_url,
                    client,
                }),
                refresh: Mutex::default(),
                miss_refresh_cooldown: self.miss_refresh_cooldown,
            }),
        })
    }

    /// Builds a provider and fetches the key set before returning
    ///
    /// # Errors
    ///
    /// The HTTP client could not be constructed, or the initial fetch
    /// failed.
    pub async fn build_eager(self) -> Result<KeyProvider, FetchError> {
        let provider = self.build()?;
        provider.refresh().await?;
        Ok(provider)
    }
}

/// A cached JSON Web Key Set, fetched from the token issuer
///
/// Lookups read an immutable snapshot without locking. A lookup for a key
/// id that is not in the snapshot triggers a refresh, at most once per
/// cooldown; concurrent misses wait for a single in-flight refresh and then
/// look again. Refreshes replace the snapshot wholesale.
///
/// Cloning is cheap and every clone shares the same cache.
#[derive(Debug, Clone)]
#[must_use]
pub struct KeyProvider {
    inner: Arc<Inner>,
}

impl KeyProvider {
    /// Starts configuring a provider backed by `jwks_url`
    pub fn builder(jwks_url: impl Into<String>) -> KeyProviderBuilder {
        KeyProviderBuilder {
            jwks_url: jwks_url.into(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: None,
            miss_refresh_cooldown: DEFAULT_MISS_REFRESH_COOLDOWN,
        }
    }

    /// A provider backed by `jwks_url` with default settings, fetching on
    /// first use
    ///
    /// # Errors
    ///
    /// The HTTP client could not be constructed.
    pub fn from_url(jwks_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder(jwks_url).build()
    }

    /// A provider backed by `jwks_url` with default settings, fetching
    /// immediately
    ///
    /// # Errors
    ///
    /// The HTTP client could not be constructed, or the initial fetch
    /// failed.
    pub async fn from_url_eager(jwks_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder(jwks_url).build_eager().await
    }

    /// A provider serving a fixed key set that never refreshes
    pub fn from_jwks(jwks: Jwks) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: ArcSwap::from_pointee(VolatileData::new(jwks)),
                remote: None,
                refresh: Mutex::default(),
                miss_refresh_cooldown: DEFAULT_MISS_REFRESH_COOLDOWN,
            }),
        }
    }

    /// The endpoint keys are fetched from, if any
    #[must_use]
    pub fn jwks_url(&self) -> Option<&str> {
        self.inner.remote.as_ref().map(|r| r.jwks_url.as_str())
    }

    /// Whether a key set has been loaded yet
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.data.load().loaded
    }

    /// A copy of the current key set
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        self.inner.data.load().jwks.clone()
    }

    /// Replaces the current key set
    pub fn set_jwks(&self, jwks: Jwks) {
        self.inner.data.store(Arc::new(VolatileData::new(jwks)));
    }

    /// Gets the key identified by `kid`
    ///
    /// # Errors
    ///
    /// * [`AuthError::ProviderUnreachable`] if the key set had to be fetched
    ///   and the fetch failed, or failed within the last cooldown
    /// * [`AuthError::KeyNotFound`] if no key carries `kid`, even after a
    ///   refresh or while refreshes are cooling down
    pub async fn signing_key(&self, kid: &jwk::KeyIdRef) -> Result<Jwk, AuthError> {
        self.resolve(kid, None).await
    }

    /// Gets the key identified by `kid` that is best suited to `alg`
    ///
    /// # Errors
    ///
    /// As for [`signing_key()`][Self::signing_key].
    pub async fn signing_key_for(
        &self,
        kid: &jwk::KeyIdRef,
        alg: jwa::Algorithm,
    ) -> Result<Jwk, AuthError> {
        self.resolve(kid, Some(alg)).await
    }

    async fn resolve(
        &self,
        kid: &jwk::KeyIdRef,
        alg: Option<jwa::Algorithm>,
    ) -> Result<Jwk, AuthError> {
        if let Some(key) = self.inner.data.load().select(kid, alg) {
            return Ok(key.clone());
        }

        self.refresh_on_miss(kid)
            .await
            .map_err(AuthError::ProviderUnreachable)?;

        self.inner
            .data
            .load()
            .select(kid, alg)
            .cloned()
            .ok_or_else(|| {
                tracing::debug!(%kid, "no key with matching id");
                AuthError::KeyNotFound {
                    kid: kid.to_owned(),
                }
            })
    }

    async fn refresh_on_miss(&self, kid: &jwk::KeyIdRef) -> Result<(), FetchError> {
        let Some(remote) = &self.inner.remote else {
            return Ok(());
        };

        let mut state = self.inner.refresh.lock().await;

        if self.inner.data.load().select(kid, None).is_some() {
            tracing::trace!(%kid, "key arrived with a concurrent refresh");
            return Ok(());
        }

        if let Some(last) = state.last_attempt {
            let elapsed = last.elapsed();
            if elapsed < self.inner.miss_refresh_cooldown {
                if state.last_failed {
                    tracing::debug!(%kid, "unknown key id; JWKS provider failed recently");
                    return Err(FetchError::RecentlyFailed {
                        retry_in: self.inner.miss_refresh_cooldown - elapsed,
                    });
                }
                tracing::debug!(%kid, "unknown key id; JWKS refresh suppressed during cooldown");
                return Ok(());
            }
        }

        tracing::debug!(%kid, "unknown key id; refreshing JWKS");
        let result = self.fetch(remote).await;
        state.record(&result);
        result
    }

    /// Fetches the key set now, regardless of cooldown
    ///
    /// A provider built with [`from_jwks()`][Self::from_jwks] has nothing to
    /// fetch and always succeeds.
    ///
    /// # Errors
    ///
    /// The fetch failed. The current key set is kept.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let Some(remote) = &self.inner.remote else {
            return Ok(());
        };

        let mut state = self.inner.refresh.lock().await;
        let result = self.fetch(remote).await;
        state.record(&result);
        result
    }

    /// Refreshes the key set every `interval` on a background task
    ///
    /// Failures are logged and retried at the next tick. Abort the returned
    /// handle to stop refreshing.
    pub fn spawn_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;

            loop {
                timer.tick().await;
                // logged in `fetch`; the next tick tries again
                let _ = this.refresh().await;
            }
        })
    }

    #[tracing::instrument(skip_all, fields(jwks.url = tracing::field::Empty))]
    async fn fetch(&self, remote: &RemoteOptions) -> Result<(), FetchError> {
        let span = tracing::Span::current();
        span.record("jwks.url", remote.jwks_url.as_str());
        tracing::debug!("refreshing JWKS");

        let mut request = remote.client.get(&remote.jwks_url);

        {
            let data = self.inner.data.load();
            if let Some(etag) = &data.etag {
                request = request.header(header::IF_NONE_MATCH, etag);
            } else if let Some(last_modified) = &data.last_modified {
                request = request.header(header::IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(error, "JWKS refresh failed; request error");
                return Err(err.into());
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("JWKS not modified");
            return Ok(());
        } else if !status.is_success() {
            tracing::warn!(
                http.status_code = status.as_u16(),
                "JWKS refresh failed; unexpected response status",
            );
            return Err(FetchError::Status(status));
        }

        let etag = response.headers().get(header::ETAG).cloned();
        let last_modified = response.headers().get(header::LAST_MODIFIED).cloned();

        let jwks = match decode(response).await {
            Ok(jwks) => jwks,
            Err(err) => {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(error, "JWKS refresh failed; unreadable body");
                return Err(err);
            }
        };

        tracing::info!(jwks.keys = jwks.len(), "JWKS refreshed");
        self.inner.data.store(Arc::new(VolatileData {
            jwks,
            loaded: true,
            etag,
            last_modified,
        }));

        Ok(())
    }
}

async fn decode(response: reqwest::Response) -> Result<Jwks, FetchError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    const PRIMARY_JWK: &str = include_str!("../../barista/data/rsa/primary-jwk.json");

    fn static_provider() -> Result<KeyProvider> {
        let jwk: Jwk = serde_json::from_str(PRIMARY_JWK)?;
        Ok(KeyProvider::from_jwks(std::iter::once(jwk).collect()))
    }

    #[tokio::test]
    async fn static_provider_serves_known_key() -> Result<()> {
        let provider = static_provider()?;
        let key = provider
            .signing_key(jwk::KeyIdRef::from_str("barista-primary"))
            .await?;
        assert_eq!(key.key_id().map(jwk::KeyIdRef::as_str), Some("barista-primary"));
        Ok(())
    }

    #[tokio::test]
    async fn static_provider_misses_without_fetching() -> Result<()> {
        let provider = static_provider()?;
        let err = provider
            .signing_key(jwk::KeyIdRef::from_str("barista-unknown"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "key_not_found");
        Ok(())
    }

    #[tokio::test]
    async fn set_jwks_replaces_snapshot() -> Result<()> {
        let provider = static_provider()?;
        provider.set_jwks(Jwks::default());
        assert!(provider.jwks().is_empty());
        assert!(provider
            .signing_key(jwk::KeyIdRef::from_str("barista-primary"))
            .await
            .is_err());
        Ok(())
    }

    #[test]
    fn lazy_provider_starts_unloaded() -> Result<()> {
        let provider = KeyProvider::from_url("http://127.0.0.1:9/.well-known/jwks.json")?;
        assert!(!provider.is_loaded());
        assert_eq!(
            provider.jwks_url(),
            Some("http://127.0.0.1:9/.well-known/jwks.json")
        );
        Ok(())
    }
}
