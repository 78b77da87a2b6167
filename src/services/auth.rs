use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Identity as reported by the provider's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Short-lived lookup of userinfo responses, keyed by a SHA-256 fingerprint
/// of the bearer token (the token itself is never stored). Owned by the
/// application state and passed by reference, not a process-wide global.
/// Expired entries are evicted on read.
pub struct UserInfoCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (UserInfo, Instant)>>,
}

impl UserInfoCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, token: &str) -> Option<UserInfo> {
        let key = fingerprint(token);
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(&key) {
            Some((info, stored_at)) if stored_at.elapsed() < self.ttl => Some(info.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, token: &str, info: UserInfo) {
        let key = fingerprint(token);
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key, (info, Instant::now()));
    }
}

fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct AuthService;

impl AuthService {
    /// Resolve a bearer token to the provider identity, consulting the cache
    /// first so repeated requests within the TTL never hit the provider (and
    /// never trip its rate limit).
    pub async fn resolve_user(
        http: &reqwest::Client,
        cache: &UserInfoCache,
        auth_domain: &str,
        token: &str,
    ) -> anyhow::Result<UserInfo> {
        if let Some(info) = cache.get(token) {
            return Ok(info);
        }

        let response = http
            .get(format!("https://{auth_domain}/userinfo"))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Userinfo do provedor de identidade falhou: {status}");
            anyhow::bail!("userinfo retornou {status}");
        }

        let info: UserInfo = response.json().await?;
        anyhow::ensure!(!info.sub.is_empty(), "userinfo sem sub");

        cache.insert(token, info.clone());
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(sub: &str) -> UserInfo {
        UserInfo {
            sub: sub.into(),
            name: Some("João".into()),
            email: Some("joao@email.com".into()),
            nickname: None,
            picture: None,
        }
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = UserInfoCache::new(Duration::from_secs(60));
        cache.insert("token-abc", info("auth0|1"));

        let hit = cache.get("token-abc").expect("expected a cache hit");
        assert_eq!(hit.sub, "auth0|1");
        assert!(cache.get("token-outro").is_none());
    }

    #[test]
    fn test_cache_expires() {
        let cache = UserInfoCache::new(Duration::ZERO);
        cache.insert("token-abc", info("auth0|1"));
        assert!(cache.get("token-abc").is_none());
    }

    #[test]
    fn test_fingerprint_is_not_the_token() {
        let fp = fingerprint("super-secret-token");
        assert_ne!(fp, "super-secret-token");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint("super-secret-token"));
    }
}
