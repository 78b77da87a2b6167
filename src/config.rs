use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    // Identity provider (Auth0-style domain; the userinfo endpoint lives under it)
    pub auth_domain: String,
    pub userinfo_cache_ttl_secs: u64,
    // SMTP: host/port have Gmail defaults; the credential pair is optional
    // and gates whether real (non dry-run) sends are possible.
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_email: Option<String>,
    pub smtp_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            auth_domain: required("AUTH0_DOMAIN")?,
            userinfo_cache_ttl_secs: env::var("USERINFO_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".into())
                .parse()?,
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".into())
                .parse()?,
            smtp_email: env::var("SMTP_EMAIL").ok().filter(|s| !s.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
