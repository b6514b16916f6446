use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub invite_ttl_hours: i64,
    pub public_base_url: String,
    pub mail_from: String,
    pub app_host: String,
    pub app_port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "closeknit".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "closeknit-users".into()),
            ttl_minutes: env_i64("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_i64("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            database_url,
            jwt,
            invite_ttl_hours: env_i64("INVITE_TTL_HOURS", 24),
            public_base_url,
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Closeknit <noreply@closeknit.io>".into()),
            app_host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            app_port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }

    pub fn invite_ttl(&self) -> time::Duration {
        time::Duration::hours(self.invite_ttl_hours)
    }

    /// Absolute URL a new member follows to join through the community's standing token.
    pub fn community_join_link(&self, token: uuid::Uuid) -> String {
        format!("{}/api/v1/join/{}", self.public_base_url, token)
    }

    pub fn invite_link(&self, token: uuid::Uuid) -> String {
        format!("{}/api/v1/invites/{}", self.public_base_url, token)
    }

    pub fn bind_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.app_host, self.app_port).parse()?)
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
