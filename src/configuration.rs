use crate::error::ConfigError;

/// Access tokens live five minutes.
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 5 * 60;
/// Refresh tokens live 8440 minutes.
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = 8440 * 60;
/// Upper bound for either TTL: ten years.
pub const MAX_TOKEN_EXPIRY: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub jwt: JwtSettings,
    pub password: PasswordSettings,
}

/// Token signing settings
///
/// Injected into the codec, issuer and verifier at construction; nothing
/// reads the secret from process globals.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (300 = 5 minutes)
    pub refresh_token_expiry: i64,  // seconds (506400 = 8440 minutes)
}

impl JwtSettings {
    /// Settings with the default TTLs
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
        }
    }

    // Clamped so unvalidated settings cannot hit chrono's range panic
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_expiry.clamp(0, MAX_TOKEN_EXPIRY))
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_expiry.clamp(0, MAX_TOKEN_EXPIRY))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue("jwt.secret must not be empty".to_string()));
        }
        for (name, value) in [
            ("jwt.access_token_expiry", self.access_token_expiry),
            ("jwt.refresh_token_expiry", self.refresh_token_expiry),
        ] {
            if value <= 0 || value > MAX_TOKEN_EXPIRY {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be between 1 and {} seconds",
                    name, MAX_TOKEN_EXPIRY
                )));
            }
        }
        Ok(())
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

/// Password hashing settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct PasswordSettings {
    pub cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Load settings from an optional `configuration` file and `APP__*`
/// environment variables (e.g. `APP__JWT__SECRET`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("jwt.access_token_expiry", DEFAULT_ACCESS_TOKEN_EXPIRY)?
        .set_default("jwt.refresh_token_expiry", DEFAULT_REFRESH_TOKEN_EXPIRY)?
        .set_default("password.cost", i64::from(bcrypt::DEFAULT_COST))?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.jwt.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let settings = JwtSettings::new("test-secret-key-at-least-32-characters-long");
        assert_eq!(settings.access_ttl(), chrono::Duration::minutes(5));
        assert_eq!(settings.refresh_ttl(), chrono::Duration::minutes(8440));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let settings = JwtSettings::new("   ");
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let mut settings = JwtSettings::new("secret");
        settings.access_token_expiry = 0;
        assert!(settings.validate().is_err());

        let mut settings = JwtSettings::new("secret");
        settings.refresh_token_expiry = -1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let mut settings = JwtSettings::new("secret");
        settings.refresh_token_expiry = i64::MAX;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
        // Unvalidated settings still yield a usable TTL instead of panicking
        assert_eq!(settings.refresh_ttl(), chrono::Duration::seconds(MAX_TOKEN_EXPIRY));

        let mut settings = JwtSettings::new("secret");
        settings.access_token_expiry = MAX_TOKEN_EXPIRY + 1;
        assert!(settings.validate().is_err());

        settings.access_token_expiry = MAX_TOKEN_EXPIRY;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = JwtSettings::new("super-secret-value");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
