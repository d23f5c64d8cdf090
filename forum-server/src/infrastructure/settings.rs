use anyhow::{Context, Result, anyhow};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub http_addr: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub http_request_body_limit_bytes: usize,
    pub http_concurrency_limit: usize,
    pub http_request_timeout_secs: u64,
    pub session_ttl_secs: i64,
    pub session_remember_ttl_secs: i64,
    pub verification_code_ttl_secs: i64,
    pub store_sweep_interval_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let database_url = get_required("DATABASE_URL").context("DATABASE_URL is required")?;
        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10_u32)?;

        let http_addr = std::env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let cors_origins = parse_cors_origins(
            std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string()),
        );
        let log_level = std::env::var("LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        let http_request_body_limit_bytes =
            parse_env("HTTP_REQUEST_BODY_LIMIT_BYTES", 1024 * 1024_usize)?;
        let http_concurrency_limit = parse_env("HTTP_CONCURRENCY_LIMIT", 256_usize)?;
        let http_request_timeout_secs = parse_env("HTTP_REQUEST_TIMEOUT_SECS", 10_u64)?;

        let session_ttl_secs = parse_ttl_env("SESSION_TTL_SECS", 24 * 60 * 60)?;
        let session_remember_ttl_secs =
            parse_ttl_env("SESSION_REMEMBER_TTL_SECS", 7 * 24 * 60 * 60)?;
        let verification_code_ttl_secs = parse_ttl_env("VERIFICATION_CODE_TTL_SECS", 10 * 60)?;
        let store_sweep_interval_secs = parse_env("STORE_SWEEP_INTERVAL_SECS", 60_u64)?;

        Ok(Self {
            database_url,
            database_max_connections,
            http_addr,
            cors_origins,
            log_level,
            http_request_body_limit_bytes,
            http_concurrency_limit,
            http_request_timeout_secs,
            session_ttl_secs,
            session_remember_ttl_secs,
            verification_code_ttl_secs,
            store_sweep_interval_secs,
        })
    }
}

fn get_required(key: &str) -> Result<String> {
    let value = std::env::var(key)?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(anyhow!("{key} must not be empty"));
    }
    Ok(value)
}

fn parse_cors_origins(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_positive(key, &raw)
}

/// Upper bound for every configured TTL.
pub(crate) const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

fn parse_ttl_env(key: &str, default: i64) -> Result<i64> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_ttl(key, &raw)
}

fn parse_ttl(key: &str, raw: &str) -> Result<i64> {
    let value: i64 = parse_positive(key, raw)?;
    if value > MAX_TTL_SECS {
        return Err(anyhow!("{key} must be <= {MAX_TTL_SECS} seconds (365 days)"));
    }
    Ok(value)
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = raw
        .trim()
        .parse::<T>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value <= T::default() {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{MAX_TTL_SECS, parse_cors_origins, parse_positive, parse_ttl};

    #[test]
    fn cors_origins_are_trimmed_and_blank_entries_dropped() {
        let origins = parse_cors_origins(" http://a.test , ,http://b.test ".to_string());
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn positive_numbers_parse() {
        let value: u64 = parse_positive("X", " 15 ").expect("must parse");
        assert_eq!(value, 15);
    }

    #[test]
    fn zero_negative_and_garbage_are_rejected() {
        assert!(parse_positive::<u64>("X", "0").is_err());
        assert!(parse_positive::<i64>("X", "-3").is_err());
        assert!(parse_positive::<usize>("X", "ten").is_err());
    }

    #[test]
    fn ttl_is_bounded_to_a_year() {
        assert_eq!(
            parse_ttl("SESSION_TTL_SECS", "86400").expect("must parse"),
            86_400
        );
        assert_eq!(
            parse_ttl("SESSION_TTL_SECS", &MAX_TTL_SECS.to_string()).expect("must parse"),
            MAX_TTL_SECS
        );

        let err = parse_ttl("SESSION_TTL_SECS", "10000000000000").expect_err("must be rejected");
        assert!(err.to_string().contains("SESSION_TTL_SECS"));
        assert!(parse_ttl("VERIFICATION_CODE_TTL_SECS", "0").is_err());
    }
}
