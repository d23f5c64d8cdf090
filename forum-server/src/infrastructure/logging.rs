use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Directives appended to the configured level so per-query sqlx chatter stays out of `info`.
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "hyper=warn"];

/// `RUST_LOG` wins over `default_level`; anything unparsable falls back to `info`.
pub(crate) fn init_logging(default_level: &str) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(default_level))
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(with_quiet_dependencies(default_level)))
        .unwrap_or_else(|_| EnvFilter::new(with_quiet_dependencies("info")))
}

fn with_quiet_dependencies(level: &str) -> String {
    let mut directives = vec![level.trim().to_string()];
    directives.extend(
        QUIET_DEPENDENCIES
            .iter()
            .filter(|quiet| {
                let target = quiet.split('=').next().unwrap_or_default();
                !level.contains(target)
            })
            .map(|quiet| quiet.to_string()),
    );
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::with_quiet_dependencies;

    #[test]
    fn dependencies_are_quieted_by_default() {
        assert_eq!(with_quiet_dependencies("debug"), "debug,sqlx=warn,hyper=warn");
    }

    #[test]
    fn explicit_dependency_directive_is_kept() {
        assert_eq!(
            with_quiet_dependencies("info,sqlx=debug"),
            "info,sqlx=debug,hyper=warn"
        );
    }
}
