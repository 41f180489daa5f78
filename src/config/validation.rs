//! Configuration validation logic.

use crate::config::schema::ProxyConfig;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

const VALID_ALGORITHMS: &[&str] = &["round-robin", "least-connections"];

/// Validate a ProxyConfig for semantic correctness.
///
/// All problems are collected so the operator sees every mistake at once.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.listen.is_empty() {
        errors.push(ValidationError("server.listen is required".to_string()));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError(
            "at least one backend is required".to_string(),
        ));
    }

    for (i, backend) in config.backends.iter().enumerate() {
        if backend.address.is_empty() {
            errors.push(ValidationError(format!(
                "backends[{}].address is required",
                i
            )));
        }
    }

    if !VALID_ALGORITHMS.contains(&config.load_balancing.algorithm.as_str()) {
        errors.push(ValidationError(format!(
            "invalid load balancing algorithm '{}' (expected one of: {})",
            config.load_balancing.algorithm,
            VALID_ALGORITHMS.join(", ")
        )));
    }

    if config.health_check.healthy_threshold == 0 {
        errors.push(ValidationError(
            "health_check.healthy_threshold must be > 0".to_string(),
        ));
    }
    if config.health_check.unhealthy_threshold == 0 {
        errors.push(ValidationError(
            "health_check.unhealthy_threshold must be > 0".to_string(),
        ));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError(
            "circuit_breaker.failure_threshold must be > 0".to_string(),
        ));
    }
    if config.circuit_breaker.success_threshold == 0 {
        errors.push(ValidationError(
            "circuit_breaker.success_threshold must be > 0".to_string(),
        ));
    }

    if config.buffer.max_request_body == 0 {
        errors.push(ValidationError(
            "buffer.max_request_body must be > 0".to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackendConfig;

    fn config_with_backend() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.backends.push(BackendConfig {
            address: "127.0.0.1:9001".into(),
            weight: 1,
        });
        config
    }

    #[test]
    fn default_config_with_backend_is_valid() {
        assert!(validate_config(&config_with_backend()).is_ok());
    }

    #[test]
    fn rejects_empty_backend_list() {
        let config = ProxyConfig::default();
        let errs = validate_config(&config).unwrap_err();
        assert!(errs.iter().any(|e| e.0.contains("at least one backend")));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let mut config = config_with_backend();
        config.load_balancing.algorithm = "fastest-first".into();
        let errs = validate_config(&config).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].0.contains("fastest-first"));
    }

    #[test]
    fn rejects_zero_thresholds() {
        let mut config = config_with_backend();
        config.health_check.unhealthy_threshold = 0;
        config.circuit_breaker.failure_threshold = 0;
        let errs = validate_config(&config).unwrap_err();
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn collects_all_errors_at_once() {
        let mut config = ProxyConfig::default();
        config.server.listen = String::new();
        config.load_balancing.algorithm = "nope".into();
        let errs = validate_config(&config).unwrap_err();
        assert!(errs.len() >= 3);
    }
}
