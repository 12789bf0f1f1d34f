//! Configuration utility functions
//!
//! This module provides helper functions for working with
//! environment variables and configuration values.

/// Get a string value from an environment variable or use the default
pub fn get_env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean value from an environment variable or use the default
pub fn get_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => val.to_lowercase() == "true" || val == "1",
        Err(_) => default,
    }
}

/// Get a i32 value from an environment variable or use the default
pub fn get_env_i32(key: &str, default: i32) -> i32 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a f64 value from an environment variable or use the default
pub fn get_env_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a comma-separated list of names from an environment variable
pub fn get_env_list(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(val) => val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}
