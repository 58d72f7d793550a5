//! Runtime configuration for the demo, read from the environment.

use std::str::FromStr;

/// Default long edge of the preview rendered next to the full image.
const DEFAULT_PREVIEW_EDGE: u32 = 256;

/// Which backend the renderer tries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    /// GPU offload, falling back to the vector backend.
    #[default]
    Gpu,
    Vector,
    Scalar,
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Self::Gpu),
            "vector" | "simd" => Ok(Self::Vector),
            "scalar" => Ok(Self::Scalar),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Runtime configuration for the colorbalance demo.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// First backend to try.
    pub backend: BackendChoice,
    /// Worker threads for the CPU backends (0 = rayon default).
    pub threads: usize,
    /// Long edge of the preview, 0 to skip it.
    pub preview_edge: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: env_or("COLORBALANCE_BACKEND", BackendChoice::default()),
            threads: env_or("COLORBALANCE_THREADS", 0),
            preview_edge: env_or("COLORBALANCE_PREVIEW", DEFAULT_PREVIEW_EDGE),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_choice_parses_case_insensitively() {
        assert_eq!("GPU".parse(), Ok(BackendChoice::Gpu));
        assert_eq!(" vector ".parse(), Ok(BackendChoice::Vector));
        assert_eq!("scalar".parse(), Ok(BackendChoice::Scalar));
        assert!("cuda".parse::<BackendChoice>().is_err());
    }
}
