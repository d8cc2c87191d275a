use std::env;

use once_cell::sync::Lazy;

const DEFAULT_MAX_DEPTH: usize = 64;

static GLOBAL_CONFIG: Lazy<ResolverConfig> = Lazy::new(ResolverConfig::from_env);

/// Resolution limits shared by resolvers and builders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Fail with `CyclicDependency` when a concrete type reappears on its own resolution path
    pub detect_cycles: bool,
    /// Deepest nesting the resolver will follow before giving up
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source; unset or unparsable values keep their defaults.
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            detect_cycles: parse_var(&lookup, "FAKEFORGE_DETECT_CYCLES", defaults.detect_cycles),
            max_depth: parse_var(&lookup, "FAKEFORGE_MAX_DEPTH", defaults.max_depth),
        }
    }

    /// Config loaded once from the environment on first use
    pub fn global() -> &'static ResolverConfig {
        &GLOBAL_CONFIG
    }
}

fn parse_var<L, T>(lookup: &L, name: &str, default: T) -> T
where
    L: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Debug,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {:?}", name, raw, default);
            default
        }),
        None => default,
    }
}
