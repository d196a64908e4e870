//! Engine configuration: a TOML default baked into the binary, layered with
//! an optional config file, layered with `TASKFORGE_`-prefixed environment
//! variables that use `__` to mark nesting so a key like `log_level` isn't
//! ambiguous with a struct boundary.

use anyhow::Result;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_ENGINE_CONFIG: &str = include_str!("./default_config.toml");

pub trait ConfigType: for<'de> Deserialize<'de> {
    fn default_config() -> &'static str;
    fn env_prefix() -> &'static str;
}

pub struct Configuration<T: ConfigType> {
    _marker: std::marker::PhantomData<T>,
}

impl<T: ConfigType> Configuration<T> {
    /// Loads configuration from the baked-in default, an optional file
    /// override, then environment variables, in that priority order (later
    /// layers win).
    pub fn load(path_override: Option<PathBuf>) -> Result<T> {
        let mut config = Figment::new().merge(Toml::string(T::default_config()));

        if let Some(path) = path_override {
            config = config.merge(Toml::file(path));
        }

        config = config.merge(Env::prefixed(T::env_prefix()).split("__"));
        Ok(config.extract()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub engine: Engine,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Engine {
    /// Worker thread count. 0 means "use available parallelism", matching
    /// [`crate::scheduler::SchedulerConfig::default`].
    pub num_workers: u64,
    pub log_level: String,
    pub pretty_logging: bool,
    pub paths: Paths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    pub working_dir: String,
}

impl ConfigType for EngineConfig {
    fn default_config() -> &'static str {
        DEFAULT_ENGINE_CONFIG
    }

    fn env_prefix() -> &'static str {
        "TASKFORGE_"
    }
}

impl EngineConfig {
    pub fn resolved_num_workers(&self) -> usize {
        if self.engine.num_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.engine.num_workers as usize
        }
    }
}
