//! Config module.
//! Provides configuration types, YAML loading, path cleaning and validation.

mod error;
pub mod paths;
pub mod types;
mod validate;
pub mod yaml;

pub use error::ConfigError;
pub use paths::{clean_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel, Mode};
pub use validate::validate_and_normalize;
pub use yaml::FileConfig;

/// Mirror all levels in init mode unless told otherwise.
pub const DEFAULT_INIT_DEPTH: i64 = -1;
