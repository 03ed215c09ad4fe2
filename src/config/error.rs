use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid command-line arguments or configuration file. Always exit status 5.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--config yaml file does not exist: '{}' ({source})", path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("--config yaml file is malformed: '{}' ({source})", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("--mirror and --target paths must both be set")]
    MissingMirrorTarget,

    #[error("--mirror and --target paths cannot be the same")]
    MirrorTargetSame,

    #[error("--mirror and --target paths must all be absolute")]
    MirrorTargetNotAbs,

    #[error("--exclude paths must all be absolute: '{}'", .0.display())]
    ExcludeNotAbs(PathBuf),

    #[error("--log-level has a not recognized value: '{0}'")]
    InvalidLogLevel(String),
}
