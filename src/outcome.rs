//! Per-run outcome record and process exit status selection.

use std::fmt;

/// What a run did, threaded through the walkers by the caller and read once
/// at the end to select the exit status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Directories created (reporting only).
    pub created_dirs: u64,
    /// Files moved (reporting only).
    pub moved_files: u64,
    /// A destination file already existed, so its source was left in place.
    pub has_unmoved_files: bool,
    /// At least one error was absorbed by failure-tolerant mode.
    pub has_partial_failures: bool,
}

impl Outcome {
    /// Exit status for a run that finished without a fatal error.
    /// Partial failures take precedence over unmoved files.
    pub fn exit_status(&self) -> ExitStatus {
        if self.has_partial_failures {
            ExitStatus::PartialFailure
        } else if self.has_unmoved_files {
            ExitStatus::UnmovedFiles
        } else {
            ExitStatus::Success
        }
    }
}

/// Process exit statuses. The numeric values are part of the CLI contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    PartialFailure,
    MirrorNotEmpty,
    UnmovedFiles,
    ConfigFailure,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::PartialFailure => 2,
            ExitStatus::MirrorNotEmpty => 3,
            ExitStatus::UnmovedFiles => 4,
            ExitStatus::ConfigFailure => 5,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitStatus::Success => "success",
            ExitStatus::Failure => "failure",
            ExitStatus::PartialFailure => "partial_failure",
            ExitStatus::MirrorNotEmpty => "mirror_not_empty",
            ExitStatus::UnmovedFiles => "unmoved_files",
            ExitStatus::ConfigFailure => "config_failure",
        };
        f.write_str(s)
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_is_success() {
        assert_eq!(Outcome::default().exit_status(), ExitStatus::Success);
    }

    #[test]
    fn partial_failure_wins_over_unmoved() {
        let outcome = Outcome {
            has_unmoved_files: true,
            has_partial_failures: true,
            ..Default::default()
        };
        assert_eq!(outcome.exit_status(), ExitStatus::PartialFailure);
        assert_eq!(outcome.exit_status().code(), 2);
    }

    #[test]
    fn unmoved_files_select_code_four() {
        let outcome = Outcome {
            has_unmoved_files: true,
            ..Default::default()
        };
        assert_eq!(outcome.exit_status(), ExitStatus::UnmovedFiles);
        assert_eq!(outcome.exit_status().code(), 4);
    }
}
