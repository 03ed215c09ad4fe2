//! Application orchestrator.
//! Parses and validates the configuration, initializes logging, installs the
//! signal handler, and runs the selected mode on a worker thread while the
//! main thread waits for it (or for a signal, then at most `EXIT_TIMEOUT`).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use clap::error::ErrorKind;
use tracing::{error, info, warn};

use mirrorshuttle::cli::{Args, build_config};
use mirrorshuttle::output as out;
use mirrorshuttle::{
    CancelToken, Config, ExitStatus, OsFs, Outcome, ShuttleError, exit_status_for, run_mode,
};

use crate::logging::init_tracing;

/// How long to wait for the worker after a termination signal.
pub const EXIT_TIMEOUT: Duration = Duration::from_secs(10);

type WorkerResult = thread::Result<(Result<(), ShuttleError>, Outcome)>;

enum Event {
    Signal,
    Done(WorkerResult),
}

/// Run the CLI application and return the process exit code.
pub fn run() -> ExitCode {
    out::print_banner(env!("CARGO_PKG_VERSION"));

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitStatus::ConfigFailure.into(),
            };
        }
    };

    let cfg = match build_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            out::print_error(&e.to_string());
            return ExitStatus::ConfigFailure.into();
        }
    };

    match cfg.to_yaml_lines() {
        Ok(lines) => {
            out::print_user(&format!("configuration for '--mode={}':", cfg.mode));
            for line in lines {
                out::print_user(&line);
            }
            out::print_user("");
        }
        Err(e) => {
            out::print_error(&format!("failed to render configuration: {e}"));
            return ExitStatus::ConfigFailure.into();
        }
    }

    // Held until return so the file appender flushes.
    let _guard = match init_tracing(cfg.log_level, cfg.log_file.as_deref(), cfg.json) {
        Ok(guard) => guard,
        Err(e) => {
            out::print_error(&format!("failed to initialize logging: {e:#}"));
            return ExitStatus::ConfigFailure.into();
        }
    };

    supervise(cfg).into()
}

/// Spawn the worker and wait for it, honoring termination signals.
fn supervise(cfg: Config) -> ExitStatus {
    let op = cfg.mode.as_str();
    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel::<Event>();

    {
        let cancel = cancel.clone();
        let tx = tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            cancel.request();
            let _ = tx.send(Event::Signal);
        }) {
            error!(op, error = %e, "failed to install signal handler");
            return ExitStatus::Failure;
        }
    }

    let worker_cfg = cfg.clone();
    let worker_cancel = cancel.clone();
    let spawned = thread::Builder::new()
        .name("shuttle-worker".into())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut outcome = Outcome::default();
                let res = run_mode(&OsFs, &worker_cfg, &worker_cancel, &mut outcome);
                (res, outcome)
            }));
            let _ = tx.send(Event::Done(result));
        });
    if let Err(e) = spawned {
        error!(op, error = %e, "failed to start worker thread");
        return ExitStatus::Failure;
    }

    let mut deadline: Option<Instant> = None;
    loop {
        let event = match deadline {
            None => rx.recv().ok(),
            Some(at) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => {
                    error!(op, timeout = ?EXIT_TIMEOUT, "timed out while waiting for program exit; killing...");
                    return ExitStatus::Failure;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };

        match event {
            Some(Event::Signal) => {
                if deadline.is_none() {
                    warn!(op, timeout = ?EXIT_TIMEOUT, "received interrupt signal; shutting down (waiting up to 10s)...");
                    deadline = Some(Instant::now() + EXIT_TIMEOUT);
                }
            }
            Some(Event::Done(Ok((result, outcome)))) => return finish(&cfg, result, outcome),
            Some(Event::Done(Err(payload))) => {
                error!(op, error = %panic_message(payload.as_ref()), "internal panic recovered");
                return ExitStatus::Failure;
            }
            None => {
                error!(op, "worker thread exited without a result");
                return ExitStatus::Failure;
            }
        }
    }
}

/// Log the end of the run and select the exit status.
fn finish(cfg: &Config, result: Result<(), ShuttleError>, outcome: Outcome) -> ExitStatus {
    let op = cfg.mode.as_str();
    let status = exit_status_for(&result, &outcome);

    match (&result, status) {
        (Err(e), _) => {
            // A cancellation was already announced when the signal arrived.
            if !e.is_cancelled() {
                error!(
                    op,
                    error = %e,
                    kind = e.kind(),
                    dirs_created = outcome.created_dirs,
                    files_moved = outcome.moved_files,
                    "mode failed"
                );
            }
        }
        (Ok(()), ExitStatus::PartialFailure) => warn!(
            op,
            dirs_created = outcome.created_dirs,
            files_moved = outcome.moved_files,
            "mode completed, but with partial failures; exiting..."
        ),
        (Ok(()), ExitStatus::UnmovedFiles) => warn!(
            op,
            dirs_created = outcome.created_dirs,
            files_moved = outcome.moved_files,
            "mode completed, but with unmoved files; exiting..."
        ),
        (Ok(()), _) => info!(
            op,
            dirs_created = outcome.created_dirs,
            files_moved = outcome.moved_files,
            "mode completed; exiting..."
        ),
    }

    info!(op, code = status.code(), status = %status, "program exited");
    status
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
