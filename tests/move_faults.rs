//! Move mode against the in-memory filesystem with injected faults.

use mirrorshuttle::fs_ops::memfs::{FaultOp, MemFs};
use mirrorshuttle::{CancelToken, Config, ExitStatus, Mode, Outcome, ShuttleError, exit_status_for, move_files};

fn staged() -> MemFs {
    let fs = MemFs::new();
    fs.add_file("/mirror/fail.txt", "will not move");
    fs.add_file("/mirror/ok.txt", "moves fine");
    fs.add_dir("/real");
    fs
}

fn config() -> Config {
    Config::new(Mode::Move, "/mirror", "/real")
}

#[test]
fn tolerant_mode_moves_what_it_can() {
    let fs = staged();
    fs.fail_on(FaultOp::Rename, "fail.txt");
    let mut cfg = config();
    cfg.skip_failed = true;

    let mut outcome = Outcome::default();
    let res = move_files(&fs, &cfg, &CancelToken::new(), &mut outcome);
    assert!(res.is_ok());
    assert_eq!(fs.read("/real/ok.txt").unwrap(), b"moves fine");
    assert!(!fs.exists("/mirror/ok.txt"));
    assert_eq!(fs.read("/mirror/fail.txt").unwrap(), b"will not move");
    assert!(!fs.exists("/real/fail.txt"));
    assert!(!fs.exists("/real/fail.txt.mirsht"));
    assert_eq!(exit_status_for(&res, &outcome), ExitStatus::PartialFailure);
}

#[test]
fn strict_mode_aborts_on_first_failure() {
    let fs = staged();
    fs.fail_on(FaultOp::Rename, "fail.txt");

    let mut outcome = Outcome::default();
    let res = move_files(&fs, &config(), &CancelToken::new(), &mut outcome);
    let err = res.as_ref().unwrap_err();
    assert!(matches!(err, ShuttleError::Move { .. }));
    assert!(err.to_string().contains("fail.txt"));
    // Entries are visited in name order, so ok.txt was never reached.
    assert!(fs.exists("/mirror/ok.txt"));
    assert!(!outcome.has_partial_failures);
    assert_eq!(exit_status_for(&res, &outcome), ExitStatus::Failure);
}

#[test]
fn unreadable_directory_is_skipped_in_tolerant_mode() {
    let fs = staged();
    fs.add_file("/mirror/locked/hidden.txt", "x");
    fs.fail_on(FaultOp::List, "/mirror/locked");
    let mut cfg = config();
    cfg.skip_failed = true;

    let mut outcome = Outcome::default();
    move_files(&fs, &cfg, &CancelToken::new(), &mut outcome).unwrap();
    assert!(outcome.has_partial_failures);
    assert!(fs.exists("/mirror/locked/hidden.txt"));
    assert!(fs.exists("/real/ok.txt"));
    assert!(fs.exists("/real/fail.txt"));
}

#[test]
fn verify_mismatch_is_a_tolerable_integrity_error() {
    let fs = staged();
    fs.fail_on(FaultOp::CorruptWrite, "/real/fail.txt");
    let mut cfg = config();
    cfg.verify = true;
    cfg.skip_failed = true;

    let mut outcome = Outcome::default();
    move_files(&fs, &cfg, &CancelToken::new(), &mut outcome).unwrap();
    assert!(outcome.has_partial_failures);
    // Source is kept and the committed destination is left for inspection.
    assert_eq!(fs.read("/mirror/fail.txt").unwrap(), b"will not move");
    assert!(fs.exists("/real/fail.txt"));
    assert_eq!(fs.read("/real/ok.txt").unwrap(), b"moves fine");

    // A rerun refuses to touch the existing destination.
    let mut rerun = Outcome::default();
    move_files(&fs, &config(), &CancelToken::new(), &mut rerun).unwrap();
    assert!(rerun.has_unmoved_files);
    assert!(fs.exists("/mirror/fail.txt"));
}

#[test]
fn cancellation_mid_copy_is_never_absorbed() {
    let fs = staged();
    let token = CancelToken::new();
    fs.cancel_after_first_read("/mirror/fail.txt", token.clone());
    let mut cfg = config();
    cfg.skip_failed = true;

    let mut outcome = Outcome::default();
    let err = move_files(&fs, &cfg, &token, &mut outcome).unwrap_err();
    assert!(err.is_cancelled());
    assert!(!outcome.has_partial_failures);
    assert_eq!(fs.read("/mirror/fail.txt").unwrap(), b"will not move");
    assert!(!fs.exists("/real/fail.txt.mirsht"));
    assert!(!fs.exists("/real/fail.txt"));
    // The walk stopped: the next file was never visited.
    assert!(fs.exists("/mirror/ok.txt"));
    assert!(!fs.exists("/real/ok.txt"));
}

#[test]
fn failed_source_removal_keeps_both_copies() {
    let fs = staged();
    fs.fail_on(FaultOp::Remove, "/mirror/fail.txt");

    let err = move_files(&fs, &config(), &CancelToken::new(), &mut Outcome::default()).unwrap_err();
    assert!(matches!(
        err,
        ShuttleError::Move { ref source, .. } if matches!(**source, ShuttleError::SourceRemoval { .. })
    ));
    assert!(fs.exists("/mirror/fail.txt"));
    assert_eq!(fs.read("/real/fail.txt").unwrap(), b"will not move");
}

#[test]
fn dry_run_makes_no_mutations_even_with_faults() {
    let fs = staged();
    fs.add_dir("/mirror/sub/deeper");
    fs.add_file("/real/ok.txt", "already there");
    fs.fail_on(FaultOp::Rename, "fail.txt");
    let mut cfg = config();
    cfg.dry_run = true;
    let before = fs.paths();

    let mut outcome = Outcome::default();
    move_files(&fs, &cfg, &CancelToken::new(), &mut outcome).unwrap();
    assert_eq!(fs.paths(), before);
    assert!(outcome.has_unmoved_files);
    assert!(!outcome.has_partial_failures);
}
