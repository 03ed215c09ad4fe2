use owo_colors::OwoColorize;

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_error(msg: &str) {
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{} {}", "fatal:".red().bold(), msg);
    } else {
        eprintln!("fatal: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix), e.g. the banner and the
/// configuration echo which users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// Print the version banner, bold when attached to a terminal.
pub fn print_banner(version: &str) {
    let line = format!("MirrorShuttle (v{version}) - Keep your organization, ditch the ransomware.");
    if is_tty() {
        println!("{}\n", line.bold());
    } else {
        println!("{}\n", line);
    }
}
