use std::process::ExitCode;

mod app;
mod logging;

fn main() -> ExitCode {
    app::run()
}
