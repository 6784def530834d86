use std::process::ExitCode;

fn main() -> ExitCode {
    crosscheck_cli::run()
}
