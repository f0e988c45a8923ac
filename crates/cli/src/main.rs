use std::process::ExitCode;

fn main() -> ExitCode {
    threadloom_cli::run()
}
