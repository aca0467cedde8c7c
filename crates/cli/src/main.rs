use std::process::ExitCode;

fn main() -> ExitCode {
    quotebridge_cli::run()
}
