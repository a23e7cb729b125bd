use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    scss_bundler::cli::run()
}
