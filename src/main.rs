use std::process::ExitCode;

fn main() -> ExitCode {
    scale_publisher_lib::run()
}
