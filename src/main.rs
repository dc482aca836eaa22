fn main() -> std::process::ExitCode {
    log_puller_lib::run()
}
