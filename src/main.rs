fn main() -> std::process::ExitCode {
    toko_dashboard_lib::run()
}
