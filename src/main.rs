fn main() {
    if let Err(err) = repcoach_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
