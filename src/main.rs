fn main() {
    if let Err(error) = doit_lib::run() {
        log::error!("fatal: {error}");
        eprintln!("doit: {error}");
        std::process::exit(1);
    }
}
