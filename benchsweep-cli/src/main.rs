//! benchsweep binary entry point.

fn main() {
    if let Err(e) = benchsweep_cli::run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
