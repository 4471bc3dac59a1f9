fn main() {
    if let Err(err) = romtrack_lib::run() {
        eprintln!("romtrack: {err:#}");
        std::process::exit(1);
    }
}
