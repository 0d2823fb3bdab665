fn main() {
    if let Err(err) = vector_collector::run() {
        eprintln!("vector-collector: {err:#}");
        std::process::exit(1);
    }
}
