fn main() {
    if let Err(err) = okr_canvas::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
