fn main() {
    if let Err(err) = diceplot_rs::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
