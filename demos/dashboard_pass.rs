use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    sentiment_watch::cli::run_dashboard_pass(std::env::args().skip(1))
}
