use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    sentiment_watch::cli::run_list_datasets(std::env::args().skip(1))
}
