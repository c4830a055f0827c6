/// JSON dataset files under a data directory.
pub mod json_file;
