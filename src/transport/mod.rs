/// Filesystem transport for dataset files.
pub mod fs;
