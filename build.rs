//! Build script which records information about the program build for the metadata output file.
fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");
}
