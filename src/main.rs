fn main() {
    quill::cli::run();
}
