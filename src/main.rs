fn main() {
    std::process::exit(clipstack_lib::run());
}
