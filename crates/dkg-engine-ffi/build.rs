use std::env;

const LIB_DIR: &str = "TED_LIB_DIR";

fn main() {
    println!("cargo:rerun-if-env-changed={}", LIB_DIR);

    // only the linked engine needs the search path
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }
    if let Some(dir) = env::var_os(LIB_DIR) {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
}
