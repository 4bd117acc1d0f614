fn main() {
    println!("cargo:rerun-if-env-changed=LBM_LIB_DIR");

    // The modem library is a prebuilt static archive; only link it when the
    // binding is compiled in
    if std::env::var_os("CARGO_FEATURE_LBM").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("LBM_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    } else {
        println!("cargo:warning=LBM_LIB_DIR not set, relying on the default linker search path");
    }
    println!("cargo:rustc-link-lib=static=lbm");
}
