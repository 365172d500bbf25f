use std::env;
use std::path::PathBuf;

/// Writes `courier.h` into `OUT_DIR`, or into `COURIER_HEADER_DIR` when set.
fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let out_dir = env::var("COURIER_HEADER_DIR")
        .or_else(|_| env::var("OUT_DIR"))
        .unwrap_or_else(|_| ".".to_string());
    let out = PathBuf::from(out_dir).join("courier.h");

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-env-changed=COURIER_HEADER_DIR");

    let bindings = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("COURIER_H")
        .with_documentation(true)
        .generate();

    match bindings {
        Ok(bindings) => {
            bindings.write_to_file(out);
        }
        Err(err) => println!("cargo:warning=failed to generate C header: {err}"),
    }
}
