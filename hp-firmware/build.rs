//! Build script for hcp-hp-firmware
//!
//! Generates the C header for the host firmware from the exported
//! functions and `#[repr(C)]` types.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=build.rs");

    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let header = PathBuf::from(&crate_dir).join("include").join("hcp_bridge.h");

    let bindings = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("HCP_BRIDGE_H")
        .with_autogen_warning("/* Generated by cbindgen from hcp-hp-firmware. Do not edit. */")
        .with_sys_include("stdbool.h")
        .with_sys_include("stdint.h")
        .with_sys_include("stddef.h")
        .generate();

    // A missing header must not break the library build
    match bindings {
        Ok(bindings) => {
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=C header not generated: {e}"),
    }
}
