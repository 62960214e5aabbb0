use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Linux and macOS find FFmpeg through pkg-config without help.
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows" {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match env::var("VCPKG_ROOT") {
        Ok(root) => check_vcpkg_install(&root),
        Err(_) => println!(
            "cargo:warning=drag2frames needs FFmpeg. On Windows, install it with vcpkg and set FFMPEG_DIR (or VCPKG_ROOT)."
        ),
    }
}

fn check_vcpkg_install(root: &str) {
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(root).join("installed").join(&triplet);

    if !install.exists() {
        println!(
            "cargo:warning=No vcpkg FFmpeg found at {} (triplet {triplet}).",
            install.display()
        );
        return;
    }

    println!(
        "cargo:warning=Using vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to silence this warning.",
        install.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 if your vcpkg FFmpeg is a dynamic build.");
    }
}
