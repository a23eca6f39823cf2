//! Build-time hints for locating FFmpeg on Windows.
//!
//! `ffmpeg-sys-next` finds FFmpeg through `pkg-config` on Unix, which rarely
//! needs help. On Windows it relies on `FFMPEG_DIR` or vcpkg; when neither is
//! configured the link step fails far from the cause, so warn up front.

use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];
const DEFAULT_TRIPLET: &str = "x64-windows";

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning={}", message.as_ref());
}

fn vcpkg_install_dir(vcpkg_root: &str) -> PathBuf {
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| DEFAULT_TRIPLET.to_string());
    Path::new(vcpkg_root).join("installed").join(triplet)
}

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let targets_windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !targets_windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        warn("FFMPEG_DIR is not set. Install FFmpeg (for example via vcpkg) and point FFMPEG_DIR at it.");
        return;
    };

    let install_dir = vcpkg_install_dir(&vcpkg_root);
    if !install_dir.exists() {
        warn(format!(
            "VCPKG_ROOT is set but {} does not exist; is the ffmpeg port installed?",
            install_dir.display()
        ));
        return;
    }

    warn(format!(
        "Using vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} to skip discovery.",
        install_dir.display()
    ));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("Set VCPKGRS_DYNAMIC=1 if the vcpkg FFmpeg build is dynamic.");
    }
}
