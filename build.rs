//! Build script: pre-flight checks for GPU feature flags.
//!
//! Fails fast with an install hint when a GPU feature is requested but the
//! toolkit is missing, instead of letting whisper-rs-sys die mid-compile.

use std::process::Command;

fn main() {
    if cfg!(feature = "cuda") {
        check_tool(
            "nvcc",
            &["--version"],
            "CUDA toolkit",
            "https://developer.nvidia.com/cuda-downloads",
        );
    }
    if cfg!(feature = "vulkan") {
        check_tool(
            "vulkaninfo",
            &["--summary"],
            "Vulkan SDK",
            "https://vulkan.lunarg.com/",
        );
    }
    if cfg!(feature = "hipblas") {
        check_tool("rocminfo", &[], "ROCm", "https://rocm.docs.amd.com/");
    }
}

fn check_tool(tool: &str, args: &[&str], toolkit: &str, install_url: &str) {
    if Command::new(tool).args(args).output().is_err() {
        panic!(
            "\n`{tool}` not found: {toolkit} is not installed.\n\
             Install it from {install_url}, or build without the feature:\n\
             cargo build --release --features whisper\n"
        );
    }
    println!("cargo::warning={toolkit} detected");
}
