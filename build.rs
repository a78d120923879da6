use std::io::Result;
use std::process::Command;

fn main() -> Result<()> {
    // git version for /health, `unknown` outside a checkout
    let git_hash = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");

    // demo gRPC services
    tonic_prost_build::configure().compile_protos(&["proto/demo.proto"], &["proto"])?;

    Ok(())
}
