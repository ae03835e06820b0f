use std::process::Command;

fn main() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Surfaced in the startup log line of the binary.
    println!("cargo:rustc-env=WALLET_LEDGER_BUILD={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
}
