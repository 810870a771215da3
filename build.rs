use std::process::Command;
use std::str;

fn main() {
    // Run on every build so the tag follows new commits.
    let git_tag = Command::new("git")
        .args(["describe", "--tags", "--always", "--broken"])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| {
            str::from_utf8(&output.stdout)
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|tag| !tag.is_empty())
        .unwrap_or_else(|| {
            // Fallback for builds outside a git checkout
            println!("cargo:warning=git describe failed, using \"unknown\" as version tag");
            "unknown".to_string()
        });

    println!("cargo:rustc-env=GIT_TAG={git_tag}");
}
