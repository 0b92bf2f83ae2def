use std::process::Command;

fn main() {
    let sha = stdout_of("git", &["describe", "--always", "--dirty", "--abbrev=8"])
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=BUILD_GIT_SHA={sha}");
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp());

    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Reproducible builds pin the time through `SOURCE_DATE_EPOCH`; otherwise
/// ask the system clock for UTC.
fn build_timestamp() -> String {
    if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
        if let Some(stamp) = stdout_of("date", &["-u", "-d", &format!("@{epoch}"), "+%Y-%m-%dT%H:%M:%SZ"]) {
            return stamp;
        }
        return format!("epoch {epoch}");
    }
    stdout_of("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"])
        .or_else(|| {
            stdout_of(
                "powershell",
                &["-NoProfile", "-Command", "[DateTime]::UtcNow.ToString('yyyy-MM-ddTHH:mm:ssZ')"],
            )
        })
        .unwrap_or_else(|| "unknown".into())
}

fn stdout_of(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
