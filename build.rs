use std::{path::Path, process::Command, time::SystemTime};

fn main() {
  let now = SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);
  println!("cargo:rustc-env=BUILD_TIME={}", now);

  println!("cargo:rerun-if-changed=.git/HEAD");
  if Path::new(".git/refs/heads").exists() {
    println!("cargo:rerun-if-changed=.git/refs/heads");
  }

  let branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_else(|| "unknown".into());
  let commit = git(&["rev-parse", "HEAD"]).unwrap_or_else(|| "unknown".into());
  let commit_short: String = if commit == "unknown" {
    commit.clone()
  } else {
    commit.chars().take(7).collect()
  };
  let dirty = git(&["status", "--porcelain"])
    .map(|s| !s.is_empty())
    .unwrap_or(false);

  println!("cargo:rustc-env=GIT_BRANCH={}", branch);
  println!("cargo:rustc-env=GIT_COMMIT={}", commit);
  println!("cargo:rustc-env=GIT_COMMIT_SHORT={}", commit_short);
  println!("cargo:rustc-env=GIT_DIRTY={}", dirty);
}

fn git(args: &[&str]) -> Option<String> {
  let output = Command::new("git").args(args).output().ok()?;
  if !output.status.success() {
    return None;
  }
  Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
