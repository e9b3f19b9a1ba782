use std::process::Command;

fn dashboard(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crewdeck-tui"));
    cmd.current_dir(dir)
        .env_remove("ANTHROPIC_API_KEY")
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_CACHE_HOME", dir.join("cache"))
        .env("HOME", dir);
    cmd
}

#[test]
fn missing_task_prints_usage_and_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = dashboard(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: crewdeck-tui <task>"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_api_key_fails_before_starting_the_coder() {
    let dir = tempfile::tempdir().unwrap();
    let output = dashboard(dir.path())
        .args(["--coder", "crewdeck-no-such-coder", "add a button"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ANTHROPIC_API_KEY"), "stderr: {stderr}");
}
