use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("opsuite-{nanos}-{name}"))
}

fn opsuite(store_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_opsuite"))
        .args(args)
        .env("OPSUITE_STORE_DIR", store_dir)
        .env("OPSUITE_CONFIG_PATH", store_dir.join("config.json"))
        .env("OPSUITE_DISABLE_NOTIFICATIONS", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run opsuite")
}

fn read_item(store_dir: &Path, key: &str) -> serde_json::Value {
    let content = std::fs::read_to_string(store_dir.join(format!("{key}.json"))).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn run_command_drives_running_task_to_completion() {
    let store_dir = temp_dir("cli-run");
    let created = opsuite(&store_dir, &["create", "--type", "dumper", "--status", "running"]);
    assert!(created.status.success());

    let output = opsuite(
        &store_dir,
        &["run", "--json", "--config-override", "driver.interval_ms=0"],
    );
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tasks = read_item(&store_dir, "tasks");
    let logs = read_item(&store_dir, "activityLogs");
    std::fs::remove_dir_all(&store_dir).ok();

    // 19 advances from 0 to 95, then one completing tick.
    assert_eq!(summary["ticks"], 20);
    assert_eq!(summary["completed"][0], "TSK001");
    assert_eq!(tasks[0]["status"], "Completed");
    assert_eq!(tasks[0]["progress"], 100);
    assert_eq!(logs[0]["type"], "Task Completed");
    assert_eq!(logs[0]["level"], "success");
    assert_eq!(logs[0]["details"]["taskId"], "TSK001");
}

#[test]
fn run_command_respects_max_ticks_and_step_override() {
    let store_dir = temp_dir("cli-run-limited");
    opsuite(&store_dir, &["create", "--type", "parser", "--status", "running"]);

    let output = opsuite(
        &store_dir,
        &[
            "run",
            "--max-ticks",
            "3",
            "--config-override",
            "driver.interval_ms=0",
            "--config-override",
            "driver.step=10",
        ],
    );
    let tasks = read_item(&store_dir, "tasks");
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("TSK001: 30%"));
    assert!(stdout.contains("Driver idle after 3 tick(s)."));
    assert_eq!(tasks[0]["status"], "Running");
    assert_eq!(tasks[0]["progress"], 30);
}

#[test]
fn run_command_leaves_other_running_tasks_alone() {
    let store_dir = temp_dir("cli-run-single");
    opsuite(&store_dir, &["create", "--type", "scraper", "--status", "running"]);
    opsuite(&store_dir, &["create", "--type", "dumper", "--status", "running"]);

    let output = opsuite(
        &store_dir,
        &[
            "run",
            "--max-ticks",
            "2",
            "--config-override",
            "driver.interval_ms=0",
        ],
    );
    let tasks = read_item(&store_dir, "tasks");
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert_eq!(tasks[0]["id"], "TSK002");
    assert_eq!(tasks[0]["progress"], 10);
    assert_eq!(tasks[1]["id"], "TSK001");
    assert_eq!(tasks[1]["progress"], 0);
}

#[test]
fn run_command_with_idle_store_returns_immediately() {
    let store_dir = temp_dir("cli-run-idle");

    let output = opsuite(&store_dir, &["run", "--json"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["ticks"], 0);
    assert!(summary["completed"].as_array().unwrap().is_empty());
}

#[test]
fn run_command_rejects_malformed_override() {
    let store_dir = temp_dir("cli-run-override");

    let output = opsuite(
        &store_dir,
        &["run", "--config-override", "driver.step=fast"],
    );
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(stderr.contains("driver.step=fast"));
}

#[test]
fn invalid_config_file_falls_back_to_defaults() {
    let store_dir = temp_dir("cli-run-bad-config");
    std::fs::create_dir_all(&store_dir).unwrap();
    std::fs::write(store_dir.join("config.json"), "{ not json").unwrap();

    let output = opsuite(&store_dir, &["list", "--json"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load config"));
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[test]
fn run_command_completes_when_step_lands_on_full_progress() {
    let store_dir = temp_dir("cli-run-step-ten");
    opsuite(&store_dir, &["create", "--type", "scraper", "--status", "running"]);

    let output = opsuite(
        &store_dir,
        &[
            "run",
            "--json",
            "--max-ticks",
            "15",
            "--config-override",
            "driver.interval_ms=0",
            "--config-override",
            "driver.step=10",
        ],
    );
    let tasks = read_item(&store_dir, "tasks");
    let logs = read_item(&store_dir, "activityLogs");
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["ticks"], 10);
    assert_eq!(summary["completed"][0], "TSK001");
    assert_eq!(tasks[0]["status"], "Completed");
    assert_eq!(tasks[0]["progress"], 100);
    let completions = logs
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry["type"] == "Task Completed")
        .count();
    assert_eq!(completions, 1);
}
