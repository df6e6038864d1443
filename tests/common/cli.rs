use assert_cmd::Command;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct JvRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

/// A scratch HOME with its own preferences and cache files.
pub struct JvWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl JvWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join("preferences.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join("cache.db")
    }

    pub fn write_preferences(&self, value: &Value) {
        fs::write(
            self.preferences_path(),
            serde_json::to_string_pretty(value).expect("serialize preferences"),
        )
        .expect("write preferences");
    }

    pub fn read_preferences(&self) -> Value {
        let contents = fs::read_to_string(self.preferences_path()).expect("read preferences");
        serde_json::from_str(&contents).expect("preferences json")
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, serde_json::to_string(value).expect("serialize")).expect("write json");
        path
    }
}

pub fn run_jv<I, S>(workspace: &JvWorkspace, args: I, label: &str) -> JvRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jv"));
    cmd.current_dir(&workspace.root);
    cmd.arg("--preferences").arg(workspace.preferences_path());
    cmd.arg("--cache-db").arg(workspace.cache_path());
    cmd.args(args);
    cmd.env("NO_COLOR", "1");
    cmd.env("JV_LOG", "jira_views=debug");
    cmd.env_remove("JV_LOG_FORMAT");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run jv");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let timestamp = SystemTime::now();
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        timestamp,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    JvRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}
