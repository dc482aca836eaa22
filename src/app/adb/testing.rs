use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::app::adb::bridge::DeviceBridge;

/// In-memory bridge that replays canned answers and records every call in order.
#[derive(Default)]
pub struct ScriptedBridge {
    pub listings: HashMap<String, Vec<String>>,
    pub shell_outputs: HashMap<String, String>,
    pub failing_pulls: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedBridge {
    pub fn with_listing(mut self, path: &str, files: &[&str]) -> Self {
        self.listings
            .insert(path.to_string(), files.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_shell(mut self, command: &str, output: &str) -> Self {
        self.shell_outputs
            .insert(command.to_string(), output.to_string());
        self
    }

    pub fn with_failing_pull(mut self, remote_path: &str) -> Self {
        self.failing_pulls.insert(remote_path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls").push(call);
    }
}

impl DeviceBridge for ScriptedBridge {
    fn list_directory(&self, path: &str) -> Vec<String> {
        self.record(format!("ls {path}"));
        self.listings.get(path).cloned().unwrap_or_default()
    }

    fn pull(&self, remote_path: &str, local_dir: &str) -> String {
        self.record(format!("pull {remote_path} {local_dir}"));
        if self.failing_pulls.contains(remote_path) {
            return format!("Pull failed for {remote_path}: remote object does not exist");
        }
        format!("{remote_path}: 1 file pulled")
    }

    fn run_shell(&self, command: &str) -> String {
        self.record(format!("shell {command}"));
        self.shell_outputs.get(command).cloned().unwrap_or_default()
    }
}
