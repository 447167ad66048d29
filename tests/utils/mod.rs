use anyhow::{Context, Result};
use std::process::Command;

use super::common::TestEnvironment;

const PROXMOX_ENV: [&str; 7] = [
    "PROXMOX_HOST",
    "PROXMOX_PORT",
    "PROXMOX_USER",
    "PROXMOX_PASSWORD",
    "PROXMOX_TOKEN_ID",
    "PROXMOX_TOKEN_SECRET",
    "PROXMOX_VALIDATE_CERTS",
];

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Last JSON event printed on stdout or stderr
    pub fn last_event(&self, on_stderr: bool) -> Result<serde_json::Value> {
        let stream = if on_stderr { &self.stderr } else { &self.stdout };
        let line = stream
            .lines()
            .rev()
            .find(|l| l.trim_start().starts_with('{'))
            .with_context(|| format!("no JSON event in output: {stream}"))?;
        Ok(serde_json::from_str(line)?)
    }
}

pub fn run_pve_user(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pve-user"));
    cmd.args(args)
        .env("XDG_CONFIG_HOME", env.config_home())
        .env("XDG_DATA_HOME", env.data_home())
        .current_dir(env.path());
    for var in PROXMOX_ENV {
        cmd.env_remove(var);
    }

    let output = cmd.output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
