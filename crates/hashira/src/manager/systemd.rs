use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{ServiceConfig, ServiceLevel};
use crate::error::ServiceError;
use crate::manager::{require_root, run_tool, ServiceManager, ServiceStatus};
use crate::paths::xdg_home;

const SYSTEMCTL: &str = "systemctl";

/// True when the machine was booted with systemd as init.
pub fn is_available() -> bool {
	Path::new("/run/systemd/system").is_dir()
}

pub struct SystemdManager {
	config: ServiceConfig,
}

impl SystemdManager {
	pub fn new(config: ServiceConfig) -> Self {
		Self { config }
	}

	pub fn unit_name(&self) -> String {
		format!("{}.service", self.config.name)
	}

	pub fn unit_path(&self) -> PathBuf {
		let dir = match self.config.level {
			ServiceLevel::System => PathBuf::from("/etc/systemd/system"),
			ServiceLevel::User => xdg_home("XDG_CONFIG_HOME", ".config").join("systemd").join("user"),
		};
		dir.join(self.unit_name())
	}

	/// Contents of the unit file written on install.
	pub fn render_unit(&self) -> String {
		let config = &self.config;
		let description = if config.description.is_empty() {
			config.name.as_str()
		} else {
			config.description.as_str()
		};
		let exec_start = config
			.command_line()
			.iter()
			.map(|arg| quote_arg(arg))
			.collect::<Vec<_>>()
			.join(" ");
		let wanted_by = match config.level {
			ServiceLevel::System => "multi-user.target",
			ServiceLevel::User => "default.target",
		};

		let mut unit = format!(
			"[Unit]\nDescription={}\nAfter=network.target\n\n[Service]\nType=simple\nExecStart={}\n",
			description, exec_start
		);
		if let Some(dir) = &config.working_dir {
			unit.push_str(&format!("WorkingDirectory={}\n", quote_arg(&dir.to_string_lossy())));
		}
		for (key, value) in &config.env {
			unit.push_str(&format!("Environment={}\n", quote_arg(&format!("{}={}", key, value))));
		}
		let restart = if config.keep_alive { "always" } else { "no" };
		// leave room for the in-process stop timeout before systemd escalates to SIGKILL
		unit.push_str(&format!(
			"Restart={}\nTimeoutStopSec={}\n\n[Install]\nWantedBy={}\n",
			restart,
			config.stop_timeout_secs + 5,
			wanted_by
		));
		unit
	}

	fn systemctl(&self, args: &[&str]) -> Result<String, ServiceError> {
		let mut full: Vec<&str> = Vec::with_capacity(args.len() + 1);
		if self.config.level == ServiceLevel::User {
			full.push("--user");
		}
		full.extend_from_slice(args);
		run_tool(SYSTEMCTL, &full)
	}

	fn require_installed(&self) -> Result<PathBuf, ServiceError> {
		let path = self.unit_path();
		if path.exists() {
			Ok(path)
		} else {
			Err(ServiceError::NotInstalled(self.config.name.clone()))
		}
	}

	fn is_active(&self) -> Result<String, ServiceError> {
		let unit = self.unit_name();
		let mut cmd = Command::new(SYSTEMCTL);
		if self.config.level == ServiceLevel::User {
			cmd.arg("--user");
		}
		// non-zero exit just means "not active", stdout still has the state
		let output = cmd
			.args(["is-active", &unit])
			.output()
			.map_err(|e| ServiceError::io(format!("failed to run {}", SYSTEMCTL), e))?;
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	}
}

impl ServiceManager for SystemdManager {
	fn name(&self) -> &str {
		&self.config.name
	}

	fn platform(&self) -> &'static str {
		"systemd"
	}

	fn check_access(&self) -> Result<(), ServiceError> {
		require_root(self.config.level, &self.config.name)
	}

	fn install(&self) -> Result<(), ServiceError> {
		let path = self.unit_path();
		if path.exists() {
			return Err(ServiceError::AlreadyInstalled {
				name: self.config.name.clone(),
				path,
			});
		}
		if let Some(dir) = path.parent() {
			std::fs::create_dir_all(dir)
				.map_err(|e| ServiceError::io(format!("failed to create {}", dir.display()), e))?;
		}
		std::fs::write(&path, self.render_unit())
			.map_err(|e| ServiceError::io(format!("failed to write {}", path.display()), e))?;
		tracing::info!("{}: created {}", self.config.name, path.display());

		self.systemctl(&["daemon-reload"])?;
		if self.config.run_at_load {
			self.systemctl(&["enable", &self.unit_name()])?;
		}
		Ok(())
	}

	fn uninstall(&self) -> Result<(), ServiceError> {
		let path = self.require_installed()?;
		let unit = self.unit_name();
		tolerate_failure(self.systemctl(&["stop", &unit]))?;
		tolerate_failure(self.systemctl(&["disable", &unit]))?;
		std::fs::remove_file(&path)
			.map_err(|e| ServiceError::io(format!("failed to remove {}", path.display()), e))?;
		self.systemctl(&["daemon-reload"])?;
		tracing::info!("{}: unit removed", self.config.name);
		Ok(())
	}

	fn start(&self) -> Result<(), ServiceError> {
		self.require_installed()?;
		self.systemctl(&["start", &self.unit_name()])?;
		tracing::info!("{}: started", self.config.name);
		Ok(())
	}

	fn stop(&self) -> Result<(), ServiceError> {
		self.require_installed()?;
		self.systemctl(&["stop", &self.unit_name()])?;
		tracing::info!("{}: stopped", self.config.name);
		Ok(())
	}

	fn restart(&self) -> Result<(), ServiceError> {
		self.require_installed()?;
		self.systemctl(&["restart", &self.unit_name()])?;
		tracing::info!("{}: restarted", self.config.name);
		Ok(())
	}

	fn status(&self) -> Result<ServiceStatus, ServiceError> {
		if !self.unit_path().exists() {
			return Ok(ServiceStatus::NotInstalled);
		}
		Ok(parse_active_state(&self.is_active()?))
	}
}

/// Maps `systemctl is-active` output to a status.
pub fn parse_active_state(state: &str) -> ServiceStatus {
	match state.trim() {
		"active" | "activating" | "reloading" => ServiceStatus::Running,
		"inactive" | "failed" | "deactivating" => ServiceStatus::Stopped,
		_ => ServiceStatus::Unknown,
	}
}

/// Cleanup steps may fail on a unit that never ran; permission problems
/// still abort.
fn tolerate_failure(result: Result<String, ServiceError>) -> Result<(), ServiceError> {
	match result {
		Err(e) if e.is_permission_error() => Err(e),
		Err(e) => {
			tracing::debug!("ignoring: {}", e);
			Ok(())
		}
		Ok(_) => Ok(()),
	}
}

/// Quotes one word for `ExecStart=` / `Environment=` lines.
fn quote_arg(arg: &str) -> String {
	let escaped = arg.replace('%', "%%").replace('$', "$$");
	let needs_quotes = escaped.is_empty()
		|| escaped
			.chars()
			.any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ';'));
	if !needs_quotes {
		return escaped;
	}
	let mut quoted = String::with_capacity(escaped.len() + 2);
	quoted.push('"');
	for c in escaped.chars() {
		if c == '"' || c == '\\' {
			quoted.push('\\');
		}
		quoted.push(c);
	}
	quoted.push('"');
	quoted
}
