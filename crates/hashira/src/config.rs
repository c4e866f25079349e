use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use hashira_kit::PathResolver;

use crate::error::ServiceError;
use crate::unit::DEFAULT_STOP_TIMEOUT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceLevel {
	/// Per-user agent (`~/Library/LaunchAgents`, `systemctl --user`).
	#[default]
	User,
	/// Machine-wide daemon; managing it needs root.
	System,
}

/// How the OS service manager should run this program.
///
/// Every field has a default so a partial `[service]` table deserializes.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub level: ServiceLevel,
	/// Executable registered with the service manager (default: current exe).
	pub program: Option<PathBuf>,
	#[serde(default)]
	pub args: Vec<String>,
	/// Relative paths resolve against the project root.
	pub working_dir: Option<PathBuf>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
	#[serde(default = "default_true")]
	pub keep_alive: bool,
	#[serde(default = "default_true")]
	pub run_at_load: bool,
	#[serde(default = "default_stop_timeout_secs")]
	pub stop_timeout_secs: u64,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			name: String::new(),
			description: String::new(),
			level: ServiceLevel::default(),
			program: None,
			args: Vec::new(),
			working_dir: None,
			env: BTreeMap::new(),
			keep_alive: true,
			run_at_load: true,
			stop_timeout_secs: default_stop_timeout_secs(),
		}
	}
}

fn default_true() -> bool {
	true
}

fn default_stop_timeout_secs() -> u64 {
	DEFAULT_STOP_TIMEOUT.as_secs()
}

impl ServiceConfig {
	pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: description.into(),
			..Self::default()
		}
	}

	pub fn stop_timeout(&self) -> Duration {
		Duration::from_secs(self.stop_timeout_secs)
	}

	/// Service names end up in file names and launchd labels.
	pub fn validate(&self) -> Result<(), ServiceError> {
		let valid = !self.name.is_empty()
			&& !self.name.starts_with('.')
			&& self
				.name
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
		if valid {
			Ok(())
		} else {
			Err(ServiceError::InvalidName(self.name.clone()))
		}
	}

	/// Fills in the program and makes the working directory absolute.
	pub fn resolve(mut self, root: &PathResolver) -> Self {
		if self.program.is_none() {
			self.program = std::env::current_exe().ok();
		}
		let dir = self.working_dir.take().unwrap_or_else(|| PathBuf::from("."));
		self.working_dir = Some(root.real_path(dir));
		self
	}

	/// Program path followed by its arguments.
	pub fn command_line(&self) -> Vec<String> {
		let program = self
			.program
			.clone()
			.or_else(|| std::env::current_exe().ok())
			.unwrap_or_else(|| PathBuf::from(&self.name));
		let mut line = vec![program.to_string_lossy().to_string()];
		line.extend(self.args.iter().cloned());
		line
	}
}
