//! OS service managers.
//!
//! [`ServiceManager`] is the seam between the launcher and the platform:
//! launchd on macOS, systemd on Linux. Tests plug in their own implementation
//! through [`Launcher::with_factory`](crate::Launcher::with_factory).

pub mod launchd;
pub mod systemd;

use std::fmt;
use std::process::Command;

use crate::config::{ServiceConfig, ServiceLevel};
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
	Running,
	Stopped,
	NotInstalled,
	Unknown,
}

impl fmt::Display for ServiceStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ServiceStatus::Running => "running",
			ServiceStatus::Stopped => "stopped",
			ServiceStatus::NotInstalled => "not installed",
			ServiceStatus::Unknown => "unknown",
		};
		f.write_str(s)
	}
}

pub trait ServiceManager: Send + Sync {
	/// Name the service is registered under.
	fn name(&self) -> &str;

	/// Short platform tag for log lines, e.g. `launchd`.
	fn platform(&self) -> &'static str;

	/// Whether this process may manage the service at all.
	fn check_access(&self) -> Result<(), ServiceError> {
		Ok(())
	}

	fn install(&self) -> Result<(), ServiceError>;
	fn uninstall(&self) -> Result<(), ServiceError>;
	fn start(&self) -> Result<(), ServiceError>;
	fn stop(&self) -> Result<(), ServiceError>;
	fn restart(&self) -> Result<(), ServiceError>;
	fn status(&self) -> Result<ServiceStatus, ServiceError>;
}

/// Picks the service manager of the running system.
pub fn native(config: &ServiceConfig) -> Result<Box<dyn ServiceManager>, ServiceError> {
	config.validate()?;
	detect(config).ok_or(ServiceError::NoServiceSystemDetected)
}

#[cfg(target_os = "macos")]
fn detect(config: &ServiceConfig) -> Option<Box<dyn ServiceManager>> {
	if launchd::is_available() {
		Some(Box::new(launchd::LaunchdManager::new(config.clone())))
	} else {
		None
	}
}

#[cfg(target_os = "linux")]
fn detect(config: &ServiceConfig) -> Option<Box<dyn ServiceManager>> {
	if systemd::is_available() {
		Some(Box::new(systemd::SystemdManager::new(config.clone())))
	} else {
		None
	}
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn detect(_config: &ServiceConfig) -> Option<Box<dyn ServiceManager>> {
	None
}

/// System-level services can only be managed by root.
pub(crate) fn require_root(level: ServiceLevel, name: &str) -> Result<(), ServiceError> {
	if level == ServiceLevel::System && !nix::unistd::geteuid().is_root() {
		return Err(ServiceError::PermissionDenied(format!(
			"{}: system services must be managed as root",
			name
		)));
	}
	Ok(())
}

/// Runs a service-manager tool and returns its stdout.
pub(crate) fn run_tool(program: &str, args: &[&str]) -> Result<String, ServiceError> {
	tracing::debug!("running {} {}", program, args.join(" "));
	let output = Command::new(program)
		.args(args)
		.output()
		.map_err(|e| ServiceError::io(format!("failed to run {}", program), e))?;

	if output.status.success() {
		return Ok(String::from_utf8_lossy(&output.stdout).to_string());
	}

	let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
	if is_permission_message(&stderr) {
		return Err(ServiceError::PermissionDenied(format!(
			"{} {}: {}",
			program,
			args.join(" "),
			stderr
		)));
	}
	Err(ServiceError::Command {
		program: program.to_string(),
		args: args.iter().map(|a| a.to_string()).collect(),
		stderr,
	})
}

fn is_permission_message(stderr: &str) -> bool {
	let lower = stderr.to_lowercase();
	[
		"permission denied",
		"access denied",
		"operation not permitted",
		"authentication required",
		"authentication is required",
	]
	.iter()
	.any(|needle| lower.contains(needle))
}
