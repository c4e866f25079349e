use std::path::{Path, PathBuf};

use crate::config::{ServiceConfig, ServiceLevel};
use crate::error::ServiceError;
use crate::manager::{require_root, run_tool, ServiceManager, ServiceStatus};
use crate::paths::{home_dir, ServicePaths};

const LAUNCHCTL: &str = "launchctl";

pub fn is_available() -> bool {
	Path::new("/bin/launchctl").exists()
}

/// One row of `launchctl list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
	pub pid: Option<u32>,
	pub last_exit: Option<i32>,
}

pub struct LaunchdManager {
	config: ServiceConfig,
	paths: ServicePaths,
}

impl LaunchdManager {
	pub fn new(config: ServiceConfig) -> Self {
		let paths = ServicePaths::new(config.name.clone());
		Self { config, paths }
	}

	pub fn label(&self) -> &str {
		&self.config.name
	}

	pub fn plist_path(&self) -> PathBuf {
		let dir = match self.config.level {
			ServiceLevel::User => home_dir()
				.unwrap_or_else(|| PathBuf::from("/tmp"))
				.join("Library")
				.join("LaunchAgents"),
			ServiceLevel::System => PathBuf::from("/Library/LaunchDaemons"),
		};
		dir.join(format!("{}.plist", self.label()))
	}

	fn domain(&self) -> String {
		match self.config.level {
			ServiceLevel::User => format!("gui/{}", nix::unistd::getuid()),
			ServiceLevel::System => "system".to_string(),
		}
	}

	fn target(&self) -> String {
		format!("{}/{}", self.domain(), self.label())
	}

	/// The job definition written to disk on install.
	pub fn plist(&self) -> plist::Value {
		let mut dict = plist::Dictionary::new();
		dict.insert("Label".to_string(), plist::Value::String(self.label().to_string()));

		let program_args: Vec<plist::Value> = self
			.config
			.command_line()
			.into_iter()
			.map(plist::Value::String)
			.collect();
		dict.insert("ProgramArguments".to_string(), plist::Value::Array(program_args));

		if let Some(dir) = &self.config.working_dir {
			dict.insert(
				"WorkingDirectory".to_string(),
				plist::Value::String(dir.to_string_lossy().to_string()),
			);
		}
		dict.insert("KeepAlive".to_string(), plist::Value::Boolean(self.config.keep_alive));
		dict.insert("RunAtLoad".to_string(), plist::Value::Boolean(self.config.run_at_load));
		dict.insert(
			"StandardOutPath".to_string(),
			plist::Value::String(self.paths.stdout_log().to_string_lossy().to_string()),
		);
		dict.insert(
			"StandardErrorPath".to_string(),
			plist::Value::String(self.paths.stderr_log().to_string_lossy().to_string()),
		);

		if !self.config.env.is_empty() {
			let mut env_dict = plist::Dictionary::new();
			for (k, v) in &self.config.env {
				env_dict.insert(k.clone(), plist::Value::String(v.clone()));
			}
			dict.insert("EnvironmentVariables".to_string(), plist::Value::Dictionary(env_dict));
		}

		plist::Value::Dictionary(dict)
	}

	fn loaded_entry(&self) -> Option<ListEntry> {
		let stdout = run_tool(LAUNCHCTL, &["list"]).ok()?;
		parse_launchctl_list(&stdout, self.label())
	}

	fn require_installed(&self) -> Result<PathBuf, ServiceError> {
		let path = self.plist_path();
		if path.exists() {
			Ok(path)
		} else {
			Err(ServiceError::NotInstalled(self.label().to_string()))
		}
	}
}

impl ServiceManager for LaunchdManager {
	fn name(&self) -> &str {
		self.label()
	}

	fn platform(&self) -> &'static str {
		"launchd"
	}

	fn check_access(&self) -> Result<(), ServiceError> {
		require_root(self.config.level, self.label())
	}

	fn install(&self) -> Result<(), ServiceError> {
		let path = self.plist_path();
		if path.exists() {
			return Err(ServiceError::AlreadyInstalled {
				name: self.label().to_string(),
				path,
			});
		}

		if let Some(dir) = path.parent() {
			std::fs::create_dir_all(dir)
				.map_err(|e| ServiceError::io(format!("failed to create {}", dir.display()), e))?;
		}
		let log_dir = self.paths.log_dir();
		std::fs::create_dir_all(&log_dir)
			.map_err(|e| ServiceError::io(format!("failed to create {}", log_dir.display()), e))?;

		let mut xml = Vec::new();
		self.plist()
			.to_writer_xml(&mut xml)
			.map_err(|e| ServiceError::Plist {
				path: path.clone(),
				message: e.to_string(),
			})?;
		std::fs::write(&path, xml)
			.map_err(|e| ServiceError::io(format!("failed to write {}", path.display()), e))?;

		tracing::info!("{}: created {}", self.label(), path.display());
		Ok(())
	}

	fn uninstall(&self) -> Result<(), ServiceError> {
		let path = self.require_installed()?;
		if self.loaded_entry().is_some() {
			run_tool(LAUNCHCTL, &["bootout", &self.target()])?;
			tracing::info!("{}: unloaded", self.label());
		}
		std::fs::remove_file(&path)
			.map_err(|e| ServiceError::io(format!("failed to remove {}", path.display()), e))?;
		tracing::info!("{}: plist removed", self.label());
		Ok(())
	}

	fn start(&self) -> Result<(), ServiceError> {
		let path = self.require_installed()?;

		if self.loaded_entry().is_some() {
			run_tool(LAUNCHCTL, &["kickstart", &self.target()])?;
			tracing::info!("{}: started (kickstart)", self.label());
			return Ok(());
		}

		let plist = path.to_string_lossy();
		match run_tool(LAUNCHCTL, &["bootstrap", &self.domain(), &plist]) {
			Ok(_) => {
				tracing::info!("{}: loaded and started", self.label());
				Ok(())
			}
			Err(e) if e.is_permission_error() => Err(e),
			Err(e) => {
				// older launchctl without bootstrap support
				run_tool(LAUNCHCTL, &["load", &plist]).map_err(|_| e)?;
				tracing::info!("{}: loaded (legacy)", self.label());
				Ok(())
			}
		}
	}

	fn stop(&self) -> Result<(), ServiceError> {
		let path = self.require_installed()?;
		if self.loaded_entry().is_none() {
			tracing::info!("{}: not loaded", self.label());
			return Ok(());
		}

		let target = self.target();
		match run_tool(LAUNCHCTL, &["bootout", &target]) {
			Ok(_) => {
				tracing::info!("{}: stopped and unloaded", self.label());
				Ok(())
			}
			Err(e) if e.is_permission_error() => Err(e),
			Err(_) => {
				let _ = run_tool(LAUNCHCTL, &["kill", "SIGTERM", &target]);
				run_tool(LAUNCHCTL, &["unload", &path.to_string_lossy()])?;
				tracing::info!("{}: stopped", self.label());
				Ok(())
			}
		}
	}

	fn restart(&self) -> Result<(), ServiceError> {
		self.require_installed()?;
		if self.loaded_entry().is_none() {
			return self.start();
		}
		run_tool(LAUNCHCTL, &["kickstart", "-k", &self.target()])?;
		tracing::info!("{}: restarted", self.label());
		Ok(())
	}

	fn status(&self) -> Result<ServiceStatus, ServiceError> {
		if !self.plist_path().exists() {
			return Ok(ServiceStatus::NotInstalled);
		}
		Ok(match self.loaded_entry() {
			Some(ListEntry { pid: Some(_), .. }) => ServiceStatus::Running,
			_ => ServiceStatus::Stopped,
		})
	}
}

/// Finds `label` in `launchctl list` output (`PID<TAB>Status<TAB>Label`).
pub fn parse_launchctl_list(stdout: &str, label: &str) -> Option<ListEntry> {
	for line in stdout.lines().skip(1) {
		let parts: Vec<&str> = line.split('\t').collect();
		if parts.len() < 3 || parts[2].trim() != label {
			continue;
		}
		return Some(ListEntry {
			pid: parts[0].trim().parse::<u32>().ok(),
			last_exit: parts[1].trim().parse::<i32>().ok(),
		});
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;

	fn manager() -> LaunchdManager {
		let mut config = ServiceConfig::new("com.example.web", "web server");
		config.program = Some(PathBuf::from("/usr/local/bin/web"));
		config.args = vec!["--port".into(), "8080".into()];
		config.working_dir = Some(PathBuf::from("/srv/web"));
		config.env = BTreeMap::from([("RUST_LOG".to_string(), "info".to_string())]);
		config.keep_alive = false;
		LaunchdManager::new(config)
	}

	#[test]
	fn test_parse_launchctl_list() {
		let out = "PID\tStatus\tLabel\n-\t0\tcom.apple.foo\n4321\t0\tcom.example.web\n-\t78\tcom.example.crashy\n";
		assert_eq!(
			parse_launchctl_list(out, "com.example.web"),
			Some(ListEntry { pid: Some(4321), last_exit: Some(0) })
		);
		assert_eq!(
			parse_launchctl_list(out, "com.example.crashy"),
			Some(ListEntry { pid: None, last_exit: Some(78) })
		);
		assert_eq!(parse_launchctl_list(out, "com.example"), None);
		assert_eq!(parse_launchctl_list("", "com.example.web"), None);
	}

	#[test]
	fn test_plist_contents() {
		let value = manager().plist();
		let dict = value.as_dictionary().unwrap();

		assert_eq!(dict.get("Label").and_then(|v| v.as_string()), Some("com.example.web"));
		let args: Vec<&str> = dict
			.get("ProgramArguments")
			.and_then(|v| v.as_array())
			.unwrap()
			.iter()
			.filter_map(|v| v.as_string())
			.collect();
		assert_eq!(args, vec!["/usr/local/bin/web", "--port", "8080"]);
		assert_eq!(dict.get("WorkingDirectory").and_then(|v| v.as_string()), Some("/srv/web"));
		assert_eq!(dict.get("KeepAlive").and_then(|v| v.as_boolean()), Some(false));
		assert_eq!(dict.get("RunAtLoad").and_then(|v| v.as_boolean()), Some(true));

		let env = dict.get("EnvironmentVariables").and_then(|v| v.as_dictionary()).unwrap();
		assert_eq!(env.get("RUST_LOG").and_then(|v| v.as_string()), Some("info"));

		let stdout = dict.get("StandardOutPath").and_then(|v| v.as_string()).unwrap();
		assert!(stdout.ends_with("com.example.web.out.log"));
	}

	#[test]
	fn test_plist_path_by_level() {
		let mut m = manager();
		assert!(m.plist_path().ends_with("Library/LaunchAgents/com.example.web.plist"));
		m.config.level = ServiceLevel::System;
		assert_eq!(m.plist_path(), PathBuf::from("/Library/LaunchDaemons/com.example.web.plist"));
		assert_eq!(m.domain(), "system");
		assert_eq!(m.target(), "system/com.example.web");
	}
}
