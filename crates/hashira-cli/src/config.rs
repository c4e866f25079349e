use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hashira::{ServiceConfig, ServicePaths};
use hashira_kit::PathResolver;

pub const APP_NAME: &str = "hashira";
pub const CONFIG_ENV: &str = "HASHIRA_CONFIG";

// ── config.toml ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CliConfig {
	#[serde(default)]
	pub service: ServiceConfig,
	#[serde(default)]
	pub run: RunConfig,
}

/// The command wrapped as the service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunConfig {
	pub command: Option<String>,
	pub dir: Option<String>,
	#[serde(default)]
	pub env: BTreeMap<String, String>,
}

impl CliConfig {
	pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(content)
	}

	/// Service registration for this config. The installed service finds its
	/// way back to `config_path` through the environment.
	pub fn service_config(&self, root: &PathResolver, config_path: &Path) -> ServiceConfig {
		let mut service = self.service.clone();
		if service.name.is_empty() {
			service.name = APP_NAME.to_string();
		}
		if service.description.is_empty() {
			service.description = match &self.run.command {
				Some(command) => format!("runs `{}`", command),
				None => format!("{} service", service.name),
			};
		}
		// the job and the installed unit must agree on one absolute directory
		service.working_dir = match &self.run.dir {
			Some(dir) => Some(resolve_dir(root, dir)),
			None => service
				.working_dir
				.as_ref()
				.map(|dir| resolve_dir(root, &dir.to_string_lossy())),
		};
		service.env.extend(self.run.env.clone());
		service
			.env
			.insert(CONFIG_ENV.to_string(), config_path.to_string_lossy().to_string());
		service
	}
}

/// `$HASHIRA_CONFIG`, else `config.toml` in the XDG config dir. Always absolute.
pub fn config_path() -> PathBuf {
	let path = std::env::var_os(CONFIG_ENV)
		.map(PathBuf::from)
		.unwrap_or_else(|| ServicePaths::new(APP_NAME).config_dir().join("config.toml"));
	PathResolver::current().real_path(path)
}

pub fn load_config(path: &Path) -> CliConfig {
	if path.exists() {
		match std::fs::read_to_string(path) {
			Ok(content) => match CliConfig::parse(&content) {
				Ok(config) => return config,
				Err(e) => tracing::warn!("failed to parse {}: {}", path.display(), e),
			},
			Err(e) => tracing::warn!("failed to read {}: {}", path.display(), e),
		}
	}
	CliConfig::default()
}

/// `~` expands to `$HOME`, relative paths resolve against `root`.
pub fn resolve_dir(root: &PathResolver, dir: &str) -> PathBuf {
	root.real_path(expand_tilde(dir))
}

pub fn expand_tilde(path: &str) -> PathBuf {
	if path == "~" {
		if let Ok(home) = std::env::var("HOME") {
			return PathBuf::from(home);
		}
	} else if let Some(rest) = path.strip_prefix("~/") {
		if let Ok(home) = std::env::var("HOME") {
			return PathBuf::from(home).join(rest);
		}
	}
	PathBuf::from(path)
}
