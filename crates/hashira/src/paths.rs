use std::path::PathBuf;

use hashira_kit::fs::{self, PathKind, PathResolver};

#[derive(Debug, Clone)]
pub struct ServicePaths {
	pub name: String,
}

impl ServicePaths {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}

	pub fn state_dir(&self) -> PathBuf {
		xdg_home("XDG_STATE_HOME", ".local/state").join(&self.name)
	}

	pub fn config_dir(&self) -> PathBuf {
		xdg_home("XDG_CONFIG_HOME", ".config").join(&self.name)
	}

	pub fn log_dir(&self) -> PathBuf {
		self.state_dir().join("logs")
	}

	pub fn stdout_log(&self) -> PathBuf {
		self.log_dir().join(format!("{}.out.log", self.name))
	}

	pub fn stderr_log(&self) -> PathBuf {
		self.log_dir().join(format!("{}.err.log", self.name))
	}
}

/// Root that relative service paths resolve against.
///
/// A binary started through `cargo run` keeps the current directory (the
/// checkout); an installed binary uses the directory it lives in, since the
/// service manager starts it from an arbitrary cwd.
pub fn project_root() -> PathResolver {
	let cwd = PathResolver::current();
	let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR");
	match manifest_dir {
		Some(dir) if matches!(cwd.path_kind(&dir), Ok(PathKind::Dir)) => cwd,
		_ => PathResolver::new(fs::program_dir()),
	}
}

pub(crate) fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}

/// `$var` when set and non-empty, else `$HOME/<fallback>`, else `/tmp`.
pub(crate) fn xdg_home(var: &str, fallback: &str) -> PathBuf {
	match std::env::var_os(var) {
		Some(dir) if !dir.is_empty() => PathBuf::from(dir),
		_ => home_dir()
			.map(|home| home.join(fallback))
			.unwrap_or_else(|| PathBuf::from("/tmp")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_xdg_home_override_and_fallback() {
		let var = "HASHIRA_TEST_XDG_HOME";
		std::env::set_var(var, "/srv/state");
		assert_eq!(xdg_home(var, ".local/state"), PathBuf::from("/srv/state"));

		std::env::set_var(var, "");
		let fallback = xdg_home(var, ".local/state");
		match home_dir() {
			Some(home) => assert_eq!(fallback, home.join(".local/state")),
			None => assert_eq!(fallback, PathBuf::from("/tmp")),
		}
		std::env::remove_var(var);
	}
}
