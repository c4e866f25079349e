use std::ffi::OsString;
use std::io::Write;
use std::sync::{Arc, OnceLock};

use crate::commands::{self, Locale, ServiceCommand};
use crate::config::ServiceConfig;
use crate::error::{LaunchError, ServiceError};
use crate::manager::{self, ServiceManager};
use crate::paths;
use crate::supervisor;
use crate::unit::{ServiceFn, ServiceUnit};

/// Builds the service manager for a resolved config.
pub type ManagerFactory =
	Box<dyn Fn(&ServiceConfig) -> Result<Box<dyn ServiceManager>, ServiceError> + Send + Sync>;

/// Outcome of constructing the service manager, computed once per launcher.
///
/// A permission error leaves the manager in place: the process can still be
/// supervised, only the management subcommands are refused.
pub struct LaunchState {
	manager: Option<Box<dyn ServiceManager>>,
	error: Option<ServiceError>,
}

impl LaunchState {
	pub fn manager(&self) -> Option<&dyn ServiceManager> {
		self.manager.as_deref()
	}

	pub fn error(&self) -> Option<&ServiceError> {
		self.error.as_ref()
	}
}

/// Entry point for a program that wants to run as an OS service.
///
/// ```no_run
/// # async fn demo() -> Result<(), hashira::LaunchError> {
/// let launcher = hashira::Launcher::new("ticker", "prints the time", || {
/// 	loop {
/// 		std::thread::sleep(std::time::Duration::from_secs(1));
/// 	}
/// });
/// launcher.run().await
/// # }
/// ```
pub struct Launcher {
	config: ServiceConfig,
	run: ServiceFn,
	factory: ManagerFactory,
	locale: Locale,
	state: OnceLock<LaunchState>,
}

impl Launcher {
	pub fn new<F>(name: impl Into<String>, description: impl Into<String>, run: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		Self {
			config: ServiceConfig::new(name, description),
			run: Arc::new(run),
			factory: Box::new(manager::native),
			locale: Locale::from_env(),
			state: OnceLock::new(),
		}
	}

	/// Replaces everything but the name and description.
	pub fn with_config(mut self, config: ServiceConfig) -> Self {
		let name = std::mem::take(&mut self.config.name);
		let description = std::mem::take(&mut self.config.description);
		self.config = ServiceConfig {
			name,
			description,
			..config
		};
		self
	}

	pub fn with_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&ServiceConfig) -> Result<Box<dyn ServiceManager>, ServiceError> + Send + Sync + 'static,
	{
		self.factory = Box::new(factory);
		self
	}

	pub fn with_locale(mut self, locale: Locale) -> Self {
		self.locale = locale;
		self
	}

	pub fn config(&self) -> &ServiceConfig {
		&self.config
	}

	/// Constructs the service manager on first use and returns the cached
	/// result afterwards.
	pub fn launch(&self) -> &LaunchState {
		self.state.get_or_init(|| {
			let config = self.config.clone().resolve(&paths::project_root());
			match (self.factory)(&config) {
				Ok(manager) => {
					let error = manager.check_access().err();
					if let Some(e) = &error {
						tracing::warn!("{}: {}", config.name, e);
					}
					tracing::debug!("{}: using {}", config.name, manager.platform());
					LaunchState {
						manager: Some(manager),
						error,
					}
				}
				Err(e) => {
					tracing::debug!("{}: no service manager: {}", config.name, e);
					LaunchState {
						manager: None,
						error: Some(e),
					}
				}
			}
		})
	}

	/// The manager, if it was built and may be used.
	pub fn check(&self) -> Result<&dyn ServiceManager, ServiceError> {
		let state = self.launch();
		if let Some(e) = state.error() {
			return Err(e.clone());
		}
		state.manager().ok_or(ServiceError::NoServiceSystemDetected)
	}

	/// Runs one management subcommand, writing user-facing output to `out`.
	pub fn dispatch<W: Write>(&self, cmd: ServiceCommand, out: &mut W) -> Result<(), ServiceError> {
		let manager = self.check()?;
		match cmd {
			ServiceCommand::Install => {
				manager.install()?;
				manager.start()?;
			}
			ServiceCommand::Uninstall => manager.uninstall()?,
			ServiceCommand::Start => manager.start()?,
			ServiceCommand::Stop => manager.stop()?,
			ServiceCommand::Restart => manager.restart()?,
			ServiceCommand::Status => {
				let status = manager.status()?;
				writeln!(out, "{}: {}", manager.name(), status)
					.map_err(|e| ServiceError::io("failed to write status", e))?;
			}
		}
		Ok(())
	}

	/// Like [`dispatch`](Self::dispatch) but exits the process with status 1
	/// on failure.
	pub fn execute(&self, cmd: ServiceCommand) {
		let mut stdout = std::io::stdout();
		if let Err(e) = self.dispatch(cmd, &mut stdout) {
			eprintln!("error: {}", e);
			std::process::exit(1);
		}
	}

	pub async fn run(&self) -> Result<(), LaunchError> {
		self.run_from(std::env::args_os()).await
	}

	/// Parses `args` and either runs a management subcommand or the service
	/// itself.
	pub async fn run_from<I, T>(&self, args: I) -> Result<(), LaunchError>
	where
		I: IntoIterator<Item = T>,
		T: Into<OsString> + Clone,
	{
		let matches = commands::command(&self.config.name, &self.config.description, self.locale)
			.try_get_matches_from(args)
			.unwrap_or_else(|e| e.exit());
		if let Some(cmd) = commands::matched(&matches) {
			self.execute(cmd);
			return Ok(());
		}

		let state = self.launch();
		if let Some(e) = state.error() {
			if !e.is_recoverable() {
				return Err(LaunchError::Construction(e.clone()));
			}
		}

		match state.manager() {
			None => self.run_foreground().await,
			Some(manager) => {
				tracing::info!("{}: running under {}", self.config.name, manager.platform());
				let unit = ServiceUnit::new(self.config.name.clone(), {
					let run = Arc::clone(&self.run);
					move || run()
				})
				.with_stop_timeout(self.config.stop_timeout());
				supervisor::supervise(&unit).await
			}
		}
	}

	async fn run_foreground(&self) -> Result<(), LaunchError> {
		tracing::info!("{}: no service system, running in the foreground", self.config.name);
		let run = Arc::clone(&self.run);
		tokio::task::spawn_blocking(move || run())
			.await
			.map_err(|e| LaunchError::Foreground(e.to_string()))
	}
}
