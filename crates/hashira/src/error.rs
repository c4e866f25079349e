use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::unit::UnitState;

/// Errors from building or driving the OS service manager.
///
/// Cloneable so the error recorded while constructing the manager can be
/// reported by every subcommand that trips over it.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
	#[error("no service system detected")]
	NoServiceSystemDetected,
	#[error("permission denied: {0}")]
	PermissionDenied(String),
	#[error("{0}: not installed")]
	NotInstalled(String),
	#[error("{name}: already installed at {}", .path.display())]
	AlreadyInstalled { name: String, path: PathBuf },
	#[error("invalid service name '{0}'")]
	InvalidName(String),
	#[error("{program} {} failed: {stderr}", .args.join(" "))]
	Command {
		program: String,
		args: Vec<String>,
		stderr: String,
	},
	#[error("{context}: {source}")]
	Io {
		context: String,
		#[source]
		source: Arc<io::Error>,
	},
	#[error("failed to write plist {}: {message}", .path.display())]
	Plist { path: PathBuf, message: String },
}

impl ServiceError {
	pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
		let context = context.into();
		if source.kind() == io::ErrorKind::PermissionDenied {
			return ServiceError::PermissionDenied(format!("{}: {}", context, source));
		}
		ServiceError::Io {
			context,
			source: Arc::new(source),
		}
	}

	pub fn is_permission_error(&self) -> bool {
		matches!(self, ServiceError::PermissionDenied(_))
	}

	/// The launcher keeps going on these: no service system means running in
	/// the foreground, a permission error only blocks the management commands.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, ServiceError::NoServiceSystemDetected) || self.is_permission_error()
	}
}

/// Errors from the in-process start/stop state machine.
#[derive(Debug, Error)]
pub enum UnitError {
	#[error("cannot {action} service while {state}")]
	IllegalTransition { state: UnitState, action: &'static str },
	#[error("failed to spawn service thread: {0}")]
	Spawn(#[source] io::Error),
	#[error("service function did not return within {}s", .timeout.as_secs_f64())]
	StopTimeout { timeout: Duration },
	#[error("service function panicked: {message}")]
	Panicked { message: String },
}

#[derive(Debug, Error)]
pub enum LaunchError {
	#[error(transparent)]
	Construction(#[from] ServiceError),
	#[error(transparent)]
	Unit(#[from] UnitError),
	#[error("foreground run failed: {0}")]
	Foreground(String),
	#[error("failed to install signal handler: {0}")]
	Signal(#[source] io::Error),
}
