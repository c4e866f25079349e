use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::UnitError;

/// How long [`ServiceUnit::stop`] waits for the function to return.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

pub type ServiceFn = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
	NotStarted,
	Starting,
	Running,
	Stopping,
	Stopped,
}

impl fmt::Display for UnitState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			UnitState::NotStarted => "not started",
			UnitState::Starting => "starting",
			UnitState::Running => "running",
			UnitState::Stopping => "stopping",
			UnitState::Stopped => "stopped",
		};
		f.write_str(s)
	}
}

/// Published once the wrapped function has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
	Returned,
	Panicked(String),
}

/// A user function wrapped as something that can be started and stopped.
///
/// `start` runs the function on its own thread and returns right away.
/// `stop` waits for that function to return, bounded by the stop timeout.
/// Nothing is passed into the function to make it return early; stopping
/// only stops waiting for it.
pub struct ServiceUnit {
	name: String,
	run: ServiceFn,
	stop_timeout: Duration,
	inner: Mutex<Inner>,
}

struct Inner {
	state: UnitState,
	done: Option<watch::Receiver<Option<Completion>>>,
}

impl ServiceUnit {
	pub fn new<F>(name: impl Into<String>, run: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			run: Arc::new(run),
			stop_timeout: DEFAULT_STOP_TIMEOUT,
			inner: Mutex::new(Inner {
				state: UnitState::NotStarted,
				done: None,
			}),
		}
	}

	pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
		self.stop_timeout = timeout;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn stop_timeout(&self) -> Duration {
		self.stop_timeout
	}

	pub fn state(&self) -> UnitState {
		self.lock().state
	}

	pub fn is_running(&self) -> bool {
		self.state() == UnitState::Running
	}

	pub fn start(&self) -> Result<(), UnitError> {
		let previous = {
			let mut inner = self.lock();
			match inner.state {
				UnitState::NotStarted | UnitState::Stopped => {}
				state => return Err(UnitError::IllegalTransition { state, action: "start" }),
			}
			let previous = inner.state;
			inner.state = UnitState::Starting;
			previous
		};

		let (tx, rx) = watch::channel(None);
		let run = Arc::clone(&self.run);
		let spawned = std::thread::Builder::new()
			.name(format!("{}-service", self.name))
			.spawn(move || {
				let completion = match panic::catch_unwind(AssertUnwindSafe(|| run())) {
					Ok(()) => Completion::Returned,
					Err(payload) => Completion::Panicked(panic_message(payload.as_ref())),
				};
				let _ = tx.send(Some(completion));
			});

		let mut inner = self.lock();
		match spawned {
			Ok(_) => {
				inner.state = UnitState::Running;
				inner.done = Some(rx);
				tracing::info!("{}: service function started", self.name);
				Ok(())
			}
			Err(e) => {
				inner.state = previous;
				Err(UnitError::Spawn(e))
			}
		}
	}

	pub async fn stop(&self) -> Result<(), UnitError> {
		let done = {
			let mut inner = self.lock();
			match inner.state {
				UnitState::NotStarted | UnitState::Stopped => return Ok(()),
				UnitState::Running => {}
				state => return Err(UnitError::IllegalTransition { state, action: "stop" }),
			}
			inner.state = UnitState::Stopping;
			inner.done.take()
		};
		// lands in Stopped even when this future is dropped mid-wait
		let _stopped = StoppedOnDrop(self);

		match done {
			Some(rx) => self.await_completion(rx).await,
			None => Ok(()),
		}
	}

	pub async fn restart(&self) -> Result<(), UnitError> {
		self.stop().await?;
		self.start()
	}

	/// Resolves once the running function has returned. `None` when nothing
	/// was started.
	pub async fn wait(&self) -> Option<Completion> {
		let mut rx = self.lock().done.clone()?;
		let completion = rx.wait_for(Option::is_some).await.ok()?;
		(*completion).clone()
	}

	async fn await_completion(
		&self,
		mut rx: watch::Receiver<Option<Completion>>,
	) -> Result<(), UnitError> {
		let waited = tokio::time::timeout(self.stop_timeout, async {
			rx.wait_for(Option::is_some).await.map(|c| (*c).clone())
		})
		.await;

		match waited {
			Ok(Ok(Some(Completion::Panicked(message)))) => {
				tracing::error!("{}: service function panicked: {}", self.name, message);
				Err(UnitError::Panicked { message })
			}
			Ok(_) => {
				tracing::info!("{}: service function returned", self.name);
				Ok(())
			}
			Err(_) => {
				tracing::warn!(
					"{}: service function still running after {:?}, giving up",
					self.name,
					self.stop_timeout
				);
				Err(UnitError::StopTimeout {
					timeout: self.stop_timeout,
				})
			}
		}
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

struct StoppedOnDrop<'a>(&'a ServiceUnit);

impl Drop for StoppedOnDrop<'_> {
	fn drop(&mut self) {
		self.0.lock().state = UnitState::Stopped;
	}
}

impl fmt::Debug for ServiceUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceUnit")
			.field("name", &self.name)
			.field("state", &self.state())
			.field("stop_timeout", &self.stop_timeout)
			.finish()
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"unknown panic".to_string()
	}
}
