use tokio::signal::unix::{signal, SignalKind};

use crate::error::LaunchError;
use crate::unit::{Completion, ServiceUnit};

/// Runs `unit` until it is told to stop.
///
/// SIGINT and SIGTERM stop the unit, SIGHUP restarts it in place. When the
/// function returns on its own the loop ends as well and the service manager
/// decides whether to start the process again.
pub async fn supervise(unit: &ServiceUnit) -> Result<(), LaunchError> {
	let mut terminate = signal(SignalKind::terminate()).map_err(LaunchError::Signal)?;
	let mut hangup = signal(SignalKind::hangup()).map_err(LaunchError::Signal)?;

	unit.start()?;

	loop {
		tokio::select! {
			completion = unit.wait() => {
				if let Some(Completion::Returned) = completion {
					tracing::info!("{}: service function finished", unit.name());
				}
				break;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("{}: interrupted, stopping", unit.name());
				break;
			}
			_ = terminate.recv() => {
				tracing::info!("{}: terminated, stopping", unit.name());
				break;
			}
			_ = hangup.recv() => {
				tracing::info!("{}: hangup, restarting", unit.name());
				unit.restart().await?;
			}
		}
	}

	unit.stop().await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::UnitError;
	use crate::unit::UnitState;
	use nix::sys::signal::{kill, Signal};
	use nix::unistd::Pid;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;
	use std::time::Duration;

	// signals go to the whole test process
	static SIGNALS: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

	#[tokio::test]
	async fn returns_when_function_finishes() {
		let _guard = SIGNALS.lock().await;
		let unit = ServiceUnit::new("oneshot", || {});
		supervise(&unit).await.unwrap();
		assert_eq!(unit.state(), UnitState::Stopped);
	}

	#[tokio::test]
	async fn panic_is_returned() {
		let _guard = SIGNALS.lock().await;
		let unit = ServiceUnit::new("boom", || panic!("bad config"));
		match supervise(&unit).await {
			Err(LaunchError::Unit(UnitError::Panicked { message })) => assert_eq!(message, "bad config"),
			other => panic!("expected Panicked, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn hangup_restarts_and_term_stops() {
		let _guard = SIGNALS.lock().await;
		let count = Arc::new(AtomicUsize::new(0));
		let c = Arc::clone(&count);
		let unit = ServiceUnit::new("reloadable", move || {
			c.fetch_add(1, Ordering::SeqCst);
			std::thread::sleep(Duration::from_secs(1));
		});

		let pid = Pid::this();
		let sender = std::thread::spawn(move || {
			std::thread::sleep(Duration::from_millis(100));
			let _ = kill(pid, Signal::SIGHUP);
			std::thread::sleep(Duration::from_millis(1200));
			let _ = kill(pid, Signal::SIGTERM);
		});

		supervise(&unit).await.unwrap();
		let _ = sender.join();

		assert_eq!(count.load(Ordering::SeqCst), 2);
		assert_eq!(unit.state(), UnitState::Stopped);
	}
}
