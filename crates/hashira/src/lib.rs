//! Run a function as an installable OS service.
//!
//! A [`Launcher`] wraps one function and gives the program six subcommands
//! (`install`, `uninstall`, `status`, `start`, `stop`, `restart`) backed by
//! launchd or systemd. Run without a subcommand, the program supervises the
//! function; when no service system is available it runs the function in the
//! foreground instead.
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() {
//! 	let launcher = hashira::Launcher::new("ticker", "prints a line every second", || {
//! 		for _ in 0..60 {
//! 			println!("tick");
//! 			std::thread::sleep(std::time::Duration::from_secs(1));
//! 		}
//! 	});
//! 	if let Err(e) = launcher.run().await {
//! 		eprintln!("error: {}", e);
//! 		std::process::exit(1);
//! 	}
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod launcher;
pub mod manager;
pub mod paths;
pub mod supervisor;
pub mod unit;

pub use commands::{Locale, ServiceCommand};
pub use config::{ServiceConfig, ServiceLevel};
pub use error::{LaunchError, ServiceError, UnitError};
pub use launcher::{LaunchState, Launcher, ManagerFactory};
pub use manager::{ServiceManager, ServiceStatus};
pub use paths::ServicePaths;
pub use unit::{Completion, ServiceUnit, UnitState, DEFAULT_STOP_TIMEOUT};
