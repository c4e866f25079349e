mod config;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use hashira::Launcher;

use crate::config::RunConfig;

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt().with_writer(std::io::stderr).init();

	let path = config::config_path();
	let cli_config = config::load_config(&path);
	let root = hashira::paths::project_root();
	let service = cli_config.service_config(&root, &path);

	if let Some(dir) = &service.working_dir {
		if !root.dir_exists(dir) {
			tracing::warn!("working directory {} does not exist", dir.display());
		}
	}

	let job = command_job(&cli_config.run, service.working_dir.clone());
	let launcher = Launcher::new(service.name.clone(), service.description.clone(), job)
		.with_config(service);

	if let Err(e) = launcher.run().await {
		eprintln!("error: {}", e);
		std::process::exit(1);
	}
}

/// Runs the configured command through `sh -c` and waits for it.
fn command_job(run: &RunConfig, dir: Option<PathBuf>) -> impl Fn() + Send + Sync + 'static {
	let command = run.command.clone();
	let env: BTreeMap<String, String> = run.env.clone();
	move || {
		let Some(command) = &command else {
			tracing::warn!("no [run] command configured, nothing to do");
			return;
		};

		let mut cmd = Command::new("sh");
		cmd.arg("-c").arg(command).envs(&env);
		if let Some(dir) = &dir {
			cmd.current_dir(dir);
		}

		tracing::info!("running: {}", command);
		match cmd.status() {
			Ok(status) if status.success() => tracing::info!("command finished"),
			Ok(status) => tracing::warn!("command exited with {}", status),
			Err(e) => tracing::error!("failed to run command: {}", e),
		}
	}
}
