use clap::{ArgMatches, Command};

/// The six service management subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
	Install,
	Uninstall,
	Status,
	Start,
	Stop,
	Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
	#[default]
	En,
	Zh,
}

impl Locale {
	/// Reads `LC_ALL`, then `LC_MESSAGES`, then `LANG`.
	pub fn from_env() -> Self {
		["LC_ALL", "LC_MESSAGES", "LANG"]
			.iter()
			.filter_map(|key| std::env::var(key).ok())
			.find(|value| !value.is_empty())
			.map(|value| Self::from_tag(&value))
			.unwrap_or_default()
	}

	/// `zh_CN.UTF-8`, `zh-TW` and plain `zh` are all Chinese.
	pub fn from_tag(tag: &str) -> Self {
		let lang = tag.split(['_', '-', '.']).next().unwrap_or("");
		if lang.eq_ignore_ascii_case("zh") {
			Locale::Zh
		} else {
			Locale::En
		}
	}
}

static COMMANDS: [(ServiceCommand, &str, [(Locale, &str); 2]); 6] = [
	(ServiceCommand::Install, "install", [(Locale::En, "Install service"), (Locale::Zh, "安装服务")]),
	(ServiceCommand::Uninstall, "uninstall", [(Locale::En, "Uninstall service"), (Locale::Zh, "卸载服务")]),
	(ServiceCommand::Status, "status", [(Locale::En, "Service status"), (Locale::Zh, "服务状态")]),
	(ServiceCommand::Start, "start", [(Locale::En, "Start service"), (Locale::Zh, "启动服务")]),
	(ServiceCommand::Stop, "stop", [(Locale::En, "Stop service"), (Locale::Zh, "停止服务")]),
	(ServiceCommand::Restart, "restart", [(Locale::En, "Restart service"), (Locale::Zh, "重启服务")]),
];

impl ServiceCommand {
	pub fn all() -> impl Iterator<Item = ServiceCommand> {
		COMMANDS.iter().map(|(cmd, _, _)| *cmd)
	}

	pub fn as_str(&self) -> &'static str {
		self.row().1
	}

	pub fn from_name(name: &str) -> Option<Self> {
		COMMANDS
			.iter()
			.find(|(_, n, _)| *n == name)
			.map(|(cmd, _, _)| *cmd)
	}

	/// Help text for `locale`, English when the table has no entry.
	pub fn description(&self, locale: Locale) -> &'static str {
		let descriptions = &self.row().2;
		descriptions
			.iter()
			.find(|(l, _)| *l == locale)
			.or_else(|| descriptions.iter().find(|(l, _)| *l == Locale::En))
			.map(|(_, text)| *text)
			.unwrap_or("")
	}

	fn row(&self) -> &'static (ServiceCommand, &'static str, [(Locale, &'static str); 2]) {
		// every variant has a row, the table is exhaustive
		COMMANDS
			.iter()
			.find(|(cmd, _, _)| cmd == self)
			.unwrap_or(&COMMANDS[0])
	}
}

/// Builds the command tree: the app itself runs the service, the six
/// subcommands manage it.
pub fn command(app: &str, about: &str, locale: Locale) -> Command {
	let mut cmd = Command::new(app.to_string()).about(about.to_string());
	for service_cmd in ServiceCommand::all() {
		cmd = cmd.subcommand(
			Command::new(service_cmd.as_str()).about(service_cmd.description(locale)),
		);
	}
	cmd
}

/// The service subcommand that was matched, if any.
pub fn matched(matches: &ArgMatches) -> Option<ServiceCommand> {
	matches.subcommand_name().and_then(ServiceCommand::from_name)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_every_command_round_trips_its_name() {
		let names: Vec<&str> = ServiceCommand::all().map(|c| c.as_str()).collect();
		assert_eq!(names, vec!["install", "uninstall", "status", "start", "stop", "restart"]);
		for cmd in ServiceCommand::all() {
			assert_eq!(ServiceCommand::from_name(cmd.as_str()), Some(cmd));
		}
		assert_eq!(ServiceCommand::from_name("run"), None);
	}

	#[test]
	fn test_descriptions_per_locale() {
		assert_eq!(ServiceCommand::Install.description(Locale::En), "Install service");
		assert_eq!(ServiceCommand::Uninstall.description(Locale::En), "Uninstall service");
		assert_eq!(ServiceCommand::Install.description(Locale::Zh), "安装服务");
		assert_eq!(ServiceCommand::Restart.description(Locale::Zh), "重启服务");
	}

	#[test]
	fn test_locale_from_tag() {
		assert_eq!(Locale::from_tag("zh_CN.UTF-8"), Locale::Zh);
		assert_eq!(Locale::from_tag("zh-TW"), Locale::Zh);
		assert_eq!(Locale::from_tag("en_US.UTF-8"), Locale::En);
		assert_eq!(Locale::from_tag("C"), Locale::En);
		assert_eq!(Locale::from_tag(""), Locale::En);
	}

	#[test]
	fn test_command_tree() {
		let cmd = command("demo", "demo service", Locale::Zh);
		let help: Vec<(String, String)> = cmd
			.get_subcommands()
			.map(|s| {
				(
					s.get_name().to_string(),
					s.get_about().map(|a| a.to_string()).unwrap_or_default(),
				)
			})
			.collect();
		assert_eq!(help.len(), 6);
		assert_eq!(help[0], ("install".to_string(), "安装服务".to_string()));

		let matches = command("demo", "", Locale::En)
			.try_get_matches_from(["demo", "status"])
			.unwrap();
		assert_eq!(matched(&matches), Some(ServiceCommand::Status));

		let matches = command("demo", "", Locale::En)
			.try_get_matches_from(["demo"])
			.unwrap();
		assert_eq!(matched(&matches), None);

		assert!(command("demo", "", Locale::En)
			.try_get_matches_from(["demo", "bogus"])
			.is_err());
	}
}
