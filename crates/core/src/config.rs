//! Where `pgate` finds its command configuration and which shell runs start
//! scripts.

use std::env;

use log::debug;

/// Used when neither `--config-path` nor the environment names a file
const DEFAULT_CONFIG_PATH: &str = "~/.paramgate/commands.yml";

/// Environment variable consulted before the default path.
pub const CONFIG_PATH_ENV: &str = "PARAMGATE_CONFIG";

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Picks the configuration file: an explicit path wins, then
/// `$PARAMGATE_CONFIG`, then `~/.paramgate/commands.yml`. A leading `~` is
/// expanded in all three.
///
/// # Examples
///
/// ```
/// use paramgate_core::config::get_config_path;
///
/// let custom_path = get_config_path(&Some("/path/to/config.yml".to_string()));
/// assert_eq!(custom_path, "/path/to/config.yml");
/// ```
pub fn get_config_path(config_path_arg: &Option<String>) -> String {
    resolve_config_path(config_path_arg, env::var(CONFIG_PATH_ENV).ok())
}

fn resolve_config_path(config_path_arg: &Option<String>, from_env: Option<String>) -> String {
    let chosen = match (config_path_arg, from_env.filter(|path| !path.is_empty())) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => {
            debug!("Config path taken from `{CONFIG_PATH_ENV}`");
            path
        }
        (None, None) => DEFAULT_CONFIG_PATH.to_string(),
    };

    shellexpand::tilde(&chosen).into_owned()
}
