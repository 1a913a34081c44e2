use std::process::{Command, Stdio};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::interpolation::EnvVar;

/// Runs `script` through `shell -c`, with `environment` added on top of the
/// current environment and stdio inherited.
///
/// # Errors
///
/// Returns an error if the shell cannot be spawned or exits with non-zero
/// status.
pub fn execute_script(shell: &str, script: &str, environment: &[EnvVar]) -> Result<()> {
    let mut command = Command::new(shell);
    command
        .arg("-c")
        .arg(script)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    info!("Executing start script with {shell}");
    for variable in environment {
        debug!("  {}={}", variable.name, variable.value);
        command.env(&variable.name, &variable.value);
    }

    let subprocess_exit_success = command.spawn()?.wait()?.success();

    if subprocess_exit_success {
        Ok(())
    } else {
        Err(Error::SubProcessExit)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_successful_script() {
        let environment = vec![EnvVar::new("ARGS_NAME", "value")];
        assert!(execute_script("/bin/sh", "test \"$ARGS_NAME\" = value", &environment).is_ok());
    }

    #[test]
    fn test_failing_script() {
        assert!(matches!(
            execute_script("/bin/sh", "exit 3", &[]),
            Err(Error::SubProcessExit)
        ));
    }

    #[test]
    fn test_missing_shell() {
        assert!(matches!(
            execute_script("/definitely/not/a/shell", "true", &[]),
            Err(Error::SubProcess(_))
        ));
    }
}
