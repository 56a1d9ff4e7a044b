//! Script execution boundary (§3.6, §4.4 pipeline stages).
//!
//! The original tool's pre/post/publish scripts are arbitrary host-language files executed via
//! the DCC's embedded interpreter — an external collaborator no less opaque to this core than
//! the scene graph itself (§6.3), so it is abstracted the same way: a small trait the Builder
//! calls through, with a reference implementation this crate's own tests use.

use rig_core::{Error, Result};
use std::path::Path;

/// Executes one script path as a pipeline stage (§3.6, §4.4).
pub trait ScriptRunner: std::fmt::Debug {
    /// Run the script at `path`.
    ///
    /// # Errors
    ///
    /// Implementations should fail if the script cannot be located or its execution reports
    /// failure; per §4.4's failure policy, pre/post/pub script failures are fatal to the
    /// pipeline stage that invoked them.
    fn run(&self, path: &Path) -> Result<()>;
}

/// A [`ScriptRunner`] that only checks the script exists and logs its invocation, standing in for
/// a real interpreter embedding during tests.
#[derive(Debug, Default)]
pub struct LoggingScriptRunner;

impl ScriptRunner for LoggingScriptRunner {
    fn run(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::configuration(format!(
                "script not found: {}",
                path.display()
            )));
        }
        tracing::info!(script = %path.display(), "running script");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_script_errors() {
        let runner = LoggingScriptRunner;
        let err = runner.run(Path::new("/does/not/exist.py")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn existing_script_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("pre.py");
        std::fs::write(&script, "# noop").unwrap();
        LoggingScriptRunner.run(&script).unwrap();
    }
}
