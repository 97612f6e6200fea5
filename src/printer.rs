// Hand-off to the thermal printer. The printer driver is an external program;
// we only give it a device identifier and the path of a PBM file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use canonical_error::{CanonicalError, internal_error, unavailable_error};
use log::{debug, info};
use tokio::process::Command;

use crate::config::PrinterConfig;

#[async_trait]
pub trait PrinterSink: Send + Sync {
    /// Prints the bitmap at `artifact` on printer `device_id`. Returns once
    /// the printer collaborator is done with it.
    async fn print(&self, artifact: &Path, device_id: &str) -> Result<(), CanonicalError>;
}

/// Runs `<program> <device_flag> <device_id> <artifact>`, optionally from
/// `working_dir` (printer scripts often expect to run from their checkout).
pub struct CommandPrinter {
    program: PathBuf,
    device_flag: String,
    working_dir: Option<PathBuf>,
}

impl CommandPrinter {
    pub fn new(config: &PrinterConfig) -> Self {
        CommandPrinter{program: config.program.clone(),
                       device_flag: config.device_flag.clone(),
                       working_dir: config.working_dir.clone()}
    }

    fn command(&self, artifact: &Path, device_id: &str) -> Command {
        let mut command = Command::new(&self.program);
        if !self.device_flag.is_empty() {
            command.arg(&self.device_flag);
        }
        command.arg(device_id).arg(artifact);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

// Relative paths mean nothing to a driver running from `working_dir`.
fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

#[async_trait]
impl PrinterSink for CommandPrinter {
    async fn print(&self, artifact: &Path, device_id: &str) -> Result<(), CanonicalError> {
        let artifact = absolute_path(artifact)
            .map_err(|e| unavailable_error(
                format!("Cannot resolve {}: {}", artifact.display(), e).as_str()))?;
        debug!("Running {} for {}", self.program.display(), artifact.display());
        let status = match self.command(&artifact, device_id).status().await {
            Ok(s) => s,
            Err(e) => return Err(unavailable_error(
                format!("Could not run {}: {}", self.program.display(), e).as_str())),
        };
        if !status.success() {
            return Err(internal_error(
                format!("{} exited with {}", self.program.display(), status).as_str()));
        }
        info!("Printed {} on {}", artifact.display(), device_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer(program: &str, device_flag: &str) -> CommandPrinter {
        CommandPrinter::new(&PrinterConfig{program: PathBuf::from(program),
                                           device_flag: device_flag.to_string(),
                                           device_id: "MX10".to_string(),
                                           working_dir: None})
    }

    #[test]
    fn test_command_line() {
        let printer = printer("printer.py", "-s");
        let command = printer.command(Path::new("/tmp/photo.pbm"), "5,MX10");
        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "printer.py");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args, ["-s", "5,MX10", "/tmp/photo.pbm"]);
    }

    #[test]
    fn test_command_line_without_flag() {
        let printer = printer("lp", "");
        let command = printer.command(Path::new("a.pbm"), "thermal");
        let args: Vec<_> = command.as_std().get_args().collect();
        assert_eq!(args, ["thermal", "a.pbm"]);
    }

    #[test]
    fn test_absolute_path() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_path(Path::new("photos/a.pbm")).unwrap(),
                   cwd.join("photos/a.pbm"));
        assert_eq!(absolute_path(Path::new("/tmp/a.pbm")).unwrap(),
                   PathBuf::from("/tmp/a.pbm"));
    }

    // The driver runs elsewhere but must still find an artifact named
    // relative to our own working directory.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_artifact_with_working_dir() {
        let cwd = std::env::current_dir().unwrap();
        let local = tempfile::tempdir_in(&cwd).unwrap();
        let relative = local.path().strip_prefix(&cwd).unwrap().join("photo.pbm");
        assert!(relative.is_relative());
        std::fs::write(&relative, b"P4\n1 1\n\0").unwrap();

        let elsewhere = tempfile::tempdir().unwrap();
        let printer = CommandPrinter::new(&PrinterConfig{
            program: PathBuf::from("ls"),
            device_flag: "-d".to_string(),
            device_id: "--".to_string(),
            working_dir: Some(elsewhere.path().to_path_buf())});
        printer.print(&relative, "--").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status() {
        // `true`/`false` ignore their arguments.
        assert!(printer("true", "-s").print(Path::new("x.pbm"), "dev").await.is_ok());
        assert!(printer("false", "-s").print(Path::new("x.pbm"), "dev").await.is_err());
        assert!(printer("/nonexistent/printer", "-s")
                .print(Path::new("x.pbm"), "dev").await.is_err());
    }
}
