use crate::{prepare_output_path, ComputerController};
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Screen grabbers tried in order; the first one installed wins.
const CAPTURE_COMMANDS: &[(&str, &[&str])] = &[
    ("import", &["-window", "root"]),
    ("gnome-screenshot", &["-f"]),
    ("scrot", &["-o"]),
];

pub struct LinuxController;

impl LinuxController {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

#[async_trait]
impl ComputerController for LinuxController {
    async fn take_screenshot(&self, path: &str) -> Result<()> {
        let final_path = prepare_output_path(path)?;
        let mut failures = Vec::new();

        for (program, args) in CAPTURE_COMMANDS {
            let result = tokio::process::Command::new(program)
                .args(*args)
                .arg(&final_path)
                .output()
                .await;

            match result {
                Ok(output) if output.status.success() => {
                    debug!("Captured screen to {} with {}", final_path, program);
                    return Ok(());
                }
                Ok(output) => failures.push(format!(
                    "{}: {}",
                    program,
                    String::from_utf8_lossy(&output.stderr).trim()
                )),
                Err(e) => failures.push(format!("{}: {}", program, e)),
            }
        }

        anyhow::bail!(
            "No screen capture tool succeeded. Install ImageMagick (import), gnome-screenshot or scrot.\n{}",
            failures.join("\n")
        )
    }
}
