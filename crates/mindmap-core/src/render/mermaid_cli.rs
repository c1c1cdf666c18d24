use std::path::PathBuf;

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::render::DiagramRenderer;

/// Renders Mermaid source to SVG by invoking the Mermaid CLI (`mmdc`).
///
/// Input and output files live in a private temporary directory that is
/// removed when the call returns, on success or failure.
pub struct MermaidCliRenderer {
    program: PathBuf,
    width: u32,
    height: u32,
}

impl MermaidCliRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            width: 1200,
            height: 800,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

#[async_trait::async_trait]
impl DiagramRenderer for MermaidCliRenderer {
    async fn render(&self, source: &str) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir().map_err(|e| Error::Render(e.to_string()))?;
        let input = dir.path().join("diagram.mmd");
        let output = dir.path().join("diagram.svg");
        tokio::fs::write(&input, source)
            .await
            .map_err(|e| Error::Render(e.to_string()))?;

        let result = Command::new(&self.program)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-w")
            .arg(self.width.to_string())
            .arg("-H")
            .arg(self.height.to_string())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::Render(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        tokio::fs::read(&output)
            .await
            .map_err(|e| Error::Render(format!("renderer produced no output: {e}")))
    }
}
