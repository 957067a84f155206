use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use crate::core::domain::Structure;
use crate::engine::mutation::{GrowWindows, MutationGateway, MutationWindows};

/// Pipe wrapper around an external CReM-style fragment-replacement tool.
///
/// The parent encoding is streamed to the helper's stdin; candidates come
/// back one per line as `key<TAB>encoding[<TAB>payload]`. Lines that do
/// not fit are skipped with a diagnostic rather than failing the call.
pub struct CremService {
    executable: String,
    db_path: PathBuf,
}

impl CremService {
    pub fn new(executable: &str, db_path: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.to_string(),
            db_path: db_path.into(),
        }
    }

    fn run_process(&self, args: &[String], input_data: &str) -> Result<String> {
        let mut child = Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn mutation service executable")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input_data.as_bytes())
                .context("Failed to write to mutation service stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to read mutation service output")?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            bail!("mutation service exited with error: {}", err_msg.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn parse_candidates(output: &str) -> Vec<(String, Structure)> {
        let mut candidates = Vec::new();
        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let Some(key) = fields.next().filter(|k| !k.is_empty()) else {
                log::warn!("Skipping malformed mutation candidate line: {line:?}");
                continue;
            };
            let encoding = fields.next().unwrap_or(key);
            let mut structure = Structure::new(encoding);
            structure.payload = fields.next().map(str::to_string);
            candidates.push((key.to_string(), structure));
        }
        candidates
    }
}

impl MutationGateway for CremService {
    fn name(&self) -> &str {
        "CReM (Pipe)"
    }

    fn mutate(
        &self,
        structure: &Structure,
        windows: &MutationWindows,
    ) -> Result<Vec<(String, Structure)>> {
        let args = vec![
            "mutate".to_string(),
            "--db".to_string(),
            self.db_path.display().to_string(),
            "--radius".to_string(),
            windows.radius.to_string(),
            "--min-size".to_string(),
            windows.min_size.to_string(),
            "--max-size".to_string(),
            windows.max_size.to_string(),
            "--min-inc".to_string(),
            windows.min_inc.to_string(),
            "--max-inc".to_string(),
            windows.max_inc.to_string(),
        ];

        let output = self.run_process(&args, &structure.encoding)?;
        Ok(Self::parse_candidates(&output))
    }

    fn grow(
        &self,
        structure: &Structure,
        windows: &GrowWindows,
    ) -> Result<Vec<(String, Structure)>> {
        let args = vec![
            "grow".to_string(),
            "--db".to_string(),
            self.db_path.display().to_string(),
            "--radius".to_string(),
            windows.radius.to_string(),
            "--min-atoms".to_string(),
            windows.min_atoms.to_string(),
            "--max-atoms".to_string(),
            windows.max_atoms.to_string(),
        ];

        let output = self.run_process(&args, &structure.encoding)?;
        Ok(Self::parse_candidates(&output))
    }
}
