//! Child-process `CarbonCalculator` adapter.
//!
//! This adapter owns process plumbing only: spawning the configured program
//! without a shell, streaming the payload to its standard input, draining
//! standard output and standard error concurrently, and mapping the exit
//! status. The payload stays in memory and is never logged.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::ports::{CarbonCalculator, CarbonCalculatorError};
use crate::domain::{CalculationPayload, CalculationResult};

const STDERR_LOG_LIMIT: usize = 4 * 1024;

/// How to run the calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCalculatorConfig {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Wall-clock limit; the child is killed when it elapses.
    pub timeout: Duration,
    /// Largest payload written to standard input.
    pub max_payload_bytes: usize,
    /// Largest output read from standard output.
    pub max_output_bytes: usize,
}

impl ProcessCalculatorConfig {
    /// Configuration for `program` with a two-minute timeout and 8 MiB /
    /// 32 MiB payload and output caps.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(120),
            max_payload_bytes: 8 * 1024 * 1024,
            max_output_bytes: 32 * 1024 * 1024,
        }
    }

    /// Set the program arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the payload and output caps.
    pub fn with_limits(mut self, max_payload_bytes: usize, max_output_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self.max_output_bytes = max_output_bytes;
        self
    }
}

/// Runs one child process per calculation.
#[derive(Debug, Clone)]
pub struct ProcessCalculator {
    config: ProcessCalculatorConfig,
}

impl ProcessCalculator {
    /// Create an adapter from `config`.
    pub fn new(config: ProcessCalculatorConfig) -> Self {
        Self { config }
    }

    async fn run(&self, payload: Vec<u8>) -> Result<Vec<u8>, CarbonCalculatorError> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| CarbonCalculatorError::spawn(err.to_string()))?;

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(CarbonCalculatorError::io("calculator pipes unavailable"));
        };

        let write = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };
        let (written, output, diagnostics) = tokio::join!(
            write,
            read_capped(stdout, self.config.max_output_bytes),
            read_diagnostics(stderr),
        );

        let status = child
            .wait()
            .await
            .map_err(|err| CarbonCalculatorError::io(err.to_string()))?;
        // Reading stops at the cap, so an oversized writer may also die of
        // a broken pipe; report the cap rather than the exit status.
        let output = output.map_err(|err| CarbonCalculatorError::io(err.to_string()))?;
        if output.len() > self.config.max_output_bytes {
            return Err(CarbonCalculatorError::output_too_large(
                self.config.max_output_bytes,
            ));
        }
        if !status.success() {
            let diagnostics = diagnostics.unwrap_or_default();
            warn!(
                %status,
                stderr = %String::from_utf8_lossy(&diagnostics),
                "calculator exited unsuccessfully"
            );
            return Err(CarbonCalculatorError::non_zero_exit(status.to_string()));
        }
        written.map_err(|err| CarbonCalculatorError::io(err.to_string()))?;
        Ok(output)
    }
}

/// Reads at most `limit + 1` bytes so oversized output is detectable.
async fn read_capped<R>(reader: R, limit: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut buffer = Vec::new();
    reader.take(cap).read_to_end(&mut buffer).await?;
    Ok(buffer)
}

/// Keeps the first [`STDERR_LOG_LIMIT`] bytes of standard error and drains
/// the rest, so a chatty calculator never writes into a closed pipe.
async fn read_diagnostics<R>(mut reader: R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut kept = read_capped(&mut reader, STDERR_LOG_LIMIT).await?;
    kept.truncate(STDERR_LOG_LIMIT);
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(kept)
}

fn parse_output(output: &[u8]) -> Result<CalculationResult, CarbonCalculatorError> {
    let value: Value = serde_json::from_slice(output)
        .map_err(|err| CarbonCalculatorError::invalid_output(err.to_string()))?;
    CalculationResult::from_value(value)
        .map_err(|err| CarbonCalculatorError::invalid_output(err.to_string()))
}

#[async_trait]
impl CarbonCalculator for ProcessCalculator {
    async fn calculate(
        &self,
        payload: &CalculationPayload,
    ) -> Result<CalculationResult, CarbonCalculatorError> {
        let bytes = payload
            .to_json_bytes()
            .map_err(|err| CarbonCalculatorError::io(format!("payload encoding failed: {err}")))?;
        if bytes.len() > self.config.max_payload_bytes {
            return Err(CarbonCalculatorError::payload_too_large(
                bytes.len(),
                self.config.max_payload_bytes,
            ));
        }

        let started = Instant::now();
        let payload_bytes = bytes.len();
        let output = tokio::time::timeout(self.config.timeout, self.run(bytes))
            .await
            .map_err(|_| CarbonCalculatorError::timeout(self.config.timeout.as_secs()))??;
        debug!(
            payload_bytes,
            output_bytes = output.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "calculator finished"
        );
        parse_output(&output)
    }
}
