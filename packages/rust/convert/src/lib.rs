//! Draft-to-wiki conversion through an external converter, plus cleanup.
//!
//! The markup conversion itself is delegated to a converter process (pandoc,
//! natively or inside a container). This crate runs the configured passes in
//! sequence, piping each pass's output into the next, then applies the
//! cleanup passes to the final text.

mod cleanup;

use std::future::Future;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use rfcpub_shared::{ConversionPass, ConverterConfig, ConverterRuntime, Result, RfcPubError};

pub use cleanup::{HTML_CLOSE_MARKER, HTML_OPEN_MARKER};

// ---------------------------------------------------------------------------
// Converter seam
// ---------------------------------------------------------------------------

/// Something that can run one format pass over a document.
pub trait Converter: Send + Sync {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Run one pass, returning the converted text.
    fn run_pass(
        &self,
        input: &str,
        pass: &ConversionPass,
    ) -> impl Future<Output = Result<String>> + Send;

    /// One-time setup before a batch (e.g. refreshing a container image).
    fn prepare(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Convert a draft's text to its published form.
///
/// 1. Runs each pass in order, feeding the previous output forward
/// 2. Strips `<HTML>`/`</HTML>` passthrough markers
/// 3. Strips HTML comments
#[instrument(skip_all, fields(converter = %converter.describe(), passes = passes.len()))]
pub async fn convert_document<C: Converter>(
    converter: &C,
    source: &str,
    passes: &[ConversionPass],
) -> Result<String> {
    if passes.is_empty() {
        return Err(RfcPubError::config("no conversion passes configured"));
    }

    let mut text = source.to_string();
    for pass in passes {
        text = converter.run_pass(&text, pass).await?;
        debug!(%pass, len = text.len(), "pass complete");
    }

    Ok(cleanup::run_pipeline(&text))
}

// ---------------------------------------------------------------------------
// Process converter
// ---------------------------------------------------------------------------

/// Runs the converter as a child process: `<program> <args..> --from A --to B`,
/// document on stdin, result on stdout.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    program: String,
    args: Vec<String>,
    pull_image: Option<(String, String)>,
}

impl ProcessConverter {
    /// A converter binary invoked directly.
    pub fn native(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            pull_image: None,
        }
    }

    /// Build from the `[converter]` config section.
    ///
    /// The docker runtime becomes `docker run --rm -i <image> <args..>`, relying
    /// on the image's entrypoint being the converter.
    pub fn from_config(config: &ConverterConfig) -> Self {
        match config.runtime {
            ConverterRuntime::Native => Self::native(&config.program, config.args.clone()),
            ConverterRuntime::Docker => {
                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "-i".to_string(),
                    config.image.clone(),
                ];
                args.extend(config.args.iter().cloned());
                Self {
                    program: config.engine.clone(),
                    args,
                    pull_image: config
                        .pull
                        .then(|| (config.engine.clone(), config.image.clone())),
                }
            }
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Ask the converter for its version banner (first line of `--version`).
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unavailable(e))?;

        if !output.status.success() {
            return Err(RfcPubError::ConverterFailed {
                program: self.program.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn unavailable(&self, source: std::io::Error) -> RfcPubError {
        RfcPubError::ConverterUnavailable {
            program: self.program.clone(),
            source,
        }
    }
}

impl Converter for ProcessConverter {
    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    async fn run_pass(&self, input: &str, pass: &ConversionPass) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--from")
            .arg(&pass.from)
            .arg("--to")
            .arg(&pass.to)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RfcPubError::validation("failed to capture converter stdin"))?;

        // Feed stdin while stdout drains, so large documents cannot fill both pipes.
        let bytes = input.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&bytes).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.unavailable(e))?;

        if !output.status.success() {
            return Err(RfcPubError::ConverterFailed {
                program: self.program.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // The converter succeeded without reading all of its input.
                debug!(error = %e, "converter closed stdin early");
            }
            Err(e) => {
                return Err(RfcPubError::validation(format!(
                    "converter stdin task failed: {e}"
                )));
            }
        }

        String::from_utf8(output.stdout).map_err(|_| {
            RfcPubError::validation(format!(
                "converter `{}` produced non-UTF-8 output for pass {pass}",
                self.program
            ))
        })
    }

    async fn prepare(&self) -> Result<()> {
        let Some((engine, image)) = &self.pull_image else {
            return Ok(());
        };

        info!(%image, "pulling converter image");
        let output = Command::new(engine)
            .arg("pull")
            .arg(image)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RfcPubError::ConverterUnavailable {
                program: engine.clone(),
                source: e,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RfcPubError::ConverterFailed {
                program: engine.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
