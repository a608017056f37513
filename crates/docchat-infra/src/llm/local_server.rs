//! Supervisor for a local `llama-server` process.
//!
//! Loads the GGUF weights once at startup and keeps them resident for the
//! whole session. The process is killed when [`LocalModelServer`] is dropped.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use docchat_types::config::LlmConfig;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("llama-server exited during startup ({0})")]
    ExitedEarly(ExitStatus),

    #[error("llama-server was not ready after {0} seconds")]
    StartupTimeout(u64),
}

/// A running `llama-server` child process.
pub struct LocalModelServer {
    child: Child,
    port: u16,
}

impl LocalModelServer {
    /// Arguments passed to `llama-server` for the given settings.
    pub fn command_args(config: &LlmConfig) -> Vec<String> {
        vec![
            "-m".to_string(),
            config.model_path.display().to_string(),
            "--host".to_string(),
            "127.0.0.1".to_string(),
            "--port".to_string(),
            config.port.to_string(),
            "-c".to_string(),
            config.n_ctx.to_string(),
        ]
    }

    /// Spawn `llama-server` and wait until its `/health` endpoint reports ready.
    #[tracing::instrument(
        name = "llama_server.start",
        skip_all,
        fields(port = config.port, n_ctx = config.n_ctx)
    )]
    pub async fn start(config: &LlmConfig) -> Result<Self, ServerError> {
        if !Path::new(&config.model_path).is_file() {
            return Err(ServerError::ModelNotFound(config.model_path.clone()));
        }

        let binary = config.server_binary.display().to_string();
        tracing::info!(
            binary = %binary,
            model = %config.model_path.display(),
            port = config.port,
            n_ctx = config.n_ctx,
            "starting llama-server"
        );

        let mut child = Command::new(&config.server_binary)
            .args(Self::command_args(config))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServerError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "docchat::llama_server", "{line}");
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "docchat::llama_server", "{line}");
                }
            });
        }

        let mut server = Self {
            child,
            port: config.port,
        };
        server
            .wait_until_ready(Duration::from_secs(config.startup_timeout_secs))
            .await?;
        tracing::info!(port = server.port, "llama-server ready");
        Ok(server)
    }

    fn health_url(&self) -> String {
        format!("http://127.0.0.1:{}/health", self.port)
    }

    /// Poll `/health` until it returns 200. The server answers 503 while the
    /// model is still loading.
    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), ServerError> {
        let client = reqwest::Client::new();
        let url = self.health_url();
        let started = Instant::now();
        let request_timeout = HEALTH_REQUEST_TIMEOUT.min(timeout);

        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(ServerError::ExitedEarly(status));
            }

            match client.get(&url).timeout(request_timeout).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => tracing::debug!(status = %resp.status(), "llama-server loading"),
                Err(_) => {}
            }

            if started.elapsed() >= timeout {
                return Err(ServerError::StartupTimeout(timeout.as_secs()));
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Kill the process and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "failed to stop llama-server");
        } else {
            tracing::debug!("llama-server stopped");
        }
    }
}
