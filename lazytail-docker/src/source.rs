use crate::options::logs_options;
use anyhow::{Context, Result};
use bollard::Docker;
use futures::StreamExt;
use lazytail_framework::{Chunk, LogSource, Window};
use std::io::Cursor;
use tokio::runtime::{Builder, Runtime};

/// log source for a Docker container (engine API, polled)
pub struct DockerLogSource {
    docker: Docker,
    runtime: Runtime,
    container: String,
}

impl DockerLogSource {
    /// connect to the local daemon and make sure `container` exists
    pub fn connect(container: impl Into<String>) -> Result<Self> {
        let container = container.into();
        log::debug!("DockerLogSource: Connecting for container {}", container);

        // the engine client is async; we drive it from the caller's thread
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let docker = {
            let _guard = runtime.enter();
            Docker::connect_with_local_defaults().context("Failed to connect to the Docker daemon")?
        };

        runtime
            .block_on(docker.ping())
            .context("Docker daemon is not responding, is it running?")?;

        let inspect = runtime
            .block_on(docker.inspect_container(&container, None))
            .with_context(|| format!("Container '{}' not found", container))?;

        log::debug!(
            "DockerLogSource: Attached to {} (id: {})",
            container,
            inspect.id.as_deref().unwrap_or("unknown")
        );

        Ok(Self {
            docker,
            runtime,
            container,
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    async fn collect_window(docker: &Docker, container: &str, window: &Window) -> Result<Vec<u8>> {
        let mut stream = std::pin::pin!(docker.logs(container, Some(logs_options(window))));
        let mut bytes = Vec::new();

        while let Some(output) = stream.next().await {
            let output = output.context("Log stream interrupted")?;
            bytes.extend_from_slice(&output.into_bytes());
        }

        Ok(bytes)
    }
}

impl LogSource for DockerLogSource {
    fn fetch_chunk(&mut self, window: &Window) -> Result<Chunk> {
        let bytes = self
            .runtime
            .block_on(Self::collect_window(&self.docker, &self.container, window))
            .with_context(|| format!("Failed to read logs of container '{}'", self.container))?;

        if !bytes.is_empty() {
            log::debug!(
                "DockerLogSource: Fetched {} bytes for window {}",
                bytes.len(),
                window
            );
        }

        Ok(Box::new(Cursor::new(bytes)))
    }

    fn describe(&self) -> String {
        format!("container '{}'", self.container())
    }
}
