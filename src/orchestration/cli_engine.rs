//! CLI-driven build engine
//!
//! Implements the BuildEngine trait by executing `podman` or `docker`
//! directly. Docker receives the context as a tar stream on stdin; Podman
//! reads the context directory.

use crate::error::{CachepackError, CachepackResult};
use crate::orchestration::engine::{BuildEngine, BuildRequest};
use crate::orchestration::factory::EngineKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Build engine backed by a container CLI
pub struct CliEngine {
    kind: EngineKind,
    binary: String,
}

impl CliEngine {
    /// Create an engine using the default binary for `kind`
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            binary: kind.default_binary().to_string(),
        }
    }

    /// Override the binary path (e.g. `/usr/local/bin/podman`)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Assemble `build` arguments for this engine
    fn build_args(&self, request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--file".to_string(),
            request.dockerfile.clone(),
        ];

        if request.no_cache {
            args.push("--no-cache".to_string());
        }

        for tag in &request.tags {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }

        for (key, value) in &request.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }

        match self.kind {
            EngineKind::Docker => args.push("-".to_string()),
            EngineKind::Podman => args.push(request.context_dir.display().to_string()),
        }

        args
    }

    /// Execute an engine command and return the output
    async fn exec(&self, args: &[&str]) -> CachepackResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.binary, args);

        Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CachepackError::command_failed(format!("{} {:?}", self.binary, args), e))
    }
}

#[async_trait]
impl BuildEngine for CliEngine {
    async fn ensure_ready(&self) -> CachepackResult<()> {
        let ready = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);

        if ready {
            Ok(())
        } else {
            Err(CachepackError::EngineNotFound {
                binary: self.binary.clone(),
            })
        }
    }

    async fn build(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> CachepackResult<()> {
        let image = request.tags.first().cloned().unwrap_or_default();
        let args = self.build_args(request);
        debug!("Building image: {} {:?}", self.binary, args);

        let stdin = match self.kind {
            EngineKind::Docker => {
                let archive = std::fs::File::open(&request.context_archive).map_err(|e| {
                    CachepackError::io(
                        format!("opening context {}", request.context_archive.display()),
                        e,
                    )
                })?;
                Stdio::from(archive)
            }
            EngineKind::Podman => Stdio::null(),
        };

        let mut child = Command::new(&self.binary)
            .args(&args)
            .current_dir(&request.context_dir)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CachepackError::command_failed(format!("{} build", self.binary), e))?;

        let all_output = tokio::select! {
            lines = super::stream_child_output(&mut child, on_output) => lines,
            () = cancel.cancelled() => {
                info!("Cancelling build of {}", image);
                let _ = child.kill().await;
                return Err(CachepackError::BuildCancelled { image });
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|e| CachepackError::command_failed(format!("{} build", self.binary), e))?;

        if !status.success() {
            let combined = all_output.join("\n");
            return Err(CachepackError::ImageBuild {
                image,
                output: super::build_error_output(&combined, ""),
            });
        }

        Ok(())
    }

    async fn tag(&self, source: &str, target: &str) -> CachepackResult<()> {
        debug!("Tagging {} as {}", source, target);

        let output = self.exec(&["tag", source, target]).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CachepackError::command_exec(
                format!("{} tag", self.binary),
                stderr,
            ))
        }
    }

    async fn image_labels(&self, image: &str) -> CachepackResult<HashMap<String, String>> {
        let output = self
            .exec(&["image", "inspect", "--format", "{{json .Config.Labels}}", image])
            .await?;

        if !output.status.success() {
            return Err(CachepackError::ImageNotFound(image.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let labels: Option<HashMap<String, String>> = serde_json::from_str(stdout.trim())?;
        Ok(labels.unwrap_or_default())
    }

    fn engine_name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn request() -> BuildRequest {
        let mut labels = BTreeMap::new();
        labels.insert("cache.triton.image/entry-count".to_string(), "2".to_string());
        BuildRequest {
            context_dir: PathBuf::from("/tmp/staging/build-1"),
            context_archive: PathBuf::from("/tmp/staging/build-1.tar"),
            dockerfile: "Dockerfile".to_string(),
            tags: vec!["myimage".to_string()],
            labels,
            no_cache: true,
        }
    }

    #[test]
    fn podman_args_use_context_dir() {
        let args = CliEngine::new(EngineKind::Podman).build_args(&request());

        assert_eq!(&args[..3], &["build", "--file", "Dockerfile"]);
        assert!(args.contains(&"--no-cache".to_string()));
        assert!(args.contains(&"cache.triton.image/entry-count=2".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/staging/build-1");
    }

    #[test]
    fn docker_args_read_stdin() {
        let args = CliEngine::new(EngineKind::Docker).build_args(&request());
        assert_eq!(args.last().unwrap(), "-");
    }

    #[test]
    fn cache_flag_only_when_requested() {
        let mut req = request();
        req.no_cache = false;
        let args = CliEngine::new(EngineKind::Podman).build_args(&req);
        assert!(!args.contains(&"--no-cache".to_string()));
    }

    #[test]
    fn binary_override() {
        let engine = CliEngine::new(EngineKind::Podman).with_binary("/opt/bin/podman");
        assert_eq!(engine.binary, "/opt/bin/podman");
        assert_eq!(engine.engine_name(), "Podman");
    }

    #[tokio::test]
    async fn missing_binary_is_not_ready() {
        let engine = CliEngine::new(EngineKind::Podman).with_binary("cachepack-no-such-engine");
        let err = engine.ensure_ready().await.unwrap_err();
        assert!(matches!(err, CachepackError::EngineNotFound { .. }));
    }
}
