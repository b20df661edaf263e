#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bolt_engines::normalize::{GenerationConfig, NormalizerRuntime};
use bolt_kernel_contracts::artifact::content_type_for;
use bolt_kernel_contracts::raw::RawRequest;
use bolt_kernel_contracts::SubmissionTimeMs;
use bolt_os::pipeline::{GenerationPipeline, GeneratorError, PipelineOutcome, SolidGenerator};
use bolt_storage::{ArtifactStore, DirArtifactStore, StorageError};

/// Caller-facing failure text for generator deaths. Full diagnostics stay in
/// the server log.
const GENERATION_FAILED_MESSAGE: &str = "Failed to generate fastener. Check parameters.";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GenerateAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub filename: Option<String>,
    pub download_url: Option<String>,
    pub preview_url: Option<String>,
    pub nut_download_url: Option<String>,
    pub nut_preview_url: Option<String>,
    pub nut_generated: Option<bool>,
    pub field: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub schema_version: u32,
    pub artifact_dir: String,
}

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub generation: GenerationConfig,
    pub generator_bin: PathBuf,
    pub generator_workdir: Option<PathBuf>,
    pub generator_timeout_ms: u64,
    pub artifact_dir: PathBuf,
}

impl AdapterConfig {
    /// Environment-pinned configuration. The schema generation is selected
    /// here at startup and is never caller-selectable.
    pub fn from_env() -> Result<Self, String> {
        let generation = match env::var("BOLT_SCHEMA_GENERATION") {
            Ok(v) => {
                let version: u32 = v
                    .trim()
                    .parse()
                    .map_err(|_| format!("BOLT_SCHEMA_GENERATION is not a number: {v}"))?;
                GenerationConfig::for_version(version)
                    .ok_or(format!("BOLT_SCHEMA_GENERATION out of range: {version}"))?
            }
            Err(_) => GenerationConfig::current(),
        };
        Ok(Self {
            generation,
            generator_bin: env::var("BOLT_GENERATOR_BIN")
                .unwrap_or_else(|_| "./scim_bolts".to_string())
                .into(),
            generator_workdir: env::var("BOLT_GENERATOR_WORKDIR").ok().map(PathBuf::from),
            generator_timeout_ms: parse_generator_timeout_ms_from_env(),
            artifact_dir: env::var("BOLT_ARTIFACT_DIR")
                .unwrap_or_else(|_| "Tests".to_string())
                .into(),
        })
    }
}

fn parse_generator_timeout_ms_from_env() -> u64 {
    env::var("BOLT_GENERATOR_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| (1_000..=600_000).contains(v))
        .unwrap_or(120_000)
}

/// Spawns the generator binary and bounds it with a hard deadline. Child
/// stdout/stderr inherit the server's streams: that is the internal log the
/// generic caller-facing failure text refers to.
pub struct ProcessSolidGenerator {
    bin: PathBuf,
    workdir: Option<PathBuf>,
    timeout_ms: u64,
}

impl ProcessSolidGenerator {
    pub fn new(bin: PathBuf, workdir: Option<PathBuf>, timeout_ms: u64) -> Self {
        Self {
            bin,
            workdir,
            timeout_ms,
        }
    }
}

impl SolidGenerator for ProcessSolidGenerator {
    fn generate(&self, argv: &[String]) -> Result<(), GeneratorError> {
        let mut command = Command::new(&self.bin);
        command
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|e| GeneratorError::Spawn {
            detail: e.to_string(),
        })?;

        let deadline = Instant::now() + Duration::from_millis(self.timeout_ms);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return if status.success() {
                        Ok(())
                    } else {
                        Err(GeneratorError::NonZeroExit {
                            code: status.code(),
                        })
                    };
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(GeneratorError::TimedOut {
                            timeout_ms: self.timeout_ms,
                        });
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GeneratorError::Spawn {
                        detail: e.to_string(),
                    });
                }
            }
        }
    }
}

pub struct AdapterRuntime {
    pipeline: GenerationPipeline<ProcessSolidGenerator, DirArtifactStore>,
    store: DirArtifactStore,
    last_issued_ms: u64,
}

impl AdapterRuntime {
    pub fn new(config: AdapterConfig) -> Self {
        let store = DirArtifactStore::new(config.artifact_dir.clone());
        let generator = ProcessSolidGenerator::new(
            config.generator_bin,
            config.generator_workdir,
            config.generator_timeout_ms,
        );
        let pipeline = GenerationPipeline::new(
            NormalizerRuntime::new(config.generation),
            generator,
            store.clone(),
        );
        Self {
            pipeline,
            store,
            last_issued_ms: 0,
        }
    }

    pub fn default_from_env() -> Result<Self, String> {
        Ok(Self::new(AdapterConfig::from_env()?))
    }

    /// Wall-clock milliseconds, nudged forward on collision so two requests
    /// in the same millisecond never share an output identifier.
    fn next_submission_time(&mut self) -> SubmissionTimeMs {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let issued = now_ms.max(self.last_issued_ms + 1);
        self.last_issued_ms = issued;
        SubmissionTimeMs(issued)
    }

    pub fn run_generate(&mut self, raw: RawRequest) -> GenerateAdapterResponse {
        let submitted_at = self.next_submission_time();
        match self.pipeline.run(raw, submitted_at) {
            PipelineOutcome::Generated { spec, .. } => {
                let mut response = GenerateAdapterResponse {
                    status: "ok".to_string(),
                    outcome: "GENERATED".to_string(),
                    filename: Some(spec.filename.clone()),
                    download_url: Some(format!("/download/{}.brep", spec.filename)),
                    preview_url: Some(format!("/preview/{}.stl", spec.filename)),
                    nut_download_url: None,
                    nut_preview_url: None,
                    nut_generated: None,
                    field: None,
                    reason: None,
                };
                if spec.generate_nut {
                    response.nut_download_url =
                        Some(format!("/download/{}_nut.brep", spec.filename));
                    response.nut_preview_url = Some(format!("/preview/{}_nut.stl", spec.filename));
                    response.nut_generated = Some(true);
                }
                response
            }
            PipelineOutcome::Refused(refuse) => GenerateAdapterResponse {
                status: "error".to_string(),
                outcome: "REJECTED".to_string(),
                filename: None,
                download_url: None,
                preview_url: None,
                nut_download_url: None,
                nut_preview_url: None,
                nut_generated: None,
                field: Some(refuse.field),
                reason: Some(refuse.message),
            },
            PipelineOutcome::GenerationFailed { .. } => GenerateAdapterResponse {
                status: "error".to_string(),
                outcome: "GENERATION_FAILED".to_string(),
                filename: None,
                download_url: None,
                preview_url: None,
                nut_download_url: None,
                nut_preview_url: None,
                nut_generated: None,
                field: None,
                reason: Some(GENERATION_FAILED_MESSAGE.to_string()),
            },
        }
    }

    /// Artifact bytes plus content type for retrieval endpoints. Unsafe names
    /// collapse to not-found so the route leaks nothing about the filesystem.
    pub fn read_artifact(&self, name: &str) -> Result<(Vec<u8>, &'static str), StorageError> {
        match self.store.read(name) {
            Ok(bytes) => Ok((bytes, content_type_for(name))),
            Err(StorageError::UnsafeName { name }) => Err(StorageError::NotFound { name }),
            Err(other) => Err(other),
        }
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        let schema_version = self.pipeline.normalizer().config().schema_version.0;
        let artifact_dir = self.store.root().display().to_string();
        if self.store.root().is_dir() {
            AdapterHealthResponse {
                status: "ok".to_string(),
                outcome: "READY".to_string(),
                reason: None,
                schema_version,
                artifact_dir,
            }
        } else {
            AdapterHealthResponse {
                status: "error".to_string(),
                outcome: "DEGRADED".to_string(),
                reason: Some("artifact directory does not exist".to_string()),
                schema_version,
                artifact_dir,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bolt_kernel_contracts::fastener::fields;

    use super::*;

    fn runtime_with_missing_generator() -> AdapterRuntime {
        AdapterRuntime::new(AdapterConfig {
            generation: GenerationConfig::g4_cosmetic(),
            generator_bin: PathBuf::from("./definitely_not_a_generator"),
            generator_workdir: None,
            generator_timeout_ms: 1_000,
            artifact_dir: std::env::temp_dir().join("bolt_adapter_no_artifacts"),
        })
    }

    #[test]
    fn at_adapter_01_rejection_maps_to_field_and_reason() {
        let mut runtime = runtime_with_missing_generator();
        let mut raw = RawRequest::new();
        raw.set_number(fields::HEAD_TYPE, 1.0);
        let response = runtime.run_generate(raw);
        assert_eq!(response.status, "error");
        assert_eq!(response.outcome, "REJECTED");
        assert_eq!(response.field.as_deref(), Some("socketHead"));
        assert!(response.reason.unwrap().contains(fields::SOCKET_SIZE));
        assert!(response.filename.is_none());
    }

    #[test]
    fn at_adapter_02_spawn_failure_is_generic_to_the_caller() {
        let mut runtime = runtime_with_missing_generator();
        let response = runtime.run_generate(RawRequest::new());
        assert_eq!(response.outcome, "GENERATION_FAILED");
        let reason = response.reason.unwrap();
        assert_eq!(reason, GENERATION_FAILED_MESSAGE);
        assert!(!reason.contains("definitely_not_a_generator"));
    }

    #[test]
    fn at_adapter_03_submission_times_never_collide() {
        let mut runtime = runtime_with_missing_generator();
        let a = runtime.next_submission_time();
        let b = runtime.next_submission_time();
        let c = runtime.next_submission_time();
        assert!(a < b && b < c);
    }

    #[test]
    fn at_adapter_04_unsafe_retrieval_name_reads_as_not_found() {
        let runtime = runtime_with_missing_generator();
        assert!(matches!(
            runtime.read_artifact("../secret.stl"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn at_adapter_05_generator_timeout_is_enforced() {
        let generator = ProcessSolidGenerator::new(PathBuf::from("/bin/sleep"), None, 1_000);
        let started = Instant::now();
        let result = generator.generate(&["30".to_string()]);
        assert!(matches!(
            result,
            Err(GeneratorError::TimedOut { timeout_ms: 1_000 })
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn at_adapter_06_success_response_carries_artifact_locators() {
        // Fake the generator with a shell that writes the expected files.
        let dir = std::env::temp_dir().join(format!("bolt_adapter_ok_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("fake_generator.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\ntouch \"$(dirname \"$0\")/$1.brep\" \"$(dirname \"$0\")/$1.stl\"\n",
        )
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let mut runtime = AdapterRuntime::new(AdapterConfig {
            generation: GenerationConfig::g4_cosmetic(),
            generator_bin: script,
            generator_workdir: None,
            generator_timeout_ms: 10_000,
            artifact_dir: dir.clone(),
        });
        let response = runtime.run_generate(RawRequest::new());
        assert_eq!(response.status, "ok");
        assert_eq!(response.outcome, "GENERATED");
        let filename = response.filename.unwrap();
        assert!(filename.starts_with("bolt_"));
        assert_eq!(
            response.download_url.unwrap(),
            format!("/download/{filename}.brep")
        );
        assert_eq!(
            response.preview_url.unwrap(),
            format!("/preview/{filename}.stl")
        );
        assert!(response.nut_generated.is_none());

        let (bytes, content_type) = runtime.read_artifact(&format!("{filename}.stl")).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(content_type, "model/stl");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn at_adapter_07_rejection_serializes_with_stable_field_names() {
        let mut runtime = runtime_with_missing_generator();
        let mut raw = RawRequest::new();
        raw.set_number(fields::HEAD_TYPE, 1.0);
        let response = runtime.run_generate(raw);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["outcome"], "REJECTED");
        assert_eq!(value["field"], "socketHead");
        assert!(value["reason"].as_str().unwrap().contains("socketSize"));
    }
}
