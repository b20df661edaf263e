#![forbid(unsafe_code)]

use bolt_engines::argv::argv_for;
use bolt_engines::normalize::{
    NormalizeRefuse, NormalizeRequest, NormalizerRuntime, NormalizeResponse,
};
use bolt_kernel_contracts::artifact::expected_artifacts;
use bolt_kernel_contracts::fastener::FastenerSpec;
use bolt_kernel_contracts::raw::RawRequest;
use bolt_kernel_contracts::SubmissionTimeMs;
use bolt_storage::ArtifactStore;

/// How an external generator invocation died. Detail strings stay inside the
/// server log; callers only ever see the generic failure text.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorError {
    Spawn { detail: String },
    NonZeroExit { code: Option<i32> },
    TimedOut { timeout_ms: u64 },
}

/// Seam for the external geometry kernel. The real implementation spawns the
/// generator binary; tests substitute a fake that writes into a MemArtifactStore.
pub trait SolidGenerator {
    fn generate(&self, argv: &[String]) -> Result<(), GeneratorError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Normalization and generation both succeeded; every expected artifact
    /// is present in the store.
    Generated {
        spec: FastenerSpec,
        artifacts: Vec<String>,
    },
    /// Normalization refused the request. The generator was never invoked.
    Refused(NormalizeRefuse),
    /// Normalization succeeded but the generator failed, timed out, or left
    /// an expected artifact missing. Not retried: resubmitting a possibly
    /// malformed geometry request must stay a caller decision.
    GenerationFailed { filename: String, detail: String },
}

/// normalize -> invoke generator -> verify artifacts. Normalization failures
/// are detected before the external process is ever spawned, and a generator
/// death is never reported as a normalization failure.
pub struct GenerationPipeline<G, S> {
    normalizer: NormalizerRuntime,
    generator: G,
    store: S,
}

impl<G: SolidGenerator, S: ArtifactStore> GenerationPipeline<G, S> {
    pub fn new(normalizer: NormalizerRuntime, generator: G, store: S) -> Self {
        Self {
            normalizer,
            generator,
            store,
        }
    }

    pub fn normalizer(&self) -> &NormalizerRuntime {
        &self.normalizer
    }

    pub fn run(&self, raw: RawRequest, submitted_at: SubmissionTimeMs) -> PipelineOutcome {
        let spec = match self.normalizer.run(&NormalizeRequest { raw, submitted_at }) {
            NormalizeResponse::Spec(spec) => spec,
            NormalizeResponse::Refuse(refuse) => return PipelineOutcome::Refused(refuse),
        };

        let argv = argv_for(&spec, self.normalizer.config());
        println!(
            "pipeline: generating {} ({} args, schema v{})",
            spec.filename,
            argv.len(),
            spec.schema_version.0
        );

        if let Err(err) = self.generator.generate(&argv) {
            let detail = match err {
                GeneratorError::Spawn { detail } => format!("spawn failed: {detail}"),
                GeneratorError::NonZeroExit { code } => match code {
                    Some(code) => format!("generator exited with status {code}"),
                    None => "generator killed by signal".to_string(),
                },
                GeneratorError::TimedOut { timeout_ms } => {
                    format!("generator exceeded {timeout_ms} ms and was killed")
                }
            };
            eprintln!("pipeline: {} generation failed: {detail}", spec.filename);
            return PipelineOutcome::GenerationFailed {
                filename: spec.filename.clone(),
                detail,
            };
        }

        let mut artifacts = Vec::new();
        for kind in expected_artifacts(spec.generate_nut) {
            let name = kind.file_name(&spec.filename);
            if !self.store.exists(&name) {
                eprintln!(
                    "pipeline: {} generation incomplete: {name} missing",
                    spec.filename
                );
                return PipelineOutcome::GenerationFailed {
                    filename: spec.filename.clone(),
                    detail: format!("expected artifact {name} was not produced"),
                };
            }
            artifacts.push(name);
        }

        PipelineOutcome::Generated { spec, artifacts }
    }
}
