#![forbid(unsafe_code)]

use bolt_engines::argv::argv_for;
use bolt_engines::normalize::{
    GenerationConfig, NormalizeRequest, NormalizerRuntime, NormalizeResponse,
};
use bolt_kernel_contracts::raw::RawRequest;
use bolt_kernel_contracts::SubmissionTimeMs;

pub const USAGE: &str = "usage: boltctl <normalize|argv> [--generation <1-4>] < request.json";

/// Runs one offline normalizer pass. `normalize` prints the finalized record
/// as JSON; `argv` prints the generator command line, one argument per line.
pub fn execute_command(
    command: &str,
    generation: Option<u32>,
    raw_json: &str,
    now_ms: u64,
) -> Result<String, String> {
    let config = match generation {
        Some(version) => GenerationConfig::for_version(version)
            .ok_or_else(|| format!("unknown schema generation {version}, expected 1-4"))?,
        None => GenerationConfig::current(),
    };

    let raw: RawRequest = serde_json::from_str(raw_json)
        .map_err(|e| format!("request is not a JSON field map: {e}"))?;

    let runtime = NormalizerRuntime::new(config.clone());
    let response = runtime.run(&NormalizeRequest {
        raw,
        submitted_at: SubmissionTimeMs(now_ms),
    });

    let spec = match response {
        NormalizeResponse::Spec(spec) => spec,
        NormalizeResponse::Refuse(refuse) => {
            return Err(format!("rejected: {}", refuse.message));
        }
    };

    match command {
        "normalize" => serde_json::to_string_pretty(&spec).map_err(|e| e.to_string()),
        "argv" => Ok(argv_for(&spec, &config).join("\n")),
        other => Err(format!("unknown command {other}\n{USAGE}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn at_cli_01_normalize_prints_the_finalized_record() {
        let out = execute_command(
            "normalize",
            None,
            r#"{"nominalDiameter": 8, "totalLength": 40, "threadPitch": 1.25, "gripLength": 100}"#,
            NOW,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["grip_length"], 37.5);
        assert_eq!(value["filename"], "bolt_1700000000000");
    }

    #[test]
    fn at_cli_02_argv_prints_one_argument_per_line() {
        let out = execute_command("argv", Some(2), r#"{"majord": "8", "length": "40", "pitch": "1.25", "headD1": "13", "headD2": "5.3", "headType": "0"}"#, NOW).unwrap();
        let args: Vec<&str> = out.lines().collect();
        assert_eq!(args.len(), 13);
        assert_eq!(args[0], "bolt_1700000000000");
        assert_eq!(args[1], "8");
    }

    #[test]
    fn at_cli_03_refusals_surface_as_errors() {
        let err = execute_command("normalize", None, r#"{"headType": 1}"#, NOW).unwrap_err();
        assert!(err.starts_with("rejected:"));
        assert!(err.contains("socketSize"));
    }

    #[test]
    fn at_cli_04_bad_inputs_name_the_problem() {
        assert!(execute_command("normalize", Some(9), "{}", NOW)
            .unwrap_err()
            .contains("unknown schema generation"));
        assert!(execute_command("normalize", None, "not json", NOW)
            .unwrap_err()
            .contains("JSON field map"));
        assert!(execute_command("frobnicate", None, "{}", NOW)
            .unwrap_err()
            .contains("unknown command"));
    }
}
