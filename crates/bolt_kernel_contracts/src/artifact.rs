#![forbid(unsafe_code)]

/// Artifact files the external generator is expected to leave behind for a
/// given output identifier. Names are a wire contract with the generator and
/// with retrieval callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    BoltBrep,
    BoltStl,
    NutBrep,
    NutStl,
}

impl ArtifactKind {
    pub fn file_name(&self, id: &str) -> String {
        match self {
            ArtifactKind::BoltBrep => format!("{id}.brep"),
            ArtifactKind::BoltStl => format!("{id}.stl"),
            ArtifactKind::NutBrep => format!("{id}_nut.brep"),
            ArtifactKind::NutStl => format!("{id}_nut.stl"),
        }
    }

    pub fn is_nut(&self) -> bool {
        matches!(self, ArtifactKind::NutBrep | ArtifactKind::NutStl)
    }
}

/// Artifacts that must exist after a successful generator run. A missing
/// member is a generation failure, not a retrieval miss.
pub fn expected_artifacts(generate_nut: bool) -> &'static [ArtifactKind] {
    if generate_nut {
        &[
            ArtifactKind::BoltBrep,
            ArtifactKind::BoltStl,
            ArtifactKind::NutBrep,
            ArtifactKind::NutStl,
        ]
    } else {
        &[ArtifactKind::BoltBrep, ArtifactKind::BoltStl]
    }
}

/// Retrieval names come from the URL path and must never resolve outside the
/// artifact directory. Anything that is not a plain `.brep`/`.stl` basename
/// is refused before touching the filesystem.
pub fn is_safe_retrieval_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 128 {
        return false;
    }
    if !(name.ends_with(".brep") || name.ends_with(".stl")) {
        return false;
    }
    if name.starts_with('.') || name.contains("..") {
        return false;
    }
    name.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
}

pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".stl") {
        "model/stl"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_artifact_01_file_names_follow_generator_contract() {
        assert_eq!(
            ArtifactKind::BoltBrep.file_name("bolt_1700000000000"),
            "bolt_1700000000000.brep"
        );
        assert_eq!(
            ArtifactKind::NutStl.file_name("bolt_1700000000000"),
            "bolt_1700000000000_nut.stl"
        );
    }

    #[test]
    fn at_artifact_02_expected_set_depends_on_nut_gate() {
        assert_eq!(expected_artifacts(false).len(), 2);
        assert_eq!(expected_artifacts(true).len(), 4);
        assert!(expected_artifacts(true).iter().any(|k| k.is_nut()));
        assert!(!expected_artifacts(false).iter().any(|k| k.is_nut()));
    }

    #[test]
    fn at_artifact_03_traversal_names_are_refused() {
        assert!(is_safe_retrieval_name("bolt_1700000000000.brep"));
        assert!(is_safe_retrieval_name("bolt_1700000000000_nut.stl"));
        assert!(!is_safe_retrieval_name("../etc/passwd"));
        assert!(!is_safe_retrieval_name("..%2fescape.stl"));
        assert!(!is_safe_retrieval_name("a/b.stl"));
        assert!(!is_safe_retrieval_name(".hidden.stl"));
        assert!(!is_safe_retrieval_name("bolt.step"));
        assert!(!is_safe_retrieval_name(""));
    }

    #[test]
    fn at_artifact_04_content_type_by_extension() {
        assert_eq!(content_type_for("x.stl"), "model/stl");
        assert_eq!(content_type_for("x.brep"), "application/octet-stream");
    }
}
