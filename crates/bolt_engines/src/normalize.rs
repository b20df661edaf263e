#![forbid(unsafe_code)]

use bolt_kernel_contracts::fastener::{fields, FastenerSpec, HeadType};
use bolt_kernel_contracts::raw::RawRequest;
use bolt_kernel_contracts::{
    ContractViolation, ReasonCodeId, SchemaVersion, SubmissionTimeMs, Validate,
};

pub mod reason_codes {
    use bolt_kernel_contracts::ReasonCodeId;

    pub const NORMALIZE_OK: ReasonCodeId = ReasonCodeId(0x4E4D_0001);

    pub const NORMALIZE_MISSING_REQUIRED_FIELD: ReasonCodeId = ReasonCodeId(0x4E4D_00F1);
    pub const NORMALIZE_INVALID_FEATURE_SELECTION: ReasonCodeId = ReasonCodeId(0x4E4D_00F2);
    pub const NORMALIZE_INVALID_VALUE: ReasonCodeId = ReasonCodeId(0x4E4D_00F3);
    pub const NORMALIZE_INTERNAL_CONTRACT_ERROR: ReasonCodeId = ReasonCodeId(0x4E4D_00F4);
}

/// Which fields the caller must supply explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredFieldPolicy {
    /// Reject when the minimal set (diameter, length, pitch, two head
    /// dimensions, head type) is absent. First two generations.
    ExplicitMinimalSet,
    /// Everything defaults; clamping keeps the rest admissible. A missing
    /// socket sizing is still a hard rejection: there is no safe default
    /// for a feature the caller explicitly selected.
    DefaultAndClamp,
}

/// Positional argument layout understood by the generator build matching a
/// given schema generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgvLayout {
    /// 13 arguments, the original web front's command line.
    Legacy,
    /// 22 arguments, head block first.
    Full,
    /// `Full` plus the cosmetic-feature tail.
    FullCosmetic,
}

/// One schema generation's rule set, fixed at engine construction. Constants
/// are observed per-generation behavior and must not be unified across
/// generations.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub schema_version: SchemaVersion,
    pub required: RequiredFieldPolicy,
    pub argv_layout: ArgvLayout,
    /// Multiplier applied to length-dimensioned values when serializing for
    /// the generator. Clamping always runs in millimeters.
    pub unit_scale: f64,
    /// Absolute lower bound on the resolved thread pitch, millimeters.
    pub pitch_floor: f64,
    /// Upper bound on pitch as a fraction of nominal diameter.
    pub pitch_cap_ratio: f64,
    pub default_nominal_diameter: f64,
    pub default_total_length: f64,
    pub default_thread_pitch: f64,
    pub default_nut_height: f64,
    /// Zero means "leave unset"; the nut-fillet ceiling then derives from
    /// 1.5 x nominal diameter without persisting the derived value.
    pub default_nut_across_flats: f64,
    pub default_nut_tolerance: f64,
    pub default_chamfer_angle: f64,
    pub default_tolerance_class: &'static str,
}

impl GenerationConfig {
    /// First deployment: caller units were millimeters but the generator of
    /// that era consumed meters.
    pub fn g1_legacy_meters() -> Self {
        Self {
            schema_version: SchemaVersion(1),
            required: RequiredFieldPolicy::ExplicitMinimalSet,
            argv_layout: ArgvLayout::Legacy,
            unit_scale: 0.001,
            pitch_floor: 1.0,
            pitch_cap_ratio: 0.2,
            default_nominal_diameter: 8.0,
            default_total_length: 10.0,
            default_thread_pitch: 1.75,
            default_nut_height: 5.0,
            default_nut_across_flats: 10.0,
            default_nut_tolerance: 0.1,
            default_chamfer_angle: 30.0,
            default_tolerance_class: "6g",
        }
    }

    /// Same rules as G1 with the unit conversion dropped: millimeters end to
    /// end.
    pub fn g2_millimeters() -> Self {
        Self {
            schema_version: SchemaVersion(2),
            unit_scale: 1.0,
            ..Self::g1_legacy_meters()
        }
    }

    /// The reject-on-missing policy relaxed to default-and-clamp, with the
    /// wide pitch band.
    pub fn g3_defaulted() -> Self {
        Self {
            schema_version: SchemaVersion(3),
            required: RequiredFieldPolicy::DefaultAndClamp,
            argv_layout: ArgvLayout::Full,
            unit_scale: 1.0,
            pitch_floor: 0.2,
            pitch_cap_ratio: 0.4,
            default_nominal_diameter: 8.0,
            default_total_length: 10.0,
            default_thread_pitch: 1.25,
            default_nut_height: 5.0,
            default_nut_across_flats: 0.0,
            default_nut_tolerance: 0.15,
            default_chamfer_angle: 30.0,
            default_tolerance_class: "6g",
        }
    }

    /// Current generation: cosmetic-feature tail appended to the argument
    /// vector and the pitch band narrowed back to the G1 constants.
    pub fn g4_cosmetic() -> Self {
        Self {
            schema_version: SchemaVersion(4),
            argv_layout: ArgvLayout::FullCosmetic,
            pitch_floor: 1.0,
            pitch_cap_ratio: 0.2,
            ..Self::g3_defaulted()
        }
    }

    pub fn current() -> Self {
        Self::g4_cosmetic()
    }

    pub fn for_version(version: u32) -> Option<Self> {
        match version {
            1 => Some(Self::g1_legacy_meters()),
            2 => Some(Self::g2_millimeters()),
            3 => Some(Self::g3_defaulted()),
            4 => Some(Self::g4_cosmetic()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeRequest {
    pub raw: RawRequest,
    pub submitted_at: SubmissionTimeMs,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NormalizeRefuse {
    #[serde(skip)]
    pub reason_code: ReasonCodeId,
    pub field: String,
    pub message: String,
    #[serde(skip)]
    pub violation: ContractViolation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeResponse {
    Spec(FastenerSpec),
    Refuse(NormalizeRefuse),
}

#[derive(Debug, Clone)]
pub struct NormalizerRuntime {
    config: GenerationConfig,
}

impl NormalizerRuntime {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn run(&self, req: &NormalizeRequest) -> NormalizeResponse {
        match normalize(&req.raw, req.submitted_at, &self.config) {
            Ok(spec) => NormalizeResponse::Spec(spec),
            Err(violation) => {
                let reason_code = match &violation {
                    ContractViolation::MissingRequiredField { .. } => {
                        reason_codes::NORMALIZE_MISSING_REQUIRED_FIELD
                    }
                    ContractViolation::InvalidFeatureSelection { .. } => {
                        reason_codes::NORMALIZE_INVALID_FEATURE_SELECTION
                    }
                    _ => reason_codes::NORMALIZE_INVALID_VALUE,
                };
                NormalizeResponse::Refuse(NormalizeRefuse {
                    reason_code,
                    field: violation.field().to_string(),
                    message: violation.describe(),
                    violation,
                })
            }
        }
    }
}

/// Reads a field under its modern name, falling back to the original form
/// field name.
fn positive(raw: &RawRequest, modern: &str, legacy: &str) -> Option<f64> {
    raw.positive_number(modern)
        .or_else(|| raw.positive_number(legacy))
}

fn required(raw: &RawRequest, modern: &'static str, legacy: &str) -> Result<f64, ContractViolation> {
    positive(raw, modern, legacy).ok_or(ContractViolation::MissingRequiredField { field: modern })
}

/// The Parameter Normalizer & Clamp Engine. Pure: raw fields in, a valid
/// record or a field-indexed violation out. Never touches the filesystem and
/// never invokes the generator.
pub fn normalize(
    raw: &RawRequest,
    submitted_at: SubmissionTimeMs,
    cfg: &GenerationConfig,
) -> Result<FastenerSpec, ContractViolation> {
    // Presence validation first: the explicit generations name the missing
    // field before any defaulting happens.
    let explicit = cfg.required == RequiredFieldPolicy::ExplicitMinimalSet;

    let (nominal_diameter, major_diameter, total_length, requested_pitch) = if explicit {
        let major = required(raw, fields::MAJOR_DIAMETER, fields::LEGACY_MAJOR_DIAMETER)?;
        let length = required(raw, fields::TOTAL_LENGTH, fields::LEGACY_TOTAL_LENGTH)?;
        let pitch = required(raw, fields::THREAD_PITCH, fields::LEGACY_THREAD_PITCH)?;
        // The early schema had a single diameter; nominal and major coincide.
        let nominal = raw
            .positive_number(fields::NOMINAL_DIAMETER)
            .unwrap_or(major);
        (nominal, major, length, pitch)
    } else {
        let nominal = positive(raw, fields::NOMINAL_DIAMETER, fields::LEGACY_MAJOR_DIAMETER)
            .unwrap_or(cfg.default_nominal_diameter);
        let major = raw
            .positive_number(fields::MAJOR_DIAMETER)
            .unwrap_or(nominal);
        let length = positive(raw, fields::TOTAL_LENGTH, fields::LEGACY_TOTAL_LENGTH)
            .unwrap_or(cfg.default_total_length);
        let pitch = positive(raw, fields::THREAD_PITCH, fields::LEGACY_THREAD_PITCH)
            .unwrap_or(cfg.default_thread_pitch);
        (nominal, major, length, pitch)
    };

    let (width_across_flats, head_height) = if explicit {
        (
            required(
                raw,
                fields::WIDTH_ACROSS_FLATS,
                fields::LEGACY_WIDTH_ACROSS_FLATS,
            )?,
            required(raw, fields::HEAD_HEIGHT, fields::LEGACY_HEAD_HEIGHT)?,
        )
    } else {
        (
            positive(
                raw,
                fields::WIDTH_ACROSS_FLATS,
                fields::LEGACY_WIDTH_ACROSS_FLATS,
            )
            .unwrap_or(nominal_diameter * 1.5),
            positive(raw, fields::HEAD_HEIGHT, fields::LEGACY_HEAD_HEIGHT)
                .unwrap_or(nominal_diameter * 0.6),
        )
    };

    let head_type = match raw.integer(fields::HEAD_TYPE) {
        Some(code) => HeadType::from_code(code).ok_or(ContractViolation::InvalidValue {
            field: fields::HEAD_TYPE,
            reason: "unknown head profile code",
        })?,
        None if explicit => {
            return Err(ContractViolation::MissingRequiredField {
                field: fields::HEAD_TYPE,
            })
        }
        None => HeadType::Hex,
    };

    let socket_size = positive(raw, fields::SOCKET_SIZE, fields::LEGACY_SOCKET_SIZE).unwrap_or(0.0);
    let socket_depth =
        positive(raw, fields::SOCKET_DEPTH, fields::LEGACY_SOCKET_DEPTH).unwrap_or(0.0);

    // An explicitly selected socket profile with no sizing has no safe
    // default under any generation: reject, naming every absent field.
    if head_type.is_socket() {
        let mut missing = Vec::new();
        if socket_size <= 0.0 {
            missing.push(fields::SOCKET_SIZE);
        }
        if socket_depth <= 0.0 {
            missing.push(fields::SOCKET_DEPTH);
        }
        if !missing.is_empty() {
            return Err(ContractViolation::InvalidFeatureSelection {
                feature: "socketHead",
                missing,
            });
        }
    }

    let washer_face_diameter = raw
        .positive_number(fields::WASHER_FACE_DIAMETER)
        .unwrap_or(0.0);
    let washer_face_thickness = raw
        .positive_number(fields::WASHER_FACE_THICKNESS)
        .unwrap_or(0.0);
    let underhead_fillet_radius = raw
        .positive_number(fields::UNDERHEAD_FILLET_RADIUS)
        .unwrap_or(0.0);

    let requested_grip = raw.number(fields::GRIP_LENGTH).unwrap_or(0.0).max(0.0);
    let body_tolerance = raw.positive_number(fields::BODY_TOLERANCE).unwrap_or(0.0);
    let minor_diameter = raw.positive_number(fields::MINOR_DIAMETER).unwrap_or(0.0);
    let thread_clearance = raw.positive_number(fields::THREAD_CLEARANCE).unwrap_or(0.0);
    let tolerance_class = raw
        .text(fields::TOLERANCE_CLASS)
        .unwrap_or(cfg.default_tolerance_class)
        .to_string();

    let generate_nut = raw.flag(fields::GENERATE_NUT);
    let nut_across_flats = raw
        .positive_number(fields::NUT_ACROSS_FLATS)
        .unwrap_or(cfg.default_nut_across_flats);
    let nut_height = raw
        .positive_number(fields::NUT_HEIGHT)
        .unwrap_or(cfg.default_nut_height);
    let nut_washer_face = raw.positive_number(fields::NUT_WASHER_FACE).unwrap_or(0.0);
    let nut_tolerance = positive(raw, fields::NUT_TOLERANCE, fields::LEGACY_NUT_TOLERANCE)
        .unwrap_or(cfg.default_nut_tolerance);

    let requested_bolt_fillet = raw
        .positive_number(fields::EDGE_FILLET_RADIUS)
        .unwrap_or(0.0);
    let requested_nut_fillet = raw
        .positive_number(fields::NUT_EDGE_FILLET_RADIUS)
        .unwrap_or(0.0);
    let top_fillet_radius = raw.positive_number(fields::TOP_FILLET_RADIUS).unwrap_or(0.0);
    let vertical_chamfer = raw.positive_number(fields::VERTICAL_CHAMFER).unwrap_or(0.0);
    let transition_fillet_radius = raw
        .positive_number(fields::TRANSITION_FILLET_RADIUS)
        .unwrap_or(0.0);
    let crest_radius = raw.positive_number(fields::CREST_RADIUS).unwrap_or(0.0);
    // A degenerate angle reads as absent and takes the default; the chamfer
    // angle is not on the clamp list.
    let chamfer_angle = raw
        .positive_number(fields::CHAMFER_ANGLE)
        .filter(|a| *a < 90.0)
        .unwrap_or(cfg.default_chamfer_angle);

    // Clamp sequence. Each clamp is one-directional: the ceiling can lower a
    // requested value, never raise one. The pitch floor is the sole absolute
    // lower bound. The grip ceiling uses the resolved pitch so the run-out
    // reserve holds in the emitted record.
    let thread_pitch = requested_pitch
        .min(cfg.pitch_cap_ratio * nominal_diameter)
        .max(cfg.pitch_floor);

    let grip_length = requested_grip
        .min(total_length - 2.0 * thread_pitch)
        .max(0.0);

    let edge_fillet_radius = requested_bolt_fillet.min(0.1 * nominal_diameter);

    let effective_nut_flats = if nut_across_flats > 0.0 {
        nut_across_flats
    } else {
        nominal_diameter * 1.5
    };
    let nut_edge_fillet_radius = if generate_nut {
        requested_nut_fillet.min(0.1 * effective_nut_flats)
    } else {
        requested_nut_fillet
    };

    let spec = FastenerSpec {
        schema_version: cfg.schema_version,
        filename: format!("bolt_{}", submitted_at.0),
        head_type,
        width_across_flats,
        head_height,
        washer_face_diameter,
        washer_face_thickness,
        underhead_fillet_radius,
        socket_size,
        socket_depth,
        nominal_diameter,
        total_length,
        grip_length,
        body_tolerance,
        major_diameter,
        thread_pitch,
        minor_diameter,
        thread_clearance,
        tolerance_class,
        generate_nut,
        nut_across_flats,
        nut_height,
        nut_washer_face,
        nut_tolerance,
        edge_fillet_radius,
        nut_edge_fillet_radius,
        top_fillet_radius,
        vertical_chamfer,
        transition_fillet_radius,
        crest_radius,
        chamfer_angle,
    };
    spec.validate()?;
    Ok(spec)
}
