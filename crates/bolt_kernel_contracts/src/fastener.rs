#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::raw::RawRequest;
use crate::{ContractViolation, SchemaVersion, Validate};

/// Caller-facing field names. Modern keys are the current request schema;
/// legacy keys are the original form-field names still accepted as aliases
/// where a generation predates the rename.
pub mod fields {
    pub const HEAD_TYPE: &str = "headType";
    pub const WIDTH_ACROSS_FLATS: &str = "widthAcrossFlats";
    pub const HEAD_HEIGHT: &str = "headHeight";
    pub const WASHER_FACE_DIAMETER: &str = "washerFaceDiameter";
    pub const WASHER_FACE_THICKNESS: &str = "washerFaceThickness";
    pub const UNDERHEAD_FILLET_RADIUS: &str = "underheadFilletRadius";
    pub const SOCKET_SIZE: &str = "socketSize";
    pub const SOCKET_DEPTH: &str = "socketDepth";

    pub const NOMINAL_DIAMETER: &str = "nominalDiameter";
    pub const TOTAL_LENGTH: &str = "totalLength";
    pub const GRIP_LENGTH: &str = "gripLength";
    pub const BODY_TOLERANCE: &str = "bodyTolerance";
    pub const MAJOR_DIAMETER: &str = "majorDiameter";
    pub const THREAD_PITCH: &str = "threadPitch";
    pub const MINOR_DIAMETER: &str = "minorDiameter";
    pub const THREAD_CLEARANCE: &str = "threadClearance";
    pub const TOLERANCE_CLASS: &str = "toleranceClass";

    pub const GENERATE_NUT: &str = "generateNut";
    pub const NUT_ACROSS_FLATS: &str = "nutAcrossFlats";
    pub const NUT_HEIGHT: &str = "nutHeight";
    pub const NUT_WASHER_FACE: &str = "nutWasherFace";
    pub const NUT_TOLERANCE: &str = "nutTolerance";

    pub const EDGE_FILLET_RADIUS: &str = "edgeFilletRadius";
    pub const NUT_EDGE_FILLET_RADIUS: &str = "nutEdgeFilletRadius";
    pub const TOP_FILLET_RADIUS: &str = "topFilletRadius";
    pub const VERTICAL_CHAMFER: &str = "verticalChamfer";
    pub const TRANSITION_FILLET_RADIUS: &str = "transitionFilletRadius";
    pub const CREST_RADIUS: &str = "crestRadius";
    pub const CHAMFER_ANGLE: &str = "chamferAngle";

    // Original form-field names.
    pub const LEGACY_MAJOR_DIAMETER: &str = "majord";
    pub const LEGACY_TOTAL_LENGTH: &str = "length";
    pub const LEGACY_THREAD_PITCH: &str = "pitch";
    pub const LEGACY_WIDTH_ACROSS_FLATS: &str = "headD1";
    pub const LEGACY_HEAD_HEIGHT: &str = "headD2";
    pub const LEGACY_SOCKET_SIZE: &str = "headD3";
    pub const LEGACY_SOCKET_DEPTH: &str = "headD4";
    pub const LEGACY_NUT_TOLERANCE: &str = "tolerance";
}

/// Head profile selection. Codes are the external generator's enumeration
/// and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadType {
    Hex,
    SocketCap,
    Flat,
    Countersunk,
}

impl HeadType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(HeadType::Hex),
            1 => Some(HeadType::SocketCap),
            2 => Some(HeadType::Flat),
            3 => Some(HeadType::Countersunk),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            HeadType::Hex => 0,
            HeadType::SocketCap => 1,
            HeadType::Flat => 2,
            HeadType::Countersunk => 3,
        }
    }

    pub fn is_socket(&self) -> bool {
        *self == HeadType::SocketCap
    }
}

/// A fully-populated, geometrically-consistent fastener parameter record.
/// Constructed once per request by the normalizer, immutable afterward, and
/// consumed exactly once by positional serialization.
///
/// All lengths are millimeters regardless of generation; unit conversion for
/// the external generator happens at serialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastenerSpec {
    pub schema_version: SchemaVersion,
    pub filename: String,

    pub head_type: HeadType,
    pub width_across_flats: f64,
    pub head_height: f64,
    pub washer_face_diameter: f64,
    pub washer_face_thickness: f64,
    pub underhead_fillet_radius: f64,
    pub socket_size: f64,
    pub socket_depth: f64,

    pub nominal_diameter: f64,
    pub total_length: f64,
    pub grip_length: f64,
    pub body_tolerance: f64,
    pub major_diameter: f64,
    pub thread_pitch: f64,
    pub minor_diameter: f64,
    pub thread_clearance: f64,
    pub tolerance_class: String,

    pub generate_nut: bool,
    pub nut_across_flats: f64,
    pub nut_height: f64,
    pub nut_washer_face: f64,
    pub nut_tolerance: f64,

    pub edge_fillet_radius: f64,
    pub nut_edge_fillet_radius: f64,
    pub top_fillet_radius: f64,
    pub vertical_chamfer: f64,
    pub transition_fillet_radius: f64,
    pub crest_radius: f64,
    pub chamfer_angle: f64,
}

impl FastenerSpec {
    /// The across-flats value the nut-fillet ceiling is computed against:
    /// the caller's value when set, otherwise 1.5 x nominal diameter. The
    /// fallback is never written back into the record.
    pub fn effective_nut_across_flats(&self) -> f64 {
        if self.nut_across_flats > 0.0 {
            self.nut_across_flats
        } else {
            self.nominal_diameter * 1.5
        }
    }

    /// Re-expresses the record as a raw request under the modern field names.
    /// Feeding the result back through the normalizer must reproduce the
    /// record unchanged.
    pub fn to_raw_request(&self) -> RawRequest {
        let mut raw = RawRequest::new();
        raw.set_number(fields::HEAD_TYPE, f64::from(self.head_type.code()));
        raw.set_number(fields::WIDTH_ACROSS_FLATS, self.width_across_flats);
        raw.set_number(fields::HEAD_HEIGHT, self.head_height);
        raw.set_number(fields::WASHER_FACE_DIAMETER, self.washer_face_diameter);
        raw.set_number(fields::WASHER_FACE_THICKNESS, self.washer_face_thickness);
        raw.set_number(
            fields::UNDERHEAD_FILLET_RADIUS,
            self.underhead_fillet_radius,
        );
        raw.set_number(fields::SOCKET_SIZE, self.socket_size);
        raw.set_number(fields::SOCKET_DEPTH, self.socket_depth);
        raw.set_number(fields::NOMINAL_DIAMETER, self.nominal_diameter);
        raw.set_number(fields::TOTAL_LENGTH, self.total_length);
        raw.set_number(fields::GRIP_LENGTH, self.grip_length);
        raw.set_number(fields::BODY_TOLERANCE, self.body_tolerance);
        raw.set_number(fields::MAJOR_DIAMETER, self.major_diameter);
        raw.set_number(fields::THREAD_PITCH, self.thread_pitch);
        raw.set_number(fields::MINOR_DIAMETER, self.minor_diameter);
        raw.set_number(fields::THREAD_CLEARANCE, self.thread_clearance);
        raw.set_text(fields::TOLERANCE_CLASS, &self.tolerance_class);
        raw.set_flag(fields::GENERATE_NUT, self.generate_nut);
        raw.set_number(fields::NUT_ACROSS_FLATS, self.nut_across_flats);
        raw.set_number(fields::NUT_HEIGHT, self.nut_height);
        raw.set_number(fields::NUT_WASHER_FACE, self.nut_washer_face);
        raw.set_number(fields::NUT_TOLERANCE, self.nut_tolerance);
        raw.set_number(fields::EDGE_FILLET_RADIUS, self.edge_fillet_radius);
        raw.set_number(
            fields::NUT_EDGE_FILLET_RADIUS,
            self.nut_edge_fillet_radius,
        );
        raw.set_number(fields::TOP_FILLET_RADIUS, self.top_fillet_radius);
        raw.set_number(fields::VERTICAL_CHAMFER, self.vertical_chamfer);
        raw.set_number(
            fields::TRANSITION_FILLET_RADIUS,
            self.transition_fillet_radius,
        );
        raw.set_number(fields::CREST_RADIUS, self.crest_radius);
        raw.set_number(fields::CHAMFER_ANGLE, self.chamfer_angle);
        raw
    }
}

impl Validate for FastenerSpec {
    fn validate(&self) -> Result<(), ContractViolation> {
        for (field, value) in [
            ("width_across_flats", self.width_across_flats),
            ("head_height", self.head_height),
            ("washer_face_diameter", self.washer_face_diameter),
            ("washer_face_thickness", self.washer_face_thickness),
            ("underhead_fillet_radius", self.underhead_fillet_radius),
            ("socket_size", self.socket_size),
            ("socket_depth", self.socket_depth),
            ("nominal_diameter", self.nominal_diameter),
            ("total_length", self.total_length),
            ("grip_length", self.grip_length),
            ("body_tolerance", self.body_tolerance),
            ("major_diameter", self.major_diameter),
            ("thread_pitch", self.thread_pitch),
            ("minor_diameter", self.minor_diameter),
            ("thread_clearance", self.thread_clearance),
            ("nut_across_flats", self.nut_across_flats),
            ("nut_height", self.nut_height),
            ("nut_washer_face", self.nut_washer_face),
            ("nut_tolerance", self.nut_tolerance),
            ("edge_fillet_radius", self.edge_fillet_radius),
            ("nut_edge_fillet_radius", self.nut_edge_fillet_radius),
            ("top_fillet_radius", self.top_fillet_radius),
            ("vertical_chamfer", self.vertical_chamfer),
            ("transition_fillet_radius", self.transition_fillet_radius),
            ("crest_radius", self.crest_radius),
            ("chamfer_angle", self.chamfer_angle),
        ] {
            if !value.is_finite() {
                return Err(ContractViolation::NotFinite { field });
            }
            if value < 0.0 {
                return Err(ContractViolation::InvalidValue {
                    field,
                    reason: "must be >= 0",
                });
            }
        }

        if self.filename.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "filename",
                reason: "must not be empty",
            });
        }
        if self.nominal_diameter <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "nominal_diameter",
                reason: "must be > 0",
            });
        }
        if self.total_length <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "total_length",
                reason: "must be > 0",
            });
        }
        if self.major_diameter <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "major_diameter",
                reason: "must be > 0",
            });
        }
        if self.thread_pitch <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "thread_pitch",
                reason: "must be > 0",
            });
        }
        if self.tolerance_class.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "tolerance_class",
                reason: "must not be empty",
            });
        }
        if self.chamfer_angle <= 0.0 || self.chamfer_angle >= 90.0 {
            return Err(ContractViolation::InvalidRange {
                field: "chamfer_angle",
                min: 0.0,
                max: 90.0,
                got: self.chamfer_angle,
            });
        }

        // Thread run-out reserve at both ends. The reserve can exceed the
        // total length for stubby parts; grip is then pinned at zero.
        let grip_ceiling = (self.total_length - 2.0 * self.thread_pitch).max(0.0);
        if self.grip_length > grip_ceiling {
            return Err(ContractViolation::InvalidRange {
                field: "grip_length",
                min: 0.0,
                max: grip_ceiling,
                got: self.grip_length,
            });
        }

        let bolt_fillet_ceiling = 0.1 * self.nominal_diameter;
        if self.edge_fillet_radius > bolt_fillet_ceiling {
            return Err(ContractViolation::InvalidRange {
                field: "edge_fillet_radius",
                min: 0.0,
                max: bolt_fillet_ceiling,
                got: self.edge_fillet_radius,
            });
        }

        if self.head_type.is_socket() {
            let mut missing = Vec::new();
            if self.socket_size <= 0.0 {
                missing.push(fields::SOCKET_SIZE);
            }
            if self.socket_depth <= 0.0 {
                missing.push(fields::SOCKET_DEPTH);
            }
            if !missing.is_empty() {
                return Err(ContractViolation::InvalidFeatureSelection {
                    feature: "socketHead",
                    missing,
                });
            }
        }

        // Nut fields only carry meaning behind the gate; a disabled nut never
        // triggers a rejection.
        if self.generate_nut {
            let nut_fillet_ceiling = 0.1 * self.effective_nut_across_flats();
            if self.nut_edge_fillet_radius > nut_fillet_ceiling {
                return Err(ContractViolation::InvalidRange {
                    field: "nut_edge_fillet_radius",
                    min: 0.0,
                    max: nut_fillet_ceiling,
                    got: self.nut_edge_fillet_radius,
                });
            }
        }

        Ok(())
    }
}
