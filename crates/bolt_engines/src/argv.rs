#![forbid(unsafe_code)]

use bolt_kernel_contracts::fastener::FastenerSpec;

use crate::normalize::{ArgvLayout, GenerationConfig};

/// Serializes a finalized record into the generator's positional argument
/// vector. The generator parses by position with no names; ordering here is
/// a frozen per-generation contract.
pub fn argv_for(spec: &FastenerSpec, cfg: &GenerationConfig) -> Vec<String> {
    let s = cfg.unit_scale;
    match cfg.argv_layout {
        ArgvLayout::Legacy => {
            // name majord pitch length headD1 headD2 headD3 headD4 headType
            // nutHeight nutAcrossFlats tolerance nutFlag
            vec![
                spec.filename.clone(),
                num(spec.major_diameter * s),
                num(spec.thread_pitch * s),
                num(spec.total_length * s),
                num(spec.width_across_flats * s),
                num(spec.head_height * s),
                num(spec.socket_size * s),
                num(spec.socket_depth * s),
                spec.head_type.code().to_string(),
                num(spec.nut_height * s),
                num(spec.nut_across_flats * s),
                num(spec.nut_tolerance * s),
                flag(spec.generate_nut),
            ]
        }
        ArgvLayout::Full | ArgvLayout::FullCosmetic => {
            // name headType s k dw c r socketS socketD d L ls bodyTol threadD
            // P minorD genNut nutS nutH nutDw nutTol edgeFillet
            let mut argv = vec![
                spec.filename.clone(),
                spec.head_type.code().to_string(),
                num(spec.width_across_flats * s),
                num(spec.head_height * s),
                num(spec.washer_face_diameter * s),
                num(spec.washer_face_thickness * s),
                num(spec.underhead_fillet_radius * s),
                num(spec.socket_size * s),
                num(spec.socket_depth * s),
                num(spec.nominal_diameter * s),
                num(spec.total_length * s),
                num(spec.grip_length * s),
                num(spec.body_tolerance * s),
                num(spec.major_diameter * s),
                num(spec.thread_pitch * s),
                num(spec.minor_diameter * s),
                flag(spec.generate_nut),
                num(spec.nut_across_flats * s),
                num(spec.nut_height * s),
                num(spec.nut_washer_face * s),
                num(spec.nut_tolerance * s),
                num(spec.edge_fillet_radius * s),
            ];
            if cfg.argv_layout == ArgvLayout::FullCosmetic {
                argv.extend([
                    num(spec.nut_edge_fillet_radius * s),
                    num(spec.top_fillet_radius * s),
                    num(spec.vertical_chamfer * s),
                    num(spec.transition_fillet_radius * s),
                    num(spec.crest_radius * s),
                    num(spec.chamfer_angle),
                    num(spec.thread_clearance * s),
                    spec.tolerance_class.clone(),
                ]);
            }
            argv
        }
    }
}

fn num(v: f64) -> String {
    // Shortest round-trip form; the generator's atof accepts either spelling.
    format!("{v}")
}

fn flag(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolt_kernel_contracts::fastener::fields;
    use bolt_kernel_contracts::raw::RawRequest;
    use bolt_kernel_contracts::SubmissionTimeMs;

    use crate::normalize::normalize;

    const T0: SubmissionTimeMs = SubmissionTimeMs(1_700_000_000_000);

    fn sample_raw() -> RawRequest {
        let mut raw = RawRequest::new();
        raw.set_number(fields::MAJOR_DIAMETER, 8.0)
            .set_number(fields::TOTAL_LENGTH, 40.0)
            .set_number(fields::THREAD_PITCH, 1.25)
            .set_number(fields::WIDTH_ACROSS_FLATS, 13.0)
            .set_number(fields::HEAD_HEIGHT, 5.3)
            .set_number(fields::HEAD_TYPE, 0.0)
            .set_flag(fields::GENERATE_NUT, true);
        raw
    }

    #[test]
    fn at_argv_01_legacy_layout_matches_original_order() {
        let cfg = GenerationConfig::g2_millimeters();
        let spec = normalize(&sample_raw(), T0, &cfg).unwrap();
        let argv = argv_for(&spec, &cfg);
        assert_eq!(argv.len(), 13);
        assert_eq!(argv[0], "bolt_1700000000000");
        assert_eq!(argv[1], "8");
        assert_eq!(argv[2], "1.25");
        assert_eq!(argv[3], "40");
        assert_eq!(argv[4], "13");
        assert_eq!(argv[5], "5.3");
        assert_eq!(argv[8], "0");
        assert_eq!(argv[10], "10");
        assert_eq!(argv[11], "0.1");
        assert_eq!(argv[12], "1");
    }

    #[test]
    fn at_argv_02_meters_generation_scales_lengths_but_not_codes() {
        let cfg = GenerationConfig::g1_legacy_meters();
        let spec = normalize(&sample_raw(), T0, &cfg).unwrap();
        let argv = argv_for(&spec, &cfg);
        assert_eq!(argv[1], "0.008");
        assert_eq!(argv[3], "0.04");
        // Head profile code and nut gate are dimensionless.
        assert_eq!(argv[8], "0");
        assert_eq!(argv[12], "1");
    }

    #[test]
    fn at_argv_03_full_layout_matches_generator_usage_order() {
        let cfg = GenerationConfig::g3_defaulted();
        let spec = normalize(&sample_raw(), T0, &cfg).unwrap();
        let argv = argv_for(&spec, &cfg);
        assert_eq!(argv.len(), 22);
        assert_eq!(argv[0], "bolt_1700000000000");
        assert_eq!(argv[1], "0"); // headType
        assert_eq!(argv[2], "13"); // s
        assert_eq!(argv[3], "5.3"); // k
        assert_eq!(argv[9], "8"); // d
        assert_eq!(argv[10], "40"); // L
        assert_eq!(argv[13], "8"); // threadD
        assert_eq!(argv[14], "1.25"); // P
        assert_eq!(argv[16], "1"); // genNut
    }

    #[test]
    fn at_argv_04_cosmetic_tail_appends_after_full_layout() {
        let cfg = GenerationConfig::g4_cosmetic();
        let mut raw = sample_raw();
        raw.set_number(fields::CHAMFER_ANGLE, 45.0)
            .set_text(fields::TOLERANCE_CLASS, "6H");
        let spec = normalize(&raw, T0, &cfg).unwrap();
        let argv = argv_for(&spec, &cfg);
        assert_eq!(argv.len(), 30);
        assert_eq!(argv[27], "45"); // chamferAngle
        assert_eq!(argv[29], "6H"); // toleranceClass
    }

    #[test]
    fn at_argv_05_number_formatting_trims_trailing_zeros() {
        assert_eq!(num(8.0), "8");
        assert_eq!(num(37.5), "37.5");
        assert_eq!(num(0.008), "0.008");
        assert_eq!(num(0.0), "0");
    }
}
