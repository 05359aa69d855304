//! Blending penalties
//!
//! Pure scoring functions that turn a geometric feature distance into a
//! musically meaningful compatibility score. All functions are total; the
//! penalties are in [0.0, 1.0] where 0.0 means no penalty.

use crate::camelot::CamelotCode;

/// Penalty for a key pair that cannot be placed on the wheel
pub const UNKNOWN_KEY_PENALTY: f64 = 0.5;
/// Neighbouring positions with the same letter (8A <-> 9A, 12A <-> 1A)
pub const ADJACENT_KEY_PENALTY: f64 = 0.1;
/// Relative major/minor (8A <-> 8B)
pub const RELATIVE_KEY_PENALTY: f64 = 0.2;
/// Anything else on the wheel
pub const CLASHING_KEY_PENALTY: f64 = 1.0;

/// Weight of the harmonic penalty in the combined penalty; bpm takes the rest
const CAMELOT_WEIGHT: f64 = 0.5;

/// Harmonic distance between two Camelot codes.
///
/// The checks run in a fixed order: unknown, identical, adjacent on the
/// circular wheel with the same letter, same number with a different letter.
pub fn camelot_distance(a: CamelotCode, b: CamelotCode) -> f64 {
    let (
        CamelotCode::Key { number: num_a, mode: mode_a },
        CamelotCode::Key { number: num_b, mode: mode_b },
    ) = (a, b)
    else {
        return UNKNOWN_KEY_PENALTY;
    };

    if a == b {
        return 0.0;
    }

    let mut diff = num_a.abs_diff(num_b);
    if diff == 11 {
        diff = 1;
    }

    if mode_a == mode_b && diff == 1 {
        return ADJACENT_KEY_PENALTY;
    }

    if num_a == num_b && mode_a != mode_b {
        return RELATIVE_KEY_PENALTY;
    }

    CLASHING_KEY_PENALTY
}

/// Step penalty on the absolute tempo difference, lower bucket inclusive
pub fn bpm_penalty(bpm_a: f64, bpm_b: f64) -> f64 {
    let diff = (bpm_a - bpm_b).abs();
    if diff <= 2.0 {
        0.0
    } else if diff <= 6.0 {
        0.25
    } else if diff <= 10.0 {
        0.5
    } else {
        1.0
    }
}

/// Combine a feature-space distance with the harmonic and tempo penalties.
///
/// `1 / (1 + distance)` maps distance 0 to 1.0 and decays towards 0; the
/// equally weighted penalties then scale it down. The result is in [0.0, 1.0].
pub fn compute_blending_score(distance: f64, camelot_penalty: f64, bpm_penalty: f64) -> f64 {
    let base = 1.0 / (1.0 + distance);
    let penalty = camelot_penalty * CAMELOT_WEIGHT + bpm_penalty * (1.0 - CAMELOT_WEIGHT);
    (base * (1.0 - penalty)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CamelotCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_camelot_distance_buckets() {
        assert_eq!(camelot_distance(code("8A"), code("8A")), 0.0);
        assert_eq!(camelot_distance(code("8A"), code("9A")), 0.1);
        assert_eq!(camelot_distance(code("8A"), code("7A")), 0.1);
        assert_eq!(camelot_distance(code("12A"), code("1A")), 0.1);
        assert_eq!(camelot_distance(code("1B"), code("12B")), 0.1);
        assert_eq!(camelot_distance(code("8A"), code("8B")), 0.2);
        assert_eq!(camelot_distance(code("8A"), code("3B")), 1.0);
        assert_eq!(camelot_distance(code("8A"), code("9B")), 1.0);
        assert_eq!(camelot_distance(code("8A"), code("10A")), 1.0);
    }

    #[test]
    fn test_camelot_distance_unknown_is_neutral() {
        assert_eq!(camelot_distance(CamelotCode::Unknown, code("8A")), 0.5);
        assert_eq!(camelot_distance(code("8A"), CamelotCode::Unknown), 0.5);
        assert_eq!(camelot_distance(CamelotCode::Unknown, CamelotCode::Unknown), 0.5);
    }

    #[test]
    fn test_camelot_distance_symmetric() {
        let mut codes = vec![CamelotCode::Unknown];
        for n in 1..=12 {
            codes.push(code(&format!("{}A", n)));
            codes.push(code(&format!("{}B", n)));
        }
        for &a in &codes {
            if !a.is_unknown() {
                assert_eq!(camelot_distance(a, a), 0.0);
            }
            for &b in &codes {
                assert_eq!(camelot_distance(a, b), camelot_distance(b, a));
            }
        }
    }

    #[test]
    fn test_bpm_penalty_steps() {
        assert_eq!(bpm_penalty(120.0, 121.0), 0.0);
        assert_eq!(bpm_penalty(120.0, 122.0), 0.0);
        assert_eq!(bpm_penalty(120.0, 126.0), 0.25);
        assert_eq!(bpm_penalty(120.0, 130.0), 0.5);
        assert_eq!(bpm_penalty(120.0, 140.0), 1.0);
        assert_eq!(bpm_penalty(126.0, 120.0), 0.25);
        assert_eq!(bpm_penalty(120.0, f64::NAN), 1.0);
    }

    #[test]
    fn test_blending_score_bounds() {
        assert_eq!(compute_blending_score(0.0, 0.0, 0.0), 1.0);
        for d in [0.0, 0.5, 1.0, 10.0, 1e6] {
            assert_eq!(compute_blending_score(d, 1.0, 1.0), 0.0);
            let s = compute_blending_score(d, 0.2, 0.25);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_blending_score_monotone() {
        let distances = [0.0, 0.1, 1.0, 3.0, 50.0];
        let penalties = [0.0, 0.1, 0.2, 0.25, 0.5, 1.0];

        for w in distances.windows(2) {
            for &p in &penalties {
                assert!(compute_blending_score(w[0], p, p) >= compute_blending_score(w[1], p, p));
            }
        }
        for w in penalties.windows(2) {
            for &d in &distances {
                assert!(compute_blending_score(d, w[0], 0.0) >= compute_blending_score(d, w[1], 0.0));
                assert!(compute_blending_score(d, 0.0, w[0]) >= compute_blending_score(d, 0.0, w[1]));
            }
        }
    }

    #[test]
    fn test_blending_score_weights() {
        let s = compute_blending_score(1.0, 0.2, 0.0);
        assert!((s - 0.5 * 0.9).abs() < 1e-12);
    }
}
