//! Tolerance based comparison of tap patterns
//!
//! Matching is more relaxed than equality: the candidate may be played
//! uniformly faster or slower than the reference, and individual pauses may
//! wander a little around their scaled position. [`Side::Any`] in either
//! pattern accepts any side at that index.
//!
//! Two tolerance levels apply. The total duration of the candidate must lie
//! within [`MAX_DURATION_TOLERANCE`] of the reference duration. The ratio
//! between both durations then rescales every reference pause, and each
//! candidate pause must lie within [`MAX_TAP_POSITION_TOLERANCE`] of its
//! rescaled counterpart. Both bounds are inclusive.
//!
//! [`Side::Any`]: crate::types::Side::Any

use crate::types::TapPattern;

/// Allowed relative deviation of the candidate duration from the reference
pub const MAX_DURATION_TOLERANCE: f64 = 0.30;

/// Allowed relative deviation of a single pause from its rescaled reference
pub const MAX_TAP_POSITION_TOLERANCE: f64 = 0.20;

/// Check whether `candidate` matches `reference` within tolerance
pub fn matches(reference: &TapPattern, candidate: Option<&TapPattern>) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };

    if reference == candidate {
        return true;
    }

    if reference.size() != candidate.size() {
        return false;
    }

    let sides_match = reference
        .sides()
        .iter()
        .zip(candidate.sides())
        .all(|(r, c)| r.accepts(*c));
    if !sides_match {
        return false;
    }

    // Patterns of one tap have no pauses and a duration of 0 on both sides;
    // the timing checks below would divide by zero.
    if reference.size() <= 1 {
        return true;
    }

    let time_scale = candidate.duration() as f64 / reference.duration() as f64;
    if (time_scale - 1.0).abs() > MAX_DURATION_TOLERANCE {
        return false;
    }

    reference
        .pauses()
        .iter()
        .zip(candidate.pauses())
        .all(|(&r, &c)| {
            let scaled_reference = r as f64 * time_scale;
            let tap_scale = c as f64 / scaled_reference;
            (tap_scale - 1.0).abs() <= MAX_TAP_POSITION_TOLERANCE
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    const REFERENCE: [i64; 8] = [
        225158691, 222741885, 769665620, 695953369, 673431397, 1052740898, 206970215, 251190185,
    ];

    const WORKING: [i64; 8] = [
        223968506, 229278565, 882171631, 716393942, 770782471, 1162902832, 244018555, 254455566,
    ];

    const FAILING: [[i64; 8]; 7] = [
        [161102294, 151153565, 654687604, 433697574, 458740234, 1007165550, 165161133, 166961670],
        [176220766, 161132813, 558929443, 166168213, 171203613, 584375129, 40283203, 125885010],
        [161132813, 558929443, 166168213, 171203613, 584375129, 40283203, 125885010, 171325683],
        [558929443, 166168213, 171203613, 584375129, 40283203, 125885010, 171325683, 281860352],
        [166168213, 171203613, 584375129, 40283203, 125885010, 171325683, 281860352, 45349121],
        [171203613, 584375129, 40283203, 125885010, 171325683, 281860352, 45349121, 171277161],
        [166266085, 146026611, 699932969, 171234131, 171173096, 704925537, 156097412, 161132813],
    ];

    /// First tap on `first`, every following tap on the back
    fn pattern_from_pauses(pauses: &[i64], first: Side) -> TapPattern {
        let mut p = TapPattern::new();
        p.append_tap(first, 0).unwrap();
        for &pause in pauses {
            p.append_tap(Side::Back, pause).unwrap();
        }
        p
    }

    fn single(side: Side) -> TapPattern {
        let mut p = TapPattern::new();
        p.append_tap(side, 0).unwrap();
        p
    }

    #[test]
    fn test_absent_candidate_never_matches() {
        assert!(!matches(&TapPattern::new(), None));
        assert!(!matches(&single(Side::Back), None));
    }

    #[test]
    fn test_empty_pattern_match() {
        assert!(TapPattern::new().matches(&TapPattern::new()));
    }

    #[test]
    fn test_empty_and_non_empty_never_match() {
        assert!(!single(Side::Back).matches(&TapPattern::new()));
        assert!(!TapPattern::new().matches(&single(Side::Back)));
    }

    #[test]
    fn test_single_tap_pattern_match() {
        assert!(single(Side::Back).matches(&single(Side::Back)));
        assert!(single(Side::Back).matches(&single(Side::Any)));
        assert!(single(Side::Any).matches(&single(Side::Front)));
        assert!(!single(Side::Back).matches(&single(Side::Front)));
    }

    #[test]
    fn test_equal_implies_match() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);
        assert!(reference.matches(&reference.clone()));
    }

    #[test]
    fn test_complex_pattern_match() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);

        assert!(reference.matches(&pattern_from_pauses(&WORKING, Side::Back)));
        assert!(reference.matches(&pattern_from_pauses(&WORKING, Side::Any)));
    }

    #[test]
    fn test_complex_pattern_side_mismatch() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);
        assert!(!reference.matches(&pattern_from_pauses(&WORKING, Side::Bottom)));
    }

    #[test]
    fn test_complex_pattern_missing_trailing_tap() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);
        assert!(!reference.matches(&pattern_from_pauses(&WORKING[..7], Side::Back)));
    }

    #[test]
    fn test_complex_pattern_timing_out_of_tolerance() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);
        for pauses in FAILING.iter() {
            let candidate = pattern_from_pauses(pauses, Side::Back);
            assert!(!reference.matches(&candidate), "matched {}", candidate);
        }
    }

    #[test]
    fn test_uniform_slowdown_within_tolerance() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);
        let slower: Vec<i64> = REFERENCE.iter().map(|p| p * 5 / 4).collect();
        assert!(reference.matches(&pattern_from_pauses(&slower, Side::Back)));
    }

    #[test]
    fn test_uniform_slowdown_beyond_tolerance() {
        let reference = pattern_from_pauses(&REFERENCE, Side::Back);
        let slower: Vec<i64> = REFERENCE.iter().map(|p| p * 3 / 2).collect();
        assert!(!reference.matches(&pattern_from_pauses(&slower, Side::Back)));
    }

    #[test]
    fn test_single_pause_distortion_rejected() {
        let reference = pattern_from_pauses(&[100, 100, 100, 100], Side::Back);
        // Same total duration, one pause stretched by 40%
        let candidate = pattern_from_pauses(&[140, 60, 100, 100], Side::Back);
        assert!(!reference.matches(&candidate));
    }

    #[test]
    fn test_duration_tolerance() {
        let reference = pattern_from_pauses(&[1_000], Side::Back);
        // time scale 1.25, single pause rescales to exactly itself
        assert!(reference.matches(&pattern_from_pauses(&[1_250], Side::Back)));
        assert!(!reference.matches(&pattern_from_pauses(&[1_400], Side::Back)));
    }

    #[test]
    fn test_wildcard_in_middle() {
        let mut reference = TapPattern::new();
        reference
            .append_tap(Side::Left, 0)
            .unwrap()
            .append_tap(Side::Any, 100)
            .unwrap()
            .append_tap(Side::Right, 100)
            .unwrap();

        let mut candidate = TapPattern::new();
        candidate
            .append_tap(Side::Left, 0)
            .unwrap()
            .append_tap(Side::Top, 105)
            .unwrap()
            .append_tap(Side::Right, 95)
            .unwrap();

        assert!(reference.matches(&candidate));

        let mut wrong = TapPattern::new();
        wrong
            .append_tap(Side::Front, 0)
            .unwrap()
            .append_tap(Side::Top, 105)
            .unwrap()
            .append_tap(Side::Right, 95)
            .unwrap();
        assert!(!reference.matches(&wrong));
    }
}
