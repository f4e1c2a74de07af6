//! Selection-interval arithmetic for stake-modifier rounds.

use emberd_consensus::constants::MODIFIER_INTERVAL_RATIO;

/// One modifier bit is contributed per section.
pub const STAKE_MODIFIER_SECTIONS: usize = 64;

/// Seconds covered by selection round `section`. Sections grow
/// geometrically, so early rounds draw from a narrow slice of history and
/// the last round spans a full modifier interval.
pub fn selection_interval_section(modifier_interval: i64, section: usize) -> i64 {
    debug_assert!(section < STAKE_MODIFIER_SECTIONS);
    modifier_interval * 63 / (63 + (63 - section as i64) * (MODIFIER_INTERVAL_RATIO - 1))
}

/// Total seconds of history a modifier run draws candidates from.
pub fn selection_interval(modifier_interval: i64) -> i64 {
    (0..STAKE_MODIFIER_SECTIONS)
        .map(|section| selection_interval_section(modifier_interval, section))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_sums() {
        assert_eq!(selection_interval(10_800), 380_945);
        assert_eq!(selection_interval(1_200), 42_301);
        assert_eq!(selection_interval(600), 21_135);
    }

    #[test]
    fn sections_grow_to_full_interval() {
        let interval = 10_800;
        assert_eq!(selection_interval_section(interval, 0), interval / 3);
        assert_eq!(
            selection_interval_section(interval, STAKE_MODIFIER_SECTIONS - 1),
            interval
        );

        let mut last = 0;
        for section in 0..STAKE_MODIFIER_SECTIONS {
            let value = selection_interval_section(interval, section);
            assert!(value >= last);
            last = value;
        }
    }
}
