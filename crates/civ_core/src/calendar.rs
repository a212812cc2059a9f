//! In-game calendar.
//!
//! Years are signed: negative values are BC. The step shrinks as history
//! advances and there is no year zero, so 1 BC is followed by 1 AD.

/// Year the game starts in.
pub const START_YEAR: i32 = -4000;

/// Years added per round at `year`.
#[must_use]
pub const fn year_step(year: i32) -> i32 {
    if year < 1000 {
        20
    } else if year < 1500 {
        10
    } else if year < 1750 {
        5
    } else if year < 1850 {
        2
    } else {
        1
    }
}

/// The year following `year`, skipping year zero.
#[must_use]
pub const fn next_year(year: i32) -> i32 {
    let next = year + year_step(year);
    if year < 0 && next >= 0 {
        next + 1
    } else {
        next
    }
}

/// Human-readable year, e.g. `4000 BC` or `1850 AD`.
#[must_use]
pub fn format_year(year: i32) -> String {
    if year < 0 {
        format!("{} BC", -year)
    } else {
        format!("{year} AD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_era_steps() {
        assert_eq!(year_step(-4000), 20);
        assert_eq!(year_step(999), 20);
        assert_eq!(year_step(1000), 10);
        assert_eq!(year_step(1500), 5);
        assert_eq!(year_step(1750), 2);
        assert_eq!(year_step(1850), 1);
    }

    #[test]
    fn test_year_zero_is_skipped() {
        assert_eq!(next_year(-20), 1);
        assert_eq!(next_year(-10), 11);
        assert_eq!(next_year(-1), 20);
        assert_eq!(next_year(1), 21);
    }

    #[test]
    fn test_never_zero_and_monotonic_over_a_long_game() {
        let mut year = START_YEAR;
        for _ in 0..1000 {
            let next = next_year(year);
            assert!(next > year);
            assert_ne!(next, 0);
            year = next;
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(format_year(-4000), "4000 BC");
        assert_eq!(format_year(1), "1 AD");
    }
}
