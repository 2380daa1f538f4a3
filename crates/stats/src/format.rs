//! Fixed-width report formatting shared by all collectors.

/// Longest title kept by a collector.
pub const TITLE_WIDTH: usize = 12;

/// Column heading matching the summary line of [`Tally`](crate::Tally),
/// [`Accumulate`](crate::Accumulate) and [`Histogram`](crate::Histogram).
pub const HEADING: &str =
    "title       /  (re)set/   obs/  average/est.st.dv/  minimum/  maximum/    conf./";

/// Truncate a title to [`TITLE_WIDTH`] characters.
pub(crate) fn title(title: &str) -> String {
    title.chars().take(TITLE_WIDTH).collect()
}

/// Format a number in a 10-character field.
///
/// Zero and magnitudes strictly between 0.1 and 10^6 use fixed notation with
/// three decimals; everything else uses exponent notation with two.
pub fn number(x: f64) -> String {
    if x == 0.0 || (x.abs() > 0.1 && x.abs() < 1e6) {
        return format!("{:10.3}", x);
    }
    let raw = format!("{:.2e}", x);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return format!("{:>10}", raw);
    };
    let exponent: i32 = match exponent.parse() {
        Ok(exponent) => exponent,
        Err(_) => return format!("{:>10}", raw),
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{:>10}", format!("{}e{}{:02}", mantissa, sign, exponent.abs()))
}

/// Title, reset time and observation count: the start of every report line.
pub(crate) fn title_reset_obs(title: &str, reset_at: f64, observations: u64) -> String {
    format!("{:>12}{}{:>7}", title, number(reset_at), observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_notation() {
        assert_eq!(number(0.0), "     0.000");
        assert_eq!(number(5.0), "     5.000");
        assert_eq!(number(-12.34567), "   -12.346");
        assert_eq!(number(999_999.0), "999999.000");
    }

    #[test]
    fn test_exponent_notation() {
        assert_eq!(number(1_234_567.0), "  1.23e+06");
        assert_eq!(number(0.05), "  5.00e-02");
        assert_eq!(number(-2.5e-7), " -2.50e-07");
        assert_eq!(number(0.1), "  1.00e-01");
    }

    #[test]
    fn test_non_finite_is_padded() {
        assert_eq!(number(f64::NAN), "       NaN");
        assert_eq!(number(f64::INFINITY), "       inf");
    }

    #[test]
    fn test_title_is_truncated() {
        assert_eq!(title("waiting time in queue"), "waiting time");
        assert_eq!(title("short"), "short");
    }

    #[test]
    fn test_title_reset_obs_columns() {
        let line = title_reset_obs("x", 0.0, 3);
        assert_eq!(line, format!("{}x     0.000      3", " ".repeat(11)));
    }
}
