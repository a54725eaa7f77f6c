/// Round to two decimal places. Applied only where figures leave the crate.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(0.0), 0.0);
    }
}
