//! Ranged random numbers on top of a raw 32-bit sample.

/// Map `sample` into `[min(a, b), max(a, b)]`.
///
/// Uses a plain modulo, matching what the modem library expects from its
/// HAL. The full `0..=u32::MAX` range returns the sample unchanged.
pub fn in_range(sample: u32, a: u32, b: u32) -> u32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    match (hi - lo).checked_add(1) {
        Some(span) => lo + sample % span,
        None => sample,
    }
}

/// Signed variant of [`in_range`].
pub fn signed_in_range(sample: u32, a: i32, b: i32) -> i32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let span = hi.wrapping_sub(lo) as u32;
    lo.wrapping_add(in_range(sample, 0, span) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_bounds() {
        for sample in [0, 1, 7, 1000, u32::MAX - 1, u32::MAX] {
            let v = in_range(sample, 10, 20);
            assert!((10..=20).contains(&v), "sample {} gave {}", sample, v);
        }
    }

    #[test]
    fn test_in_range_orders_operands() {
        assert_eq!(in_range(5, 20, 10), in_range(5, 10, 20));
        assert_eq!(in_range(5, 10, 20), 15);
    }

    #[test]
    fn test_in_range_single_value() {
        assert_eq!(in_range(12345, 42, 42), 42);
    }

    #[test]
    fn test_in_range_full_span() {
        assert_eq!(in_range(0xDEADBEEF, 0, u32::MAX), 0xDEADBEEF);
        assert_eq!(in_range(0xDEADBEEF, u32::MAX, 0), 0xDEADBEEF);
    }

    #[test]
    fn test_signed_in_range() {
        for sample in [0, 3, 99, u32::MAX] {
            let v = signed_in_range(sample, -5, 5);
            assert!((-5..=5).contains(&v), "sample {} gave {}", sample, v);
        }
        assert_eq!(signed_in_range(0, 5, -5), -5);
        assert_eq!(signed_in_range(0, -3, -3), -3);
    }

    #[test]
    fn test_signed_full_span() {
        let v = signed_in_range(0, i32::MIN, i32::MAX);
        assert_eq!(v, i32::MIN);
        let v = signed_in_range(u32::MAX, i32::MIN, i32::MAX);
        assert_eq!(v, i32::MAX);
    }
}
