/// Standard bucket ladder, smallest to largest. Anything larger than the
/// last bucket saturates at it — `original_source/util.py::round_to_nearest_hd`'s
/// fallback return.
const BUCKETS: [(u32, u32); 8] = [
    (426, 240),
    (640, 360),
    (854, 480),
    (1280, 720),
    (1920, 1080),
    (2560, 1440),
    (3840, 2160),
    (7680, 4320),
];

/// Rounds `(width, height)` up to the next bucket that fits both
/// dimensions, saturating at the largest bucket.
pub fn round_up_resolution(width: u32, height: u32) -> (u32, u32) {
    BUCKETS
        .iter()
        .copied()
        .find(|&(w, h)| width <= w && height <= h)
        .unwrap_or(*BUCKETS.last().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_bucket_match_is_returned_unchanged() {
        assert_eq!(round_up_resolution(1280, 720), (1280, 720));
    }

    #[test]
    fn rounds_up_to_next_bucket() {
        assert_eq!(round_up_resolution(1000, 600), (1280, 720));
    }

    #[test]
    fn saturates_above_the_largest_bucket() {
        assert_eq!(round_up_resolution(10_000, 10_000), (7680, 4320));
    }

    #[test]
    fn zero_resolution_rounds_to_the_smallest_bucket() {
        assert_eq!(round_up_resolution(0, 0), (426, 240));
    }
}
