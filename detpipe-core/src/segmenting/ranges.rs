//! Frame range arithmetic for segment planning.

use crate::model::FrameRange;

/// Combines the input ranges and splits the result into segment ranges.
///
/// Ranges are sorted, ranges that overlap or are separated by no more than
/// `min_gap_between_segments` frames are combined, and every combined range
/// is split with [`split`].
pub fn create_segments(
    inputs: &[FrameRange],
    target_segment_length: i32,
    min_segment_length: i32,
    min_gap_between_segments: i32,
) -> Vec<FrameRange> {
    let mut sorted = inputs.to_vec();
    sorted.sort();

    let mut result = Vec::new();
    let mut current: Option<FrameRange> = None;
    for next in sorted {
        current = Some(match current {
            None => next,
            Some(range) if overlaps(&range, &next, min_gap_between_segments) => merge(&range, &next),
            Some(range) => {
                result.extend(split(&range, target_segment_length, min_segment_length));
                next
            }
        });
    }
    if let Some(range) = current {
        result.extend(split(&range, target_segment_length, min_segment_length));
    }
    result
}

/// Splits a range into pieces of `target_segment_length` frames.
///
/// The last piece absorbs any remainder shorter than `min_segment_length`.
/// A non-positive or maximal target returns the range unchanged.
pub fn split(range: &FrameRange, target_segment_length: i32, min_segment_length: i32) -> Vec<FrameRange> {
    if target_segment_length <= 0 || target_segment_length == i32::MAX {
        return vec![*range];
    }

    let target = i64::from(target_segment_length);
    let minimum = i64::from(min_segment_length);
    let end = i64::from(range.end);
    let mut result = Vec::new();
    let mut start = i64::from(range.start);
    while start <= end {
        if end <= start + (target - 1) + (minimum - 1) {
            result.push(FrameRange::new(start as i32, range.end));
            break;
        }
        result.push(FrameRange::new(start as i32, (start + target - 1) as i32));
        start += target;
    }
    result
}

/// Whether `next` starts inside `current` or within `min_gap` frames after it.
///
/// `current` must not start after `next`.
pub fn overlaps(current: &FrameRange, next: &FrameRange, min_gap: i32) -> bool {
    (current.start <= next.start && next.start <= current.end)
        || i64::from(next.start) - i64::from(current.end) <= i64::from(min_gap)
}

pub fn merge(current: &FrameRange, next: &FrameRange) -> FrameRange {
    FrameRange::new(current.start, current.end.max(next.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(pairs: &[(i32, i32)]) -> Vec<FrameRange> {
        pairs.iter().map(|&(s, e)| FrameRange::new(s, e)).collect()
    }

    #[test]
    fn split_absorbs_short_remainder() {
        // 19 trailing frames are fewer than the minimum of 20.
        let pieces = split(&FrameRange::new(0, 5018), 5000, 20);
        assert_eq!(pieces, ranges(&[(0, 5018)]));

        let pieces = split(&FrameRange::new(0, 5019), 5000, 20);
        assert_eq!(pieces, ranges(&[(0, 4999), (5000, 5019)]));
    }

    #[test]
    fn split_even_pieces() {
        let pieces = split(&FrameRange::new(0, 99), 25, 10);
        assert_eq!(pieces, ranges(&[(0, 24), (25, 49), (50, 74), (75, 99)]));
    }

    #[test]
    fn split_disabled_target() {
        assert_eq!(split(&FrameRange::new(3, 9000), 0, 20), ranges(&[(3, 9000)]));
        assert_eq!(split(&FrameRange::new(3, 9000), i32::MAX, 20), ranges(&[(3, 9000)]));
    }

    #[test]
    fn short_range_is_one_segment() {
        assert_eq!(split(&FrameRange::new(0, 4), 100, 20), ranges(&[(0, 4)]));
    }

    #[test]
    fn create_segments_combines_nearby_ranges() {
        let input = ranges(&[(50, 60), (0, 10), (15, 20), (100, 120)]);
        let segments = create_segments(&input, 1000, 1, 10);
        assert_eq!(segments, ranges(&[(0, 20), (50, 60), (100, 120)]));
    }

    #[test]
    fn create_segments_keeps_contained_ranges_inside() {
        let input = ranges(&[(0, 100), (10, 20), (90, 150)]);
        assert_eq!(create_segments(&input, 1000, 1, 0), ranges(&[(0, 150)]));
    }

    #[test]
    fn create_segments_splits_combined_range() {
        let input = ranges(&[(0, 30), (35, 59)]);
        let segments = create_segments(&input, 20, 5, 10);
        assert_eq!(segments, ranges(&[(0, 19), (20, 39), (40, 59)]));
    }

    #[test]
    fn create_segments_of_nothing() {
        assert!(create_segments(&[], 10, 1, 1).is_empty());
    }
}
