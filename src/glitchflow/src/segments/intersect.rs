use super::{CoincidentSegment, Interval, StreamId};
use std::collections::BTreeMap;

/// Computes the times covered by every stream's interval list.
///
/// Endpoints from all streams are swept in time order while counting how many streams are
/// active. An output segment opens when the count reaches the number of streams and closes as
/// soon as it drops below. Closings sort before openings at equal timestamps, so touching
/// half-open intervals never produce a zero-length overlap.
pub fn intersect(streams: &BTreeMap<StreamId, Vec<Interval>>) -> Vec<CoincidentSegment> {
    let required = streams.len();
    if required == 0 {
        return Vec::new();
    }

    let mut events: Vec<(i64, i8)> = Vec::new();
    for intervals in streams.values() {
        let intervals = coalesce(intervals);
        if intervals.is_empty() {
            return Vec::new();
        }
        for interval in intervals {
            events.push((interval.start(), 1));
            events.push((interval.end(), -1));
        }
    }
    events.sort_unstable();

    let mut segments = Vec::new();
    let mut active = 0usize;
    let mut open_at = None;

    for (time, delta) in events {
        if delta > 0 {
            active += 1;
            if active == required {
                open_at = Some(time);
            }
        } else {
            if active == required {
                if let Some(interval) = open_at.take().and_then(|s| Interval::try_from_pair(s, time))
                {
                    segments.push(CoincidentSegment::new(interval));
                }
            }
            active -= 1;
        }
    }

    segments
}

/// Sorts one stream's intervals and merges any that overlap or touch, so each stream
/// contributes at most one to the active count at any instant.
fn coalesce(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_unstable();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}
