use crate::manifest::Manifest;

/// Seek tolerance in seconds. A cue that starts less than this after the
/// requested time is still considered to contain it.
pub const DEFAULT_EPSILON: f64 = 0.5;

/// Index of the cue to start streaming from for `time` seconds.
///
/// Negative times count back from the end. Times past the duration clamp to
/// the last cue and times before the start to the first. Returns `None` when
/// the manifest has no cues.
///
/// A time past the duration always gives the last cue, never cue 0.
pub fn locate_cue(manifest: &Manifest, time: f64, epsilon: f64) -> Option<usize> {
    let cues = &manifest.cues;
    if cues.is_empty() {
        return None;
    }

    let mut time = time;
    if time < 0.0 {
        time += manifest.duration.unwrap_or(0.0);
    }

    if time < 0.0 {
        return Some(0);
    }

    if manifest.duration.is_some_and(|duration| time > duration) {
        return Some(cues.len() - 1);
    }

    let next = cues
        .iter()
        .skip(1)
        .position(|cue| cue.timecode - epsilon > time)
        .map_or(cues.len(), |i| i + 1);
    Some(next - 1)
}
