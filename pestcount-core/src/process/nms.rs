use crate::analysis::detection::Detection;

/// Greedy Non-Maximum Suppression.
///
/// Candidates are sorted by confidence, highest first (stable, so equal
/// scores keep their decode order). Walking that order, each candidate that
/// is still active is kept and every later candidate overlapping it with
/// `IoU > iou_threshold` is deactivated. A deactivated candidate never
/// suppresses anything itself.
///
/// O(n²) in the number of candidates, which stays in the dozens once the
/// confidence threshold has been applied.
pub fn nms(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if candidates.len() < 2 {
        return candidates;
    }

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep_flags = vec![true; candidates.len()];

    for current_index in 0..candidates.len() {
        if !keep_flags[current_index] {
            continue;
        }

        let current_bbox = candidates[current_index].bbox;
        for later_index in current_index + 1..candidates.len() {
            if keep_flags[later_index]
                && current_bbox.iou(&candidates[later_index].bbox) > iou_threshold
            {
                keep_flags[later_index] = false;
            }
        }
    }

    candidates
        .into_iter()
        .zip(keep_flags)
        .filter_map(|(candidate, keep)| keep.then_some(candidate))
        .collect()
}
