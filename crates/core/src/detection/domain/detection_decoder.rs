//! Turns raw detector outputs into at most one face box in image space.

use crate::geometry::letterbox::Letterbox;
use crate::shared::bounding_box::BoundingBox;

use super::face_detector::Detection;

/// Detector outputs with the boxes/scores roles already bound.
///
/// Boxes are `(x1, y1, x2, y2)` corners in detector-input space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectorOutputs {
    pub boxes: Vec<[f32; 4]>,
    pub scores: Option<Vec<f32>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeParams {
    pub confidence_floor: f32,
    pub min_face_size: u32,
}

/// Picks the highest-scoring box, applies the floor, maps it back through
/// the letterbox, clamps it and rejects boxes below `min_face_size`.
///
/// Without a score per box the first box is taken unscored; that branch is
/// logged because it usually means an unfamiliar model export.
pub fn decode(
    outputs: &DetectorOutputs,
    letterbox: &Letterbox,
    image_w: u32,
    image_h: u32,
    params: &DecodeParams,
) -> Option<Detection> {
    if outputs.boxes.is_empty() {
        log::debug!("detector returned no boxes");
        return None;
    }

    let (index, confidence) = match select_best(outputs) {
        Some((i, score)) => (i, Some(score)),
        None => (0, None),
    };

    if let Some(score) = confidence {
        // NaN fails this comparison too.
        if !(score >= params.confidence_floor) {
            log::debug!(
                "best face score {score:.3} below floor {:.3}",
                params.confidence_floor
            );
            return None;
        }
    }

    let [x1, y1, x2, y2] = outputs.boxes[index];
    let (sx1, sy1) = letterbox.to_source(x1 as f64, y1 as f64);
    let (sx2, sy2) = letterbox.to_source(x2 as f64, y2 as f64);

    let Some(bbox) = BoundingBox::from_corners_clamped((sx1, sy1, sx2, sy2), image_w, image_h)
    else {
        log::debug!("face box ({x1}, {y1}, {x2}, {y2}) falls outside the image");
        return None;
    };
    if bbox.min_side() < params.min_face_size {
        log::debug!(
            "face box {}x{} smaller than {}px",
            bbox.width,
            bbox.height,
            params.min_face_size
        );
        return None;
    }

    Some(Detection { bbox, confidence })
}

/// Index and score of the best box, or `None` when scores are missing or
/// do not line up one-to-one with the boxes.
fn select_best(outputs: &DetectorOutputs) -> Option<(usize, f32)> {
    let Some(scores) = outputs.scores.as_ref() else {
        log::warn!(
            "no score tensor bound; using first of {} boxes",
            outputs.boxes.len()
        );
        return None;
    };
    if scores.len() != outputs.boxes.len() {
        log::warn!(
            "score count {} does not match box count {}; using first box",
            scores.len(),
            outputs.boxes.len()
        );
        return None;
    }

    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .or(Some((0, f32::NAN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAMS: DecodeParams = DecodeParams {
        confidence_floor: 0.5,
        min_face_size: 16,
    };

    /// 800x1000 source: scale 0.64, pad_x 64.
    fn letterbox() -> Letterbox {
        Letterbox::compute(800, 1000, 640)
    }

    /// Detector-space corners for a source-space box.
    fn det_box(x: f64, y: f64, w: f64, h: f64) -> [f32; 4] {
        let lb = letterbox();
        let (x1, y1) = lb.to_detector(x, y);
        let (x2, y2) = lb.to_detector(x + w, y + h);
        [x1 as f32, y1 as f32, x2 as f32, y2 as f32]
    }

    #[test]
    fn test_highest_score_wins() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(400.0, 500.0, 100.0, 100.0), det_box(100.0, 50.0, 200.0, 250.0)],
            scores: Some(vec![0.6, 0.95]),
        };
        let d = decode(&outputs, &letterbox(), 800, 1000, &PARAMS).unwrap();
        assert_eq!(d.bbox, BoundingBox::new(100, 50, 200, 250, 800, 1000).unwrap());
        assert_relative_eq!(d.confidence.unwrap(), 0.95);
    }

    #[test]
    fn test_below_floor_is_miss() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(100.0, 50.0, 200.0, 250.0)],
            scores: Some(vec![0.49]),
        };
        assert!(decode(&outputs, &letterbox(), 800, 1000, &PARAMS).is_none());
    }

    #[test]
    fn test_score_exactly_at_floor_passes() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(100.0, 50.0, 200.0, 250.0)],
            scores: Some(vec![0.5]),
        };
        assert!(decode(&outputs, &letterbox(), 800, 1000, &PARAMS).is_some());
    }

    #[test]
    fn test_missing_scores_fall_back_to_first_box() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(100.0, 50.0, 200.0, 250.0), det_box(400.0, 500.0, 100.0, 100.0)],
            scores: None,
        };
        let d = decode(&outputs, &letterbox(), 800, 1000, &PARAMS).unwrap();
        assert_eq!(d.bbox.x, 100);
        assert!(d.confidence.is_none());
    }

    #[test]
    fn test_mismatched_scores_fall_back_to_first_box() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(100.0, 50.0, 200.0, 250.0), det_box(400.0, 500.0, 100.0, 100.0)],
            scores: Some(vec![0.1, 0.9, 0.3]),
        };
        let d = decode(&outputs, &letterbox(), 800, 1000, &PARAMS).unwrap();
        assert_eq!(d.bbox.x, 100);
        assert!(d.confidence.is_none());
    }

    #[test]
    fn test_nan_scores_never_pass_floor() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(100.0, 50.0, 200.0, 250.0)],
            scores: Some(vec![f32::NAN]),
        };
        assert!(decode(&outputs, &letterbox(), 800, 1000, &PARAMS).is_none());
    }

    #[test]
    fn test_box_clamped_to_image() {
        // Hangs into the left letterbox padding.
        let outputs = DetectorOutputs {
            boxes: vec![[0.0, 100.0, 200.0, 300.0]],
            scores: Some(vec![0.9]),
        };
        let d = decode(&outputs, &letterbox(), 800, 1000, &PARAMS).unwrap();
        assert_eq!(d.bbox.x, 0);
        // (200 - 64) / 0.64 = 212.5 → 213
        assert_eq!(d.bbox.right(), 213);
    }

    #[test]
    fn test_small_box_is_miss() {
        let outputs = DetectorOutputs {
            boxes: vec![det_box(100.0, 100.0, 12.0, 40.0)],
            scores: Some(vec![0.99]),
        };
        assert!(decode(&outputs, &letterbox(), 800, 1000, &PARAMS).is_none());
    }

    #[test]
    fn test_box_entirely_in_padding_is_miss() {
        let outputs = DetectorOutputs {
            boxes: vec![[0.0, 0.0, 60.0, 60.0]],
            scores: Some(vec![0.99]),
        };
        assert!(decode(&outputs, &letterbox(), 800, 1000, &PARAMS).is_none());
    }

    #[test]
    fn test_no_boxes_is_miss() {
        let outputs = DetectorOutputs::default();
        assert!(decode(&outputs, &letterbox(), 800, 1000, &PARAMS).is_none());
    }
}
