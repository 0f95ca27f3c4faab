//! Decides once, at model load, which output tensor holds boxes and which
//! holds scores.
//!
//! Exports of the same detector family name their outputs differently, so
//! pinned names are preferred and shape sniffing is the fallback.

use thiserror::Error;

/// Declared name and shape of one model output. Dynamic dimensions are
/// negative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSignature {
    pub name: String,
    pub shape: Vec<i64>,
}

impl OutputSignature {
    pub fn new(name: &str, shape: &[i64]) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.to_vec(),
        }
    }

    fn last_dim(&self) -> Option<i64> {
        self.shape.last().copied()
    }
}

/// How per-detection scores are laid out in the score tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreLayout {
    /// One value per detection (`[N]`, `[1, N]`, `[1, N, 1]`).
    PerDetection,
    /// `[background, face]` pairs; the face column is used.
    FaceColumn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoresBinding {
    pub index: usize,
    pub layout: ScoreLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputBinding {
    pub boxes: usize,
    pub scores: Option<ScoresBinding>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindingError {
    #[error("model has no output shaped like per-detection boxes (last dimension 4): {0:?}")]
    NoBoxesOutput(Vec<String>),
}

/// Binds box and score outputs.
///
/// A pinned name wins when the model declares it; an unknown pinned name
/// is logged and shape sniffing takes over.
pub fn resolve_binding(
    outputs: &[OutputSignature],
    pinned_boxes: Option<&str>,
    pinned_scores: Option<&str>,
) -> Result<OutputBinding, BindingError> {
    let boxes = match pinned_index(outputs, pinned_boxes) {
        Some(i) => i,
        None => outputs
            .iter()
            .position(|o| o.last_dim() == Some(4))
            .ok_or_else(|| {
                BindingError::NoBoxesOutput(outputs.iter().map(|o| o.name.clone()).collect())
            })?,
    };

    let scores = match pinned_index(outputs, pinned_scores).filter(|&i| i != boxes) {
        Some(i) => Some(ScoresBinding {
            index: i,
            layout: layout_of(&outputs[i]),
        }),
        None => outputs
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != boxes)
            .find(|(_, o)| looks_like_scores(o))
            .map(|(i, o)| ScoresBinding {
                index: i,
                layout: layout_of(o),
            }),
    };

    Ok(OutputBinding { boxes, scores })
}

fn pinned_index(outputs: &[OutputSignature], name: Option<&str>) -> Option<usize> {
    let name = name?;
    let found = outputs.iter().position(|o| o.name == name);
    if found.is_none() {
        log::warn!("pinned output {name:?} not declared by model; falling back to shape matching");
    }
    found
}

fn looks_like_scores(output: &OutputSignature) -> bool {
    match output.last_dim() {
        Some(4) => false,
        Some(1) | Some(2) => true,
        _ => output.shape.len() <= 2,
    }
}

fn layout_of(output: &OutputSignature) -> ScoreLayout {
    if output.shape.len() >= 2 && output.last_dim() == Some(2) {
        ScoreLayout::FaceColumn
    } else {
        ScoreLayout::PerDetection
    }
}

/// Flattens raw score data into one value per detection.
///
/// Data that does not fit the layout is returned as-is; the decoder then
/// sees a count mismatch and takes its fallback path.
pub fn scores_per_detection(data: &[f32], layout: ScoreLayout, detections: usize) -> Vec<f32> {
    match layout {
        ScoreLayout::FaceColumn if data.len() == detections * 2 => {
            data.chunks_exact(2).map(|pair| pair[1]).collect()
        }
        _ => data.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sig(name: &str, shape: &[i64]) -> OutputSignature {
        OutputSignature::new(name, shape)
    }

    #[test]
    fn test_boxes_and_scores_by_shape() {
        let outputs = [sig("scores", &[1, -1]), sig("boxes", &[1, -1, 4])];
        let b = resolve_binding(&outputs, None, None).unwrap();
        assert_eq!(b.boxes, 1);
        assert_eq!(
            b.scores,
            Some(ScoresBinding {
                index: 0,
                layout: ScoreLayout::PerDetection,
            })
        );
    }

    #[test]
    fn test_two_column_scores_use_face_column() {
        let outputs = [sig("loc", &[1, 16800, 4]), sig("conf", &[1, 16800, 2])];
        let b = resolve_binding(&outputs, None, None).unwrap();
        assert_eq!(b.boxes, 0);
        assert_eq!(
            b.scores,
            Some(ScoresBinding {
                index: 1,
                layout: ScoreLayout::FaceColumn,
            })
        );
    }

    #[test]
    fn test_single_box_export_without_scores() {
        let outputs = [sig("output", &[1, 4])];
        let b = resolve_binding(&outputs, None, None).unwrap();
        assert_eq!(b.boxes, 0);
        assert!(b.scores.is_none());
    }

    #[test]
    fn test_landmark_outputs_are_not_scores() {
        let outputs = [
            sig("boxes", &[1, -1, 4]),
            sig("landmarks", &[1, -1, 10]),
            sig("scores", &[1, -1, 1]),
        ];
        let b = resolve_binding(&outputs, None, None).unwrap();
        assert_eq!(b.scores.map(|s| s.index), Some(2));
    }

    #[test]
    fn test_no_boxes_output_is_error() {
        let outputs = [sig("embedding", &[1, 512])];
        let err = resolve_binding(&outputs, None, None).unwrap_err();
        assert_eq!(err, BindingError::NoBoxesOutput(vec!["embedding".into()]));
    }

    #[test]
    fn test_pinned_names_win_over_shapes() {
        let outputs = [
            sig("a", &[1, -1, 4]),
            sig("b", &[1, -1, 4]),
            sig("c", &[1, -1]),
            sig("d", &[1, -1, 2]),
        ];
        let b = resolve_binding(&outputs, Some("b"), Some("d")).unwrap();
        assert_eq!(b.boxes, 1);
        assert_eq!(
            b.scores,
            Some(ScoresBinding {
                index: 3,
                layout: ScoreLayout::FaceColumn,
            })
        );
    }

    #[test]
    fn test_unknown_pinned_name_falls_back() {
        let outputs = [sig("boxes", &[1, -1, 4]), sig("scores", &[1, -1])];
        let b = resolve_binding(&outputs, Some("bbox"), Some("conf")).unwrap();
        assert_eq!(b.boxes, 0);
        assert_eq!(b.scores.map(|s| s.index), Some(1));
    }

    #[rstest]
    #[case::per_detection(&[0.1, 0.9, 0.4], ScoreLayout::PerDetection, 3, vec![0.1, 0.9, 0.4])]
    #[case::face_column(&[0.9, 0.1, 0.2, 0.8], ScoreLayout::FaceColumn, 2, vec![0.1, 0.8])]
    #[case::face_column_mismatch(&[0.9, 0.1, 0.2], ScoreLayout::FaceColumn, 2, vec![0.9, 0.1, 0.2])]
    fn test_scores_per_detection(
        #[case] data: &[f32],
        #[case] layout: ScoreLayout,
        #[case] n: usize,
        #[case] expected: Vec<f32>,
    ) {
        assert_eq!(scores_per_detection(data, layout, n), expected);
    }
}
