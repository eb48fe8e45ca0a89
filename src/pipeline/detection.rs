use super::model::{NetworkDescriptor, Session, initialize_model};
use super::{Detection, FaceDetector, ModelError, ModelSource, suppress_overlaps};
use crate::shapes::rect::Rect;
use anyhow::{Error, Result};
use image::RgbImage;
use image::imageops::{FilterType, resize};
use ndarray::{Array, Array4, ArrayView3, Ix3};
use ort::value::Tensor;
use tracing::{Level, span, trace};

pub struct DnnDetector {
    model: Session,
    network: NetworkDescriptor,
    threshold: f32,
}

impl DnnDetector {
    /*
    Model Input: 1x3xHxW f32 RGB, normalised with the descriptor's mean
    and scale
    Model Output:
    - scores: 1xNx2, softmaxed (background, face) per prior box
    - boxes: 1xNx4, (left, top, right, bottom) in 0..1 of the input size

    Boxes are scaled back to the source image and overlapping candidates
    collapsed onto the most confident one.
     */
    pub fn new(
        source: &ModelSource,
        network: NetworkDescriptor,
        threshold: f32,
        threads: usize,
    ) -> Result<DnnDetector, ModelError> {
        Ok(DnnDetector {
            model: initialize_model(source, &network, threads)?,
            network,
            threshold,
        })
    }
}

impl FaceDetector for DnnDetector {
    fn detect(&mut self, img: &RgbImage) -> Result<Vec<Detection>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let input = Tensor::from_array(input_tensor(img, &self.network))?;
        let outputs = self.model.run(ort::inputs![self.network.input => input]?)?;

        let scores = outputs[self.network.scores]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;
        let boxes = outputs[self.network.boxes]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;

        let candidates =
            extract_results(scores, boxes, img.width(), img.height(), self.threshold)?;
        trace!("{} candidates above {}", candidates.len(), self.threshold);

        Ok(suppress_overlaps(candidates, self.network.overlap_limit_pct))
    }
}

fn input_tensor(img: &RgbImage, network: &NetworkDescriptor) -> Array4<f32> {
    let resized = resize(img, network.width, network.height, FilterType::Triangle);

    Array::from_shape_fn(
        (1, 3, network.height as usize, network.width as usize),
        |(_, c, y, x)| {
            (resized.get_pixel(x as u32, y as u32)[c] as f32 - network.mean) / network.scale
        },
    )
}

fn extract_results(
    scores: ArrayView3<f32>,
    boxes: ArrayView3<f32>,
    width: u32,
    height: u32,
    threshold: f32,
) -> Result<Vec<Detection>> {
    if scores.shape()[2] < 2 || boxes.shape()[2] < 4 {
        return Err(Error::msg(format!(
            "Unexpected network output shapes: scores {:?}, boxes {:?}",
            scores.shape(),
            boxes.shape()
        )));
    }

    let x_scale = width as f32;
    let y_scale = height as f32;
    let count = scores.shape()[1].min(boxes.shape()[1]);

    let mut results = Vec::new();
    for i in 0..count {
        let confidence = scores[[0, i, 1]];
        if confidence.is_nan() || confidence <= threshold {
            continue;
        }

        let corners = [0, 1, 2, 3].map(|k| boxes[[0, i, k]]);
        if corners.iter().any(|c| !c.is_finite()) {
            trace!("Skipping non-finite box {corners:?}");
            continue;
        }

        // Corners are normalised, anything past the input edge is clipped
        let [l, t, r, b] = corners.map(|c| c.clamp(0., 1.));
        let bounds = Rect::from_corners(
            (l * x_scale).round() as i32,
            (t * y_scale).round() as i32,
            (r * x_scale).round() as i32,
            (b * y_scale).round() as i32,
        );
        if bounds.is_empty() {
            continue;
        }

        results.push(Detection { bounds, confidence });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::ULTRAFACE_RFB_320;
    use image::Rgb;
    use ndarray::Array3;

    #[test]
    fn test_input_tensor_layout() {
        let img = RgbImage::from_pixel(640, 480, Rgb([255, 127, 0]));
        let tensor = input_tensor(&img, &ULTRAFACE_RFB_320);

        assert_eq!(tensor.shape(), &[1, 3, 240, 320]);
        assert!((tensor[[0, 0, 10, 10]] - 1.).abs() < 1e-6);
        assert!(tensor[[0, 1, 100, 200]].abs() < 1e-6);
        assert!((tensor[[0, 2, 239, 319]] + 127. / 128.).abs() < 1e-6);
    }

    #[test]
    fn test_extract_results_scales_and_filters() {
        let scores =
            Array3::from_shape_vec((1, 3, 2), vec![0.1, 0.9, 0.8, 0.2, 0.25, 0.75]).unwrap();
        let boxes = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                0.25, 0.5, 0.5, 1.0, //
                0.0, 0.0, 1.0, 1.0, //
                0.5, 0.5, 0.5, 0.75,
            ],
        )
        .unwrap();

        let found = extract_results(scores.view(), boxes.view(), 200, 100, 0.7).unwrap();

        // Second row is background, third has zero width
        assert_eq!(found.len(), 1);
        let face = found[0];
        assert_eq!(face.confidence, 0.9);
        assert_eq!(face.bounds.left(), 50);
        assert_eq!(face.bounds.top(), 50);
        assert_eq!(face.bounds.right(), 100);
        assert_eq!(face.bounds.bottom(), 100);
    }

    #[test]
    fn test_extract_results_rejects_narrow_scores() {
        let scores = Array3::from_shape_vec((1, 2, 1), vec![0.9, 0.9]).unwrap();
        let boxes = Array3::<f32>::zeros((1, 2, 4));

        assert!(extract_results(scores.view(), boxes.view(), 10, 10, 0.5).is_err());
        assert!(extract_results(boxes.view(), scores.view(), 10, 10, 0.5).is_err());
    }

    #[test]
    fn test_extract_results_skips_non_finite_and_clips() {
        let scores = Array3::from_shape_vec((1, 3, 2), vec![0., 1., 0., 1., 0., 1.]).unwrap();
        let boxes = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                f32::NAN, 0., 0.5, 0.5, //
                0., f32::NEG_INFINITY, f32::INFINITY, 1., //
                -3., -1e30, 0.5, 1e30,
            ],
        )
        .unwrap();

        let found = extract_results(scores.view(), boxes.view(), 100, 80, 0.5).unwrap();

        assert_eq!(found.len(), 1);
        let face = found[0].bounds;
        assert_eq!((face.left(), face.top()), (0, 0));
        assert_eq!((face.right(), face.bottom()), (50, 80));
    }
}
