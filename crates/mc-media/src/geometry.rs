//! Fit geometry.
//!
//! Each fit mode is a pure function from source and target dimensions to a
//! [`TransformPlan`]: an optional centered crop, an optional resize, and
//! optional letterbox margins. All arithmetic is integer and truncating, so
//! centering offsets round toward the top-left on odd differences.
//!
//! Images and video share every mode except `contain`: video pads the
//! resized frame out to the exact target box, images do not.

use mc_core::FitMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Region of the source kept by a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Padding added around a resized frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Steps applied in order: crop, resize, pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    pub crop: Option<Crop>,
    pub resize: Option<Dimensions>,
    pub margins: Option<Margins>,
    /// Final frame size after every step.
    pub output: Dimensions,
}

impl TransformPlan {
    pub fn identity(source: Dimensions) -> Self {
        Self {
            crop: None,
            resize: None,
            margins: None,
            output: source,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.crop.is_none() && self.resize.is_none() && self.margins.is_none()
    }

    fn scaled(source: Dimensions, to: Dimensions) -> Self {
        Self {
            crop: None,
            resize: (to != source).then_some(to),
            margins: None,
            output: to,
        }
    }
}

/// Plan for an image variant.
pub fn plan_image(source: Dimensions, target: Dimensions, fit: FitMode) -> TransformPlan {
    match fit {
        FitMode::Cover => cover(source, target),
        FitMode::Contain => contain(source, target),
        FitMode::Fill => fill(source, target),
        FitMode::Inside => inside(source, target),
        FitMode::Outside => outside(source, target),
        FitMode::Passthrough => TransformPlan::identity(source),
    }
}

/// Plan for a video variant; `contain` letterboxes to the exact target.
pub fn plan_video(source: Dimensions, target: Dimensions, fit: FitMode) -> TransformPlan {
    match fit {
        FitMode::Contain => contain_letterbox(source, target),
        other => plan_image(source, target, other),
    }
}

/// Source aspect ratio is strictly wider than the target's.
fn wider(source: Dimensions, target: Dimensions) -> bool {
    u64::from(source.width) * u64::from(target.height)
        > u64::from(target.width) * u64::from(source.height)
}

fn same_aspect(source: Dimensions, target: Dimensions) -> bool {
    u64::from(source.width) * u64::from(target.height)
        == u64::from(target.width) * u64::from(source.height)
}

/// `a * b / c`, truncated, never below 1.
fn mul_div(a: u32, b: u32, c: u32) -> u32 {
    let v = u64::from(a) * u64::from(b) / u64::from(c.max(1));
    u32::try_from(v).unwrap_or(u32::MAX).max(1)
}

/// Crop to the target aspect around the center, then scale to the target.
pub fn cover(source: Dimensions, target: Dimensions) -> TransformPlan {
    let (crop_w, crop_h) = if wider(source, target) {
        (mul_div(source.height, target.width, target.height).min(source.width), source.height)
    } else {
        (source.width, mul_div(source.width, target.height, target.width).min(source.height))
    };
    let cropped = Dimensions::new(crop_w, crop_h);

    TransformPlan {
        crop: (cropped != source).then_some(Crop {
            x: (source.width - crop_w) / 2,
            y: (source.height - crop_h) / 2,
            width: crop_w,
            height: crop_h,
        }),
        resize: (cropped != target).then_some(target),
        margins: None,
        output: target,
    }
}

/// Largest aspect-preserving size within `target`, never above `source`.
fn fit_within(source: Dimensions, target: Dimensions) -> Dimensions {
    if source.width <= target.width && source.height <= target.height {
        return source;
    }
    if wider(source, target) {
        Dimensions::new(target.width, mul_div(source.height, target.width, source.width))
    } else {
        Dimensions::new(mul_div(source.width, target.height, source.height), target.height)
    }
}

/// Shrink to fit inside the target box, no letterboxing.
pub fn contain(source: Dimensions, target: Dimensions) -> TransformPlan {
    TransformPlan::scaled(source, fit_within(source, target))
}

/// Stretch to exactly the target.
pub fn fill(source: Dimensions, target: Dimensions) -> TransformPlan {
    TransformPlan::scaled(source, target)
}

/// Shrink until both sides fit the target box; never upscale.
pub fn inside(source: Dimensions, target: Dimensions) -> TransformPlan {
    TransformPlan::scaled(source, fit_within(source, target))
}

/// Scale until both sides reach the target box.
pub fn outside(source: Dimensions, target: Dimensions) -> TransformPlan {
    let to = if wider(source, target) {
        Dimensions::new(mul_div(source.width, target.height, source.height), target.height)
    } else {
        Dimensions::new(target.width, mul_div(source.height, target.width, source.width))
    };
    TransformPlan::scaled(source, to)
}

/// Scale to touch the target box, then pad symmetrically to fill it.
pub fn contain_letterbox(source: Dimensions, target: Dimensions) -> TransformPlan {
    let resized = if wider(source, target) {
        Dimensions::new(target.width, mul_div(target.width, source.height, source.width))
    } else {
        Dimensions::new(mul_div(target.height, source.width, source.height), target.height)
    };
    let resized = Dimensions::new(
        resized.width.min(target.width),
        resized.height.min(target.height),
    );

    let margins = if same_aspect(source, target) || resized == target {
        None
    } else {
        let left = (target.width - resized.width) / 2;
        let top = (target.height - resized.height) / 2;
        Some(Margins {
            left,
            top,
            right: target.width - resized.width - left,
            bottom: target.height - resized.height - top,
        })
    };

    TransformPlan {
        crop: None,
        resize: (resized != source).then_some(resized),
        margins,
        output: if margins.is_some() { target } else { resized },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FitMode; 5] = [
        FitMode::Cover,
        FitMode::Contain,
        FitMode::Fill,
        FitMode::Inside,
        FitMode::Outside,
    ];

    fn d(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h)
    }

    #[test]
    fn equal_source_and_target_is_identity() {
        for size in [d(1, 1), d(640, 480), d(333, 777)] {
            for fit in ALL {
                let img = plan_image(size, size, fit);
                assert!(img.is_identity(), "{fit} image plan not identity: {img:?}");
                assert_eq!(img.output, size);

                let vid = plan_video(size, size, fit);
                assert!(vid.is_identity(), "{fit} video plan not identity: {vid:?}");
                assert_eq!(vid.output, size);
            }
        }
    }

    #[test]
    fn inside_never_upscales() {
        for (src, tgt) in [(d(100, 50), d(400, 400)), (d(10, 10), d(11, 1000)), (d(1, 1), d(2, 2))] {
            assert_eq!(inside(src, tgt).output, src);
            assert_eq!(plan_video(src, tgt, FitMode::Inside).output, src);
        }
    }

    #[test]
    fn cover_and_fill_hit_target_exactly() {
        let cases = [
            (d(1000, 500), d(100, 100)),
            (d(500, 1000), d(300, 100)),
            (d(7, 3), d(1920, 1080)),
            (d(1920, 1080), d(1, 1)),
        ];
        for (src, tgt) in cases {
            assert_eq!(cover(src, tgt).output, tgt);
            assert_eq!(fill(src, tgt).output, tgt);
        }
    }

    #[test]
    fn cover_crops_centered_with_top_left_bias() {
        let plan = cover(d(1000, 500), d(100, 100));
        assert_eq!(
            plan.crop,
            Some(Crop { x: 250, y: 0, width: 500, height: 500 })
        );
        assert_eq!(plan.resize, Some(d(100, 100)));

        let odd = cover(d(101, 50), d(50, 50));
        assert_eq!(odd.crop.unwrap().x, 25);

        let tall = cover(d(50, 101), d(50, 50));
        assert_eq!(tall.crop, Some(Crop { x: 0, y: 25, width: 50, height: 50 }));
        assert_eq!(tall.resize, None);
    }

    #[test]
    fn contain_shrinks_without_letterbox() {
        let plan = contain(d(1000, 500), d(100, 100));
        assert_eq!(plan.output, d(100, 50));
        assert_eq!(plan.margins, None);
        assert_eq!(contain(d(50, 20), d(100, 100)).output, d(50, 20));
    }

    #[test]
    fn outside_covers_box() {
        assert_eq!(outside(d(1000, 500), d(100, 100)).output, d(200, 100));
        assert_eq!(outside(d(500, 1000), d(100, 100)).output, d(100, 200));
        assert_eq!(outside(d(50, 25), d(100, 100)).output, d(200, 100));
    }

    #[test]
    fn video_contain_letterboxes_to_target() {
        let plan = plan_video(d(1920, 1080), d(640, 640), FitMode::Contain);
        assert_eq!(plan.resize, Some(d(640, 360)));
        assert_eq!(
            plan.margins,
            Some(Margins { left: 0, top: 140, right: 0, bottom: 140 })
        );
        assert_eq!(plan.output, d(640, 640));

        // Image contain on the same input keeps the scaled size.
        assert_eq!(plan_image(d(1920, 1080), d(640, 640), FitMode::Contain).output, d(640, 360));
    }

    #[test]
    fn video_contain_odd_margin_biases_top_left() {
        let plan = contain_letterbox(d(100, 50), d(50, 52));
        assert_eq!(plan.resize, Some(d(50, 25)));
        assert_eq!(
            plan.margins,
            Some(Margins { left: 0, top: 13, right: 0, bottom: 14 })
        );
    }

    #[test]
    fn video_contain_same_aspect_has_no_margins() {
        let plan = contain_letterbox(d(1920, 1080), d(1280, 720));
        assert_eq!(plan.margins, None);
        assert_eq!(plan.output, d(1280, 720));
    }

    #[test]
    fn passthrough_leaves_source_alone() {
        let plan = plan_image(d(640, 480), d(10, 10), FitMode::Passthrough);
        assert!(plan.is_identity());
        assert_eq!(plan.output, d(640, 480));
    }

    #[test]
    fn extreme_aspect_never_reaches_zero() {
        assert_eq!(inside(d(10_000, 1), d(10, 10)).output, d(10, 1));
        assert_eq!(cover(d(1, 10_000), d(10, 10)).output, d(10, 10));
    }
}
