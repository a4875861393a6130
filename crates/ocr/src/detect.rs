use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::collections::VecDeque;

use crate::types::Region;

/// Tuning knobs for table-region detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectConfig {
    /// Global threshold below which a pixel counts as ink.
    pub ink_threshold: u8,
    /// Minimum run length for a stretch of ink to count as a gridline.
    pub line_span: u32,
    /// Components with fewer foreground pixels than this are noise.
    pub min_area: u32,
    /// Padding added around the winning bounding box.
    pub margin: u32,
    /// When no gridlines are found, assume the table starts this far
    /// down the page (fraction of height).
    pub fallback_top: f32,
}

impl Default for DetectConfig {
    fn default() -> Self {
        DetectConfig {
            ink_threshold: 180,
            line_span: 30,
            min_area: 5000,
            margin: 20,
            fallback_top: 0.4,
        }
    }
}

/// Locate the tabular sub-region of a full-page image.
///
/// Gridlines are isolated as long horizontal and vertical ink runs;
/// body text never produces runs that long. The largest connected blob
/// of gridline pixels wins, padded by a margin. With no candidate
/// above the noise floor, the lower portion of the page is returned:
/// a deliberate heuristic for the quotation layouts this tool targets,
/// not a general answer.
///
/// Never fails: some region always comes back.
pub fn detect_table_region(img: &DynamicImage, cfg: &DetectConfig) -> Region {
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();

    let ink = threshold_inverted(&gray, cfg.ink_threshold);
    let horizontal = keep_horizontal_runs(&ink, cfg.line_span);
    let vertical = keep_vertical_runs(&ink, cfg.line_span);
    let lines = union(&horizontal, &vertical);

    let best = components(&lines)
        .into_iter()
        .filter(|c| c.area >= u64::from(cfg.min_area))
        .max_by_key(|c| c.area);

    match best {
        Some(c) => {
            let x = c.min_x.saturating_sub(cfg.margin);
            let y = c.min_y.saturating_sub(cfg.margin);
            let w = c.max_x - x + 1 + cfg.margin;
            let h = c.max_y - y + 1 + cfg.margin;
            Region::clipped_to(x, y, w, h, width, height)
        }
        None => fallback_region(width, height, cfg.fallback_top),
    }
}

/// Lower-portion fallback: full width, from `top` × height to the bottom.
pub fn fallback_region(width: u32, height: u32, top: f32) -> Region {
    let y = (height as f32 * top) as u32;
    Region::clipped_to(0, y, width, height.saturating_sub(y).max(1), width, height)
}

/// Dark ink becomes the (white) foreground.
fn threshold_inverted(gray: &GrayImage, cut: u8) -> GrayImage {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] < cut {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Morphological opening with a 1×span element, expressed directly as a
/// run-length filter: foreground runs shorter than `span` vanish,
/// longer ones survive intact.
fn keep_horizontal_runs(mask: &GrayImage, span: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut out: GrayImage = ImageBuffer::new(w, h);
    for y in 0..h {
        let mut run_start = 0u32;
        let mut run_len = 0u32;
        for x in 0..=w {
            let on = x < w && mask.get_pixel(x, y)[0] == 255;
            if on {
                if run_len == 0 {
                    run_start = x;
                }
                run_len += 1;
            } else {
                if run_len >= span {
                    for rx in run_start..run_start + run_len {
                        out.put_pixel(rx, y, Luma([255u8]));
                    }
                }
                run_len = 0;
            }
        }
    }
    out
}

/// Opening with a span×1 element, column-wise.
fn keep_vertical_runs(mask: &GrayImage, span: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut out: GrayImage = ImageBuffer::new(w, h);
    for x in 0..w {
        let mut run_start = 0u32;
        let mut run_len = 0u32;
        for y in 0..=h {
            let on = y < h && mask.get_pixel(x, y)[0] == 255;
            if on {
                if run_len == 0 {
                    run_start = y;
                }
                run_len += 1;
            } else {
                if run_len >= span {
                    for ry in run_start..run_start + run_len {
                        out.put_pixel(x, ry, Luma([255u8]));
                    }
                }
                run_len = 0;
            }
        }
    }
    out
}

fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    ImageBuffer::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].max(b.get_pixel(x, y)[0])])
    })
}

struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u64,
}

/// 4-connected component labeling over the combined line mask, tracking
/// bounding box and pixel count per component.
fn components(mask: &GrayImage) -> Vec<Component> {
    let (w, h) = mask.dimensions();
    let mut visited = vec![false; (w as usize) * (h as usize)];
    let idx = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;
    let mut found = Vec::new();

    for sy in 0..h {
        for sx in 0..w {
            if visited[idx(sx, sy)] || mask.get_pixel(sx, sy)[0] != 255 {
                continue;
            }
            let mut comp = Component { min_x: sx, min_y: sy, max_x: sx, max_y: sy, area: 0 };
            let mut queue = VecDeque::new();
            visited[idx(sx, sy)] = true;
            queue.push_back((sx, sy));

            while let Some((x, y)) = queue.pop_front() {
                comp.area += 1;
                comp.min_x = comp.min_x.min(x);
                comp.min_y = comp.min_y.min(y);
                comp.max_x = comp.max_x.max(x);
                comp.max_y = comp.max_y.max(y);

                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx < w && ny < h && !visited[idx(nx, ny)] && mask.get_pixel(nx, ny)[0] == 255 {
                        visited[idx(nx, ny)] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
            found.push(comp);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page(w: u32, h: u32) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(w, h, |_, _| Luma([255u8]));
        DynamicImage::ImageLuma8(img)
    }

    /// A page with a ruled table: horizontal and vertical gridlines
    /// forming a grid between (x0,y0) and (x1,y1).
    fn page_with_grid(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(w, h, |x, y| {
            let on_h = (x0..=x1).contains(&x) && (y0..=y1).contains(&y) && (y - y0) % 20 == 0;
            let on_v = (x0..=x1).contains(&x) && (y0..=y1).contains(&y) && (x - x0) % 40 == 0;
            if on_h || on_v {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn blank_page_returns_lower_portion_fallback() {
        let region = detect_table_region(&blank_page(400, 500), &DetectConfig::default());
        assert_eq!(region, Region { x: 0, y: 200, width: 400, height: 300 });
    }

    #[test]
    fn small_marks_fall_below_area_floor() {
        // A single 40 px line clears the run filter but its component
        // stays under min_area, so the fallback still applies.
        let img: GrayImage = ImageBuffer::from_fn(400, 500, |x, y| {
            if y == 50 && (100..140).contains(&x) {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        let region =
            detect_table_region(&DynamicImage::ImageLuma8(img), &DetectConfig::default());
        assert_eq!(region, fallback_region(400, 500, 0.4));
    }

    #[test]
    fn grid_bounding_box_with_margin() {
        let region = detect_table_region(
            &page_with_grid(600, 800, 100, 300, 500, 700),
            &DetectConfig::default(),
        );
        // Grid box expanded by the 20 px margin on all sides.
        assert_eq!(region, Region { x: 80, y: 280, width: 441, height: 441 });
    }

    #[test]
    fn margin_is_clipped_at_image_edge() {
        let region = detect_table_region(
            &page_with_grid(300, 300, 0, 0, 280, 280),
            &DetectConfig::default(),
        );
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
        assert!(region.x + region.width <= 300);
        assert!(region.y + region.height <= 300);
    }

    #[test]
    fn body_text_alone_does_not_trigger_detection() {
        // Short dashes, like words on a page: none reaches line_span.
        let img: GrayImage = ImageBuffer::from_fn(400, 500, |x, y| {
            if y % 15 == 0 && (x % 25) < 10 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        let region =
            detect_table_region(&DynamicImage::ImageLuma8(img), &DetectConfig::default());
        assert_eq!(region, fallback_region(400, 500, 0.4));
    }

    #[test]
    fn largest_component_wins() {
        // Two separate ruled boxes; the bigger one should be picked.
        let img: GrayImage = ImageBuffer::from_fn(800, 800, |x, y| {
            let small = ((50..=150).contains(&x) && (50..=150).contains(&y))
                && ((y - 50) % 50 == 0 || (x - 50) % 50 == 0);
            let large = ((200..=700).contains(&x) && (300..=750).contains(&y))
                && ((y - 300) % 30 == 0 || (x - 200) % 50 == 0);
            if small || large {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        let region =
            detect_table_region(&DynamicImage::ImageLuma8(img), &DetectConfig::default());
        assert!(region.contains(450, 500));
        assert!(!region.contains(60, 60));
    }

    #[test]
    fn fallback_region_is_never_empty() {
        let r = fallback_region(10, 1, 0.4);
        assert!(r.width > 0 && r.height > 0);
    }
}
