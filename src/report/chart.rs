use std::path::Path;

use anyhow::{anyhow, Result};
use plotters::prelude::*;

use crate::models::RiskProfile;

/// Bitmap size in pixels and the DPI it is embedded at.
pub const CHART_W: u32 = 1000;
pub const CHART_H: u32 = 560;
pub const CHART_DPI: f32 = 300.0;

// Plot area inside the bitmap.
const LEFT: i32 = 20;
const RIGHT: i32 = CHART_W as i32 - 20;
const TOP: i32 = 24;
const BOTTOM: i32 = CHART_H as i32 - 24;
const BAR_W: i32 = 190;

const GRID: RGBColor = RGBColor(222, 226, 235);
const AXIS: RGBColor = RGBColor(92, 102, 133);
const BAR_COLORS: [RGBColor; 3] = [
    RGBColor(46, 139, 87),  // deforestation
    RGBColor(33, 102, 214), // water pollution
    RGBColor(128, 64, 178), // biodiversity loss
];

/// Rendered size in millimetres at [`CHART_DPI`].
pub fn size_mm() -> (f32, f32) {
    (
        CHART_W as f32 / CHART_DPI * 25.4,
        CHART_H as f32 / CHART_DPI * 25.4,
    )
}

/// Horizontal centre of bar `i`, as a fraction of the bitmap width.
pub fn bar_center_fraction(i: usize) -> f32 {
    bar_center_px(i) as f32 / CHART_W as f32
}

/// Height of axis value `v` above the bitmap's bottom edge, as a fraction of its height.
pub fn value_height_fraction(v: f64) -> f32 {
    (CHART_H as i32 - value_to_py(v)) as f32 / CHART_H as f32
}

fn bar_center_px(i: usize) -> i32 {
    let slot = (RIGHT - LEFT) / 3;
    LEFT + slot * i as i32 + slot / 2
}

fn value_to_py(v: f64) -> i32 {
    let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    BOTTOM - ((BOTTOM - TOP) as f64 * v).round() as i32
}

/// Draw the three bounded scores as bars on a fixed [0, 1] axis and save as PNG.
///
/// Only shapes are drawn; axis and category labels are set as PDF text by the caller.
pub fn render_chart(profile: &RiskProfile, path: &Path) -> Result<()> {
    let draw_err = |e: &dyn std::fmt::Display| anyhow!("chart drawing failed: {}", e);

    let root = BitMapBackend::new(path, (CHART_W, CHART_H)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(&e))?;

    for tick in 0..=4 {
        let y = value_to_py(f64::from(tick) / 4.0);
        root.draw(&PathElement::new(vec![(LEFT, y), (RIGHT, y)], GRID.stroke_width(2)))
            .map_err(|e| draw_err(&e))?;
    }

    for (i, (_, score)) in profile.bounded_scores().iter().enumerate() {
        let cx = bar_center_px(i);
        let top = value_to_py(*score);
        root.draw(&Rectangle::new(
            [(cx - BAR_W / 2, top), (cx + BAR_W / 2, BOTTOM)],
            BAR_COLORS[i].filled(),
        ))
        .map_err(|e| draw_err(&e))?;
    }

    root.draw(&PathElement::new(
        vec![(LEFT, TOP), (LEFT, BOTTOM), (RIGHT, BOTTOM)],
        AXIS.stroke_width(3),
    ))
    .map_err(|e| draw_err(&e))?;

    root.present().map_err(|e| draw_err(&e))?;
    Ok(())
}
