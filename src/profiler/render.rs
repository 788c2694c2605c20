//! Stacked-area rendering of an activity profile.
//!
//! The output extension selects the backend: `svg` draws vectors, the bitmap
//! family goes through the raster backend. Everything else is refused. The
//! stack is drawn top-down so each lower layer paints over the region the
//! layers above share with it.

use std::path::Path;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::error::{Error, ProfileError};
use crate::profiler::{ActivityProfile, TopSelection};

const CHART_SIZE: (u32, u32) = (1280, 720);

/// Fixed color assignment for chart layers, cycled when there are more
/// layers than colors.
pub const PALETTE: [RGBColor; 20] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
    RGBColor(174, 199, 232),
    RGBColor(255, 187, 120),
    RGBColor(152, 223, 138),
    RGBColor(255, 152, 150),
    RGBColor(197, 176, 213),
    RGBColor(196, 156, 148),
    RGBColor(247, 182, 210),
    RGBColor(199, 199, 199),
    RGBColor(219, 219, 141),
    RGBColor(158, 218, 229),
];

/// Renders the profile as a stacked-area chart to `output`.
///
/// # Returns
/// - `Ok(())` - Chart written
/// - `Err(Error)` - Unsupported extension or a backend drawing failure
pub fn render_chart(
    profile: &ActivityProfile,
    top: Option<&TopSelection>,
    output: &Path,
) -> Result<(), Error> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "svg" => {
            let root = SVGBackend::new(output, CHART_SIZE).into_drawing_area();
            draw_stacked(&root, profile, top)
        }
        "png" | "jpg" | "jpeg" | "gif" | "bmp" => {
            let root = BitMapBackend::new(output, CHART_SIZE).into_drawing_area();
            draw_stacked(&root, profile, top)
        }
        _ => Err(ProfileError::UnsupportedFormat(extension).into()),
    }
}

fn draw_stacked<DB>(
    root: &DrawingArea<DB, Shift>,
    profile: &ActivityProfile,
    top: Option<&TopSelection>,
) -> Result<(), Error>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    try_draw_stacked(root, profile, top)
        .map_err(|error| ProfileError::Render(error.to_string()).into())
}

fn try_draw_stacked<DB>(
    root: &DrawingArea<DB, Shift>,
    profile: &ActivityProfile,
    top: Option<&TopSelection>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let n_buckets = profile.bucket_starts.len();
    if n_buckets == 0 {
        return root.present();
    }

    let layers = profile.stacked_layers(top);

    // Upper bound of each layer = cumulative sum bottom-up.
    let mut cumulative = vec![0f64; n_buckets];
    let mut uppers: Vec<Vec<f64>> = Vec::with_capacity(layers.layers.len());
    for counts in &layers.layers {
        for (slot, count) in cumulative.iter_mut().zip(counts) {
            *slot += count;
        }
        uppers.push(cumulative.clone());
    }

    let y_max = cumulative.iter().cloned().fold(1.0f64, f64::max) * 1.05;

    let mut chart = ChartBuilder::on(root)
        .margin(12)
        .caption("Worker activity", ("sans-serif", 22))
        .x_label_area_size(44)
        .y_label_area_size(56)
        .build_cartesian_2d(0f64..n_buckets as f64, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|x| {
            let i = (*x as usize).min(n_buckets - 1);
            profile.bucket_starts[i].format("%m-%d %H:%M").to_string()
        })
        .y_desc("workers")
        .draw()?;

    for (layer_idx, upper) in uppers.iter().enumerate().rev() {
        let color = PALETTE[layer_idx % PALETTE.len()];
        let series = AreaSeries::new(
            upper.iter().enumerate().map(|(i, y)| (i as f64, *y)),
            0.0,
            color.mix(0.85),
        )
        .border_style(color);

        chart
            .draw_series(series)?
            .label(layers.labels[layer_idx].clone())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 4), (x + 10, y + 4)], color.filled())
            });
    }

    let idle = profile.idle_buckets();
    let marker_height = y_max * 0.015;
    let idle_marks: Vec<Rectangle<(f64, f64)>> = idle
        .iter()
        .enumerate()
        .filter(|(_, is_idle)| **is_idle)
        .map(|(i, _)| {
            Rectangle::new(
                [(i as f64, 0.0), (i as f64 + 1.0, marker_height)],
                BLACK.filled(),
            )
        })
        .collect();

    if !idle_marks.is_empty() {
        chart
            .draw_series(idle_marks)?
            .label("NOTHING")
            .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 10, y + 4)], BLACK.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    root.present()
}
