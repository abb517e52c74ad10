//! Chart rendering: SVG and PNG via plotters, Vega-Lite as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::chart_data::{format_axis_label, ChartSpec};
use crate::error::{PipelineError, Result};
use crate::ChartFormat;

/// Generate "nice" tick values in [min, max] with roughly max_ticks steps.
fn nice_ticks(min: f64, max: f64, max_ticks: usize) -> Vec<f64> {
    let range = if max > min { max - min } else { 1.0 };
    if max_ticks == 0 {
        return vec![min];
    }
    let raw_step = range / max_ticks as f64;
    let mag = 10.0_f64.powf(raw_step.log10().floor());
    let norm = raw_step / mag;
    let step = if norm <= 1.0 {
        mag
    } else if norm <= 2.0 {
        2.0 * mag
    } else if norm <= 5.0 {
        5.0 * mag
    } else {
        10.0 * mag
    };
    let start = (min / step).floor() * step;
    let mut ticks = Vec::new();
    let mut v = start;
    while v <= max + step * 0.999 {
        ticks.push(v);
        v += step;
        if ticks.len() > max_ticks + 2 {
            break;
        }
    }
    ticks
}

/// Plot area for a bar chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Half the width of one bar, in x units.
    pub bar_half_width: f64,
}

impl ChartBounds {
    /// Bounds covering every drawable point. Bars start at zero, so zero is always inside
    /// the y range. None when nothing can be drawn.
    pub fn of(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        xs.sort_by(f64::total_cmp);
        xs.dedup();
        let min_gap = xs
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(f64::INFINITY, f64::min);
        let bar_half_width = if min_gap.is_finite() { min_gap * 0.4 } else { 0.4 };

        let (lo, hi) = points
            .iter()
            .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
        let ticks = nice_ticks(lo, hi, 8);
        let y_min = ticks.first().copied().unwrap_or(lo).min(lo);
        let mut y_max = ticks.last().copied().unwrap_or(hi).max(hi);
        if y_max <= y_min {
            y_max = y_min + 1.0;
        }

        let x_lo = xs.first().copied().unwrap_or(0.0);
        let x_hi = xs.last().copied().unwrap_or(0.0);
        Some(Self {
            x_min: x_lo - bar_half_width * 1.5,
            x_max: x_hi + bar_half_width * 1.5,
            y_min,
            y_max,
            bar_half_width,
        })
    }
}

fn chart_err<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::chart(err.to_string())
}

fn draw_bar_chart<DB>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let points = spec.drawable_points();
    let bounds = ChartBounds::of(&points).ok_or_else(|| PipelineError::chart("No data to chart"))?;

    root.fill(&WHITE).map_err(chart_err)?;

    let mut binding = ChartBuilder::on(root);
    let builder = binding
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(60);
    if let Some(title) = spec.title.as_deref().filter(|t| !t.is_empty()) {
        builder.caption(title, ("sans-serif", 20));
    }
    let mut chart = builder
        .build_cartesian_2d(bounds.x_min..bounds.x_max, bounds.y_min..bounds.y_max)
        .map_err(chart_err)?;

    let label = |v: &f64| format_axis_label(*v);
    chart
        .configure_mesh()
        .x_desc(spec.x.title.as_str())
        .y_desc(spec.y.title.as_str())
        .x_label_formatter(&label)
        .y_label_formatter(&label)
        .draw()
        .map_err(chart_err)?;

    let bar = RGBColor(76, 120, 168);
    chart
        .draw_series(points.iter().map(|&(x, y)| {
            let hw = bounds.bar_half_width;
            Rectangle::new([(x - hw, 0.0), (x + hw, y)], bar.filled())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Render the chart as an SVG document.
pub fn render_chart_svg(spec: &ChartSpec) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (spec.width, spec.height)).into_drawing_area();
        draw_bar_chart(&root, spec)?;
    }
    Ok(svg)
}

/// Write chart to PNG using plotters bitmap backend.
pub fn write_chart_png(path: &Path, spec: &ChartSpec) -> Result<()> {
    let root = BitMapBackend::new(path, (spec.width, spec.height)).into_drawing_area();
    draw_bar_chart(&root, spec)
}

/// Path of the chart written next to an exported table: `<dir>/<stem>.chart.<ext>`.
pub fn chart_output_path(dir: &Path, source_name: &str, format: ChartFormat) -> PathBuf {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("chart");
    dir.join(format!("{}.chart.{}", stem, format.extension()))
}

/// Write the chart in the requested format.
pub fn write_chart(path: &Path, spec: &ChartSpec, format: ChartFormat) -> Result<()> {
    if spec.drawable_points().is_empty() {
        return Err(PipelineError::chart("No data to chart"));
    }
    match format {
        ChartFormat::Svg => fs::write(path, render_chart_svg(spec)?)?,
        ChartFormat::Png => write_chart_png(path, spec)?,
        ChartFormat::VegaLite => {
            let json = serde_json::to_vec_pretty(&spec.to_vega_lite()).map_err(chart_err)?;
            fs::write(path, json)?;
        }
    }
    debug!(path = %path.display(), format = ?format, "wrote chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_data::{AxisBinding, ChartPoint};

    fn spec(points: Vec<ChartPoint>) -> ChartSpec {
        ChartSpec {
            title: Some("t.csv".into()),
            x: AxisBinding {
                field: "Index".into(),
                title: "Index".into(),
            },
            y: AxisBinding {
                field: "v".into(),
                title: "Value".into(),
            },
            tooltip: vec!["Index".into(), "v".into()],
            row_id_field: None,
            width: 700,
            height: 400,
            points,
        }
    }

    #[test]
    fn ticks_cover_range() {
        let ticks = nice_ticks(0.0, 9.0, 5);
        assert_eq!(ticks.first().copied(), Some(0.0));
        assert!(*ticks.last().unwrap() >= 9.0);
        assert!(ticks.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn bounds_include_zero_and_bar_width() {
        let b = ChartBounds::of(&[(1.0, 5.0), (2.0, 7.0), (3.0, 9.0)]).unwrap();
        assert_eq!(b.y_min, 0.0);
        assert!(b.y_max >= 9.0);
        assert!((b.bar_half_width - 0.4).abs() < 1e-12);
        assert!(b.x_min < 1.0 - 0.4 && b.x_max > 3.0 + 0.4);
    }

    #[test]
    fn bounds_with_negative_values() {
        let b = ChartBounds::of(&[(0.0, -3.0), (10.0, 2.0)]).unwrap();
        assert!(b.y_min <= -3.0);
        assert!(b.y_max >= 2.0);
        assert!((b.bar_half_width - 4.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_of_flat_zero_series() {
        let b = ChartBounds::of(&[(1.0, 0.0)]).unwrap();
        assert!(b.y_max > b.y_min);
        assert!(ChartBounds::of(&[]).is_none());
    }

    #[test]
    fn chart_without_drawable_points_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("c.svg");
        let s = spec(vec![ChartPoint {
            row: 0,
            x: Some(1.0),
            y: None,
        }]);
        let err = write_chart(&path, &s, ChartFormat::Svg).unwrap_err();
        assert_eq!(err.kind(), "ChartError");
        assert!(!path.exists());
    }

    #[test]
    fn vega_lite_written_as_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = chart_output_path(dir.path(), "sales.xlsx", ChartFormat::VegaLite);
        assert!(path.ends_with("sales.chart.json"));
        let s = spec(vec![ChartPoint {
            row: 0,
            x: Some(1.0),
            y: Some(5.0),
        }]);
        write_chart(&path, &s, ChartFormat::VegaLite).expect("write");
        let doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        assert_eq!(doc["mark"], "bar");
        assert_eq!(doc["data"]["values"][0]["v"], 5.0);
    }

    #[test]
    fn chart_path_for_names_without_extension() {
        let p = chart_output_path(Path::new("out"), "data", ChartFormat::Png);
        assert_eq!(p, Path::new("out").join("data.chart.png"));
    }
}
