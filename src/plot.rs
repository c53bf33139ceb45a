//! 用 OpenCV 绘图原语渲染箱线图

use std::path::Path;

use anyhow::{Result, bail, ensure};
use opencv::core::{CV_8UC3, Mat, Point, Rect, Scalar, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};

const WIDTH: i32 = 1000;
const HEIGHT: i32 = 600;
const MARGIN_LEFT: i32 = 100;
const MARGIN_RIGHT: i32 = 30;
const MARGIN_TOP: i32 = 60;
const MARGIN_BOTTOM: i32 = 60;
const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;

/// 纵轴刻度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

/// 箱线图的五个位置量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// 不低于 `q1 - 1.5 IQR` 的最小样本
    pub whisker_low: f64,
    /// 不高于 `q3 + 1.5 IQR` 的最大样本
    pub whisker_high: f64,
}

/// 已排序序列的线性插值分位数
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// 计算箱线图位置量，NaN 会被忽略，空序列返回 `None`
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut sorted = values.iter().copied().filter(|v| !v.is_nan()).collect::<Vec<_>>();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 0.25);
    let median = percentile(&sorted, 0.5);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let whisker_low = sorted.iter().copied().find(|&v| v >= low).unwrap_or(q1);
    let whisker_high = sorted.iter().rev().copied().find(|&v| v <= high).unwrap_or(q3);
    Some(BoxStats { q1, median, q3, whisker_low, whisker_high })
}

/// 纵轴映射
struct Axis {
    scale: Scale,
    min: f64,
    max: f64,
}

impl Axis {
    fn new(scale: Scale, stats: &[BoxStats]) -> Self {
        let values = stats.iter().flat_map(|s| [s.whisker_low, s.q1, s.q3, s.whisker_high]);
        let (mut min, mut max) = match scale {
            Scale::Linear => values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            }),
            // 对数轴只能容纳正数
            Scale::Log => values.filter(|&v| v > 0.).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v.log10()), hi.max(v.log10())),
            ),
        };
        if !min.is_finite() || !max.is_finite() {
            (min, max) = (0., 1.);
        }
        match scale {
            Scale::Linear => {
                let pad = if max > min { (max - min) * 0.05 } else { 1. };
                (min, max) = ((min - pad).max(0.), max + pad);
            }
            Scale::Log => (min, max) = (min.floor(), max.ceil().max(min.floor() + 1.)),
        }
        Self { scale, min, max }
    }

    fn transform(&self, v: f64) -> f64 {
        match self.scale {
            Scale::Linear => v,
            Scale::Log if v > 0. => v.log10(),
            Scale::Log => self.min,
        }
    }

    fn to_pixel(&self, v: f64) -> i32 {
        let t = ((self.transform(v) - self.min) / (self.max - self.min)).clamp(0., 1.);
        let bottom = HEIGHT - MARGIN_BOTTOM;
        let plot_height = (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) as f64;
        bottom - (t * plot_height).round() as i32
    }

    /// 刻度的取值与标签
    fn ticks(&self) -> Vec<(f64, String)> {
        match self.scale {
            Scale::Linear => (0..=5)
                .map(|i| {
                    let v = self.min + (self.max - self.min) * i as f64 / 5.;
                    (v, format!("{:.3}", v))
                })
                .collect(),
            Scale::Log => (self.min as i32..=self.max as i32)
                .map(|e| (10f64.powi(e), format!("1e{}", e)))
                .collect(),
        }
    }
}

fn black() -> Scalar {
    Scalar::all(0.)
}

fn grey() -> Scalar {
    Scalar::all(200.)
}

fn text(canvas: &mut Mat, s: &str, org: Point, scale: f64) -> opencv::Result<()> {
    imgproc::put_text(canvas, s, org, FONT, scale, black(), 1, imgproc::LINE_AA, false)
}

fn centered_text(canvas: &mut Mat, s: &str, x: i32, y: i32, scale: f64) -> opencv::Result<()> {
    let mut baseline = 0;
    let size = imgproc::get_text_size(s, FONT, scale, 1, &mut baseline)?;
    text(canvas, s, Point::new(x - size.width / 2, y), scale)
}

fn line(canvas: &mut Mat, a: Point, b: Point, color: Scalar) -> opencv::Result<()> {
    imgproc::line(canvas, a, b, color, 1, imgproc::LINE_8, 0)
}

/// 每个分组一个箱体，分组名写在横轴下方
pub fn render_boxplot(
    path: impl AsRef<Path>,
    title: &str,
    y_label: &str,
    groups: &[(String, Vec<f64>)],
    scale: Scale,
) -> Result<()> {
    let path = path.as_ref();
    let stats = groups
        .iter()
        .filter_map(|(name, values)| box_stats(values).map(|s| (name.as_str(), s)))
        .collect::<Vec<_>>();
    ensure!(!stats.is_empty(), "没有可以绘制的数据: {}", title);

    let axis = Axis::new(scale, &stats.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    let mut canvas =
        Mat::new_rows_cols_with_default(HEIGHT, WIDTH, CV_8UC3, Scalar::all(255.))?;

    let (left, right) = (MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
    let (top, bottom) = (MARGIN_TOP, HEIGHT - MARGIN_BOTTOM);

    centered_text(&mut canvas, title, WIDTH / 2, MARGIN_TOP / 2 + 5, 0.7)?;
    text(&mut canvas, y_label, Point::new(5, top - 15), 0.45)?;

    for (v, label) in axis.ticks() {
        let y = axis.to_pixel(v);
        line(&mut canvas, Point::new(left, y), Point::new(right, y), grey())?;
        line(&mut canvas, Point::new(left - 5, y), Point::new(left, y), black())?;
        text(&mut canvas, &label, Point::new(10, y + 5), 0.45)?;
    }
    line(&mut canvas, Point::new(left, top), Point::new(left, bottom), black())?;
    line(&mut canvas, Point::new(left, bottom), Point::new(right, bottom), black())?;

    let slot = (right - left) / stats.len() as i32;
    let half = (slot / 4).clamp(5, 60);
    for (i, (name, s)) in stats.iter().enumerate() {
        let x = left + slot * i as i32 + slot / 2;
        let (y_q1, y_q3) = (axis.to_pixel(s.q1), axis.to_pixel(s.q3));
        let (y_low, y_high) = (axis.to_pixel(s.whisker_low), axis.to_pixel(s.whisker_high));
        let y_median = axis.to_pixel(s.median);

        let rect = Rect::new(x - half, y_q3, half * 2, (y_q1 - y_q3).max(1));
        imgproc::rectangle(&mut canvas, rect, Scalar::new(230., 180., 120., 0.), -1, imgproc::LINE_8, 0)?;
        imgproc::rectangle(&mut canvas, rect, black(), 1, imgproc::LINE_8, 0)?;
        imgproc::line(
            &mut canvas,
            Point::new(x - half, y_median),
            Point::new(x + half, y_median),
            Scalar::new(0., 120., 255., 0.),
            2,
            imgproc::LINE_8,
            0,
        )?;
        line(&mut canvas, Point::new(x, y_q1), Point::new(x, y_low), black())?;
        line(&mut canvas, Point::new(x, y_q3), Point::new(x, y_high), black())?;
        line(&mut canvas, Point::new(x - half / 2, y_low), Point::new(x + half / 2, y_low), black())?;
        line(&mut canvas, Point::new(x - half / 2, y_high), Point::new(x + half / 2, y_high), black())?;

        centered_text(&mut canvas, name, x, bottom + 25, 0.55)?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if !imgcodecs::imwrite(&path.to_string_lossy(), &canvas, &Vector::new())? {
        bail!("无法写入图片: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_without_outliers() {
        let values = (1..=9).map(f64::from).collect::<Vec<_>>();
        let s = box_stats(&values).unwrap();
        assert_eq!(s, BoxStats { q1: 3., median: 5., q3: 7., whisker_low: 1., whisker_high: 9. });
    }

    #[test]
    fn outlier_excluded_from_whisker() {
        let mut values = (1..=9).map(f64::from).collect::<Vec<_>>();
        values.push(100.);
        let s = box_stats(&values).unwrap();
        assert_eq!(s.q1, 3.25);
        assert_eq!(s.median, 5.5);
        assert_eq!(s.q3, 7.75);
        assert_eq!(s.whisker_low, 1.);
        assert_eq!(s.whisker_high, 9.);
    }

    #[test]
    fn single_and_empty() {
        let s = box_stats(&[2.5]).unwrap();
        assert_eq!((s.q1, s.median, s.q3, s.whisker_low, s.whisker_high), (2.5, 2.5, 2.5, 2.5, 2.5));
        assert!(box_stats(&[]).is_none());
        assert!(box_stats(&[f64::NAN]).is_none());
    }

    #[test]
    fn log_axis_ticks_cover_decades() {
        let s = box_stats(&[0.002, 0.01, 0.5]).unwrap();
        let axis = Axis::new(Scale::Log, &[s]);
        let labels = axis.ticks().into_iter().map(|(_, l)| l).collect::<Vec<_>>();
        assert_eq!(labels, vec!["1e-3", "1e-2", "1e-1", "1e0"]);
        assert!(axis.to_pixel(0.5) < axis.to_pixel(0.01));
    }

    #[test]
    fn render_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");
        let groups = vec![
            ("relational".to_owned(), vec![0.001, 0.002, 0.004]),
            ("document".to_owned(), vec![0.0005, 0.0007]),
        ];
        render_boxplot(&path, "insert", "seconds", &groups, Scale::Log).unwrap();
        let image = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR).unwrap();
        assert_eq!((image.cols(), image.rows()), (WIDTH, HEIGHT));
    }

    #[test]
    fn render_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let groups = vec![("ledger".to_owned(), vec![])];
        assert!(render_boxplot(dir.path().join("x.png"), "read", "seconds", &groups, Scale::Linear).is_err());
    }
}
