use crate::signal::{BinSummary, SubjectMatrix};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Bars centred on `x` with a symmetric error whisker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    pub name: String,
    /// `[x, height, error]`; a NaN error draws no whisker.
    pub bars: Vec<[f64; 3]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Bars(BarSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every point, bar and whisker.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut xs = Vec::new();
        let mut ys = vec![0.0];
        for series in &self.series {
            match series {
                Series::Line(line) => {
                    xs.extend(line.points.iter().map(|p| p[0]));
                    ys.extend(line.points.iter().map(|p| p[1]));
                }
                Series::Bars(bars) => {
                    for [x, height, err] in &bars.bars {
                        xs.push(x - 0.5);
                        xs.push(x + 0.5);
                        ys.push(*height);
                        if err.is_finite() {
                            ys.push(height + err);
                            ys.push(height - err);
                        }
                    }
                }
            }
        }
        let (x_min, x_max) = min_max(&xs).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = min_max(&ys).unwrap_or((0.0, 1.0));
        let y_max = if y_max > y_min { y_max } else { y_min + 1.0 };
        let x_max = if x_max > x_min { x_max } else { x_min + 1.0 };
        (x_min, x_max, y_min, y_max)
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

const PALETTE: [u32; 8] = [
    0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728, 0x9467BD, 0x8C564B, 0xE377C2, 0x7F7F7F,
];

/// Mean per bin as bars (1-based bin numbers) with SEM whiskers.
pub fn figure_from_summary(title: &str, summary: &BinSummary) -> Figure {
    let mut fig = Figure::new(Some(title.into())).with_labels("Bin", "Mean ± SEM");
    fig.add_series(Series::Bars(BarSeries {
        name: "mean".into(),
        bars: summary
            .iter()
            .enumerate()
            .map(|(i, (mean, sem))| [(i + 1) as f64, mean, sem])
            .collect(),
        style: Style {
            width: 0.6,
            color: Color(0x87CEEB),
        },
    }));
    fig
}

/// One line per subject across bins, labelled with the subject ids.
pub fn figure_from_subjects(title: &str, ids: &[String], matrix: &SubjectMatrix) -> Figure {
    let mut fig = Figure::new(Some(title.into())).with_labels("Bin", "Value");
    for (i, row) in matrix.rows().iter().enumerate() {
        let name = ids
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("subject-{}", i + 1));
        fig.add_series(Series::Line(LineSeries {
            name,
            points: row
                .iter()
                .enumerate()
                .map(|(bin, value)| [(bin + 1) as f64, *value])
                .collect(),
            style: Style {
                width: 2.0,
                color: Color(PALETTE[i % PALETTE.len()]),
            },
        }));
    }
    fig
}
