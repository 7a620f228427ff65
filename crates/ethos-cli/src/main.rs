use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ethos_lib::{
    io::{table as table_io, text as text_io},
    metrics::{
        binned::{row_means, summarize},
        ratio::ratio_per_bin,
        trials::trial_matrix,
    },
    plot::{figure_from_subjects, figure_from_summary, Figure, PlotBackend, Series},
    raster::rasterize,
    signal::{BinSummary, Interval, SubjectMatrix},
};
use ethos_study::{load_subjects, read_study, run_study, write_bundle, StudyReport};
use log::info;
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "ethos",
    version,
    about = "Ethos: behavioral interval rasterization and binned statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Metric {
    #[value(name = "occupancy")]
    Occupancy,
    #[value(name = "ratio")]
    Ratio,
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize `start stop` intervals read from stdin or --input into per-second occupancy
    Rasterize {
        #[arg(long, default_value_t = 600)]
        window_length: usize,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Fraction of category events among all events, per bin
    Ratio {
        #[arg(long)]
        category: PathBuf,
        #[arg(long)]
        total: PathBuf,
        #[arg(long, default_value_t = 150)]
        bin_width: usize,
        #[arg(long, default_value_t = 600)]
        window_length: usize,
    },
    /// Run the occupancy and ratio flows for every subject of a study manifest
    Study {
        #[arg(long)]
        manifest: PathBuf,
        /// Directory for the TSV/JSON bundle
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Subjects x trials matrix from a tabular export, with per-trial and per-subject means
    Trials {
        #[arg(long)]
        table: PathBuf,
        /// Subject ids in row order
        #[arg(long, value_delimiter = ',', required = true)]
        subjects: Vec<String>,
        #[arg(long, default_value_t = 5)]
        trials: usize,
        #[arg(long, default_value = "Subject ID")]
        subject_col: String,
        #[arg(long, default_value = "Duration(sec)")]
        value_col: String,
        #[arg(long, default_value_t = '\t')]
        delimiter: char,
    },
    /// Render a study metric to a PNG via plotters
    Plot {
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long, default_value = "occupancy")]
        metric: Metric,
        /// One line per subject instead of mean ± SEM bars
        #[arg(long)]
        per_subject: bool,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Rasterize {
            window_length,
            input,
        } => cmd_rasterize(window_length, input.as_deref())?,
        Commands::Ratio {
            category,
            total,
            bin_width,
            window_length,
        } => cmd_ratio(&category, &total, bin_width, window_length)?,
        Commands::Study { manifest, out } => cmd_study(&manifest, out.as_deref())?,
        Commands::Trials {
            table,
            subjects,
            trials,
            subject_col,
            value_col,
            delimiter,
        } => cmd_trials(
            &table,
            &subjects,
            trials,
            &subject_col,
            &value_col,
            delimiter,
        )?,
        Commands::Plot {
            manifest,
            metric,
            per_subject,
            out,
        } => cmd_plot(&manifest, metric, per_subject, &out)?,
    }
    Ok(())
}

fn read_intervals(input: Option<&Path>) -> Result<Vec<Interval>> {
    match input {
        Some(path) => text_io::read_intervals(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_intervals(&buf)
        }
    }
}

#[derive(Serialize)]
struct RasterOutput {
    window_length: usize,
    total: f64,
    cells: Vec<f64>,
}

fn cmd_rasterize(window_length: usize, input: Option<&Path>) -> Result<()> {
    let intervals = read_intervals(input)?;
    let occupancy = rasterize(&intervals, window_length)?;
    let out = RasterOutput {
        window_length,
        total: occupancy.total(),
        cells: occupancy.into_cells(),
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

#[derive(Serialize)]
struct RatioOutput {
    bin_width: usize,
    window_length: usize,
    ratios: Vec<f64>,
}

fn cmd_ratio(category: &Path, total: &Path, bin_width: usize, window_length: usize) -> Result<()> {
    let category_events = text_io::read_event_times(category)?;
    let total_events = text_io::read_event_times(total)?;
    let ratios = ratio_per_bin(&category_events, &total_events, bin_width, window_length)?;
    let out = RatioOutput {
        bin_width,
        window_length,
        ratios,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn load_report(manifest: &Path) -> Result<StudyReport> {
    let study = read_study(manifest)?;
    let data = load_subjects(&study)?;
    run_study(&study, &data)
}

fn cmd_study(manifest: &Path, out: Option<&Path>) -> Result<()> {
    let report = load_report(manifest)?;
    if let Some(dir) = out {
        write_bundle(dir, &report)?;
    }
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct TrialOutput {
    subjects: Vec<String>,
    trials: usize,
    matrix: SubjectMatrix,
    per_trial: BinSummary,
    per_subject_mean: Vec<f64>,
}

fn cmd_trials(
    table: &Path,
    subjects: &[String],
    trials: usize,
    subject_col: &str,
    value_col: &str,
    delimiter: char,
) -> Result<()> {
    let delimiter =
        u8::try_from(delimiter).map_err(|_| anyhow!("delimiter must be a single ASCII byte"))?;
    let records = table_io::read_trial_table(table, subject_col, value_col, delimiter)?;
    let matrix = trial_matrix(&records, subjects, trials)
        .with_context(|| format!("building trial matrix from {}", table.display()))?;
    let out = TrialOutput {
        subjects: subjects.to_vec(),
        trials,
        per_trial: summarize(&matrix, None)?,
        per_subject_mean: row_means(&matrix),
        matrix,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_plot(manifest: &Path, metric: Metric, per_subject: bool, out: &Path) -> Result<()> {
    let report = load_report(manifest)?;
    let (label, matrix, summary) = match metric {
        Metric::Occupancy => (
            "Occupancy (s)",
            &report.occupancy.binned.values,
            &report.occupancy.summary,
        ),
        Metric::Ratio if report.ratio.percent => {
            ("Ratio (%)", &report.ratio.ratios, &report.ratio.summary)
        }
        Metric::Ratio => ("Ratio", &report.ratio.ratios, &report.ratio.summary),
    };
    let title = format!("{} ({} s bins)", report.name, report.bin_width);
    let mut fig = if per_subject {
        figure_from_subjects(&title, &report.subjects, matrix)
    } else {
        figure_from_summary(&title, summary)
    };
    fig.y.label = Some(label.into());
    let mut backend = PngBackend { path: out };
    backend.draw(&fig)?;
    info!("wrote {}", out.display());
    Ok(())
}

struct PngBackend<'a> {
    path: &'a Path,
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        draw_plotters_figure(self.path, fig)
    }
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let (x_min, x_max, y_min, y_max) = fig.bounds();
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max * 1.05)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    let mut has_legend = false;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let color = RGBColor(r, g, b);
                chart
                    .draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        color.stroke_width(line.style.width as u32),
                    ))?
                    .label(line.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                has_legend = true;
            }
            Series::Bars(bars) => {
                let (r, g, b) = bars.style.color.rgb();
                let color = RGBColor(r, g, b);
                let half = f64::from(bars.style.width) / 2.0;
                chart.draw_series(bars.bars.iter().map(|bar| {
                    Rectangle::new([(bar[0] - half, 0.0), (bar[0] + half, bar[1])], color.filled())
                }))?;
                chart.draw_series(
                    bars.bars
                        .iter()
                        .filter(|bar| bar[2].is_finite())
                        .flat_map(|bar| {
                            let (x, top, bottom) = (bar[0], bar[1] + bar[2], bar[1] - bar[2]);
                            let cap = half / 3.0;
                            vec![
                                PathElement::new(vec![(x, bottom), (x, top)], BLACK),
                                PathElement::new(vec![(x - cap, top), (x + cap, top)], BLACK),
                                PathElement::new(
                                    vec![(x - cap, bottom), (x + cap, bottom)],
                                    BLACK,
                                ),
                            ]
                        }),
                )?;
            }
        }
    }
    if has_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}
