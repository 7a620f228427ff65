use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use ethos_lib::{
    io::text::{read_event_times, read_intervals},
    metrics::{
        binned::{bin_sum, summarize},
        ratio::{count_summary, ratio_per_bin, CountSummary},
    },
    raster::rasterize,
    signal::{BinSummary, BinnedMatrix, Interval, SubjectMatrix},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Study manifest: observation window, binning and the ordered subject roster.
#[derive(Debug, Deserialize, Clone)]
pub struct StudySpec {
    pub name: String,
    pub window_length: usize,
    pub bin_width: usize,
    /// Divide occupancy bins by the subject count before summarizing.
    ///
    /// The reported mean and SEM are then the plain ones divided by n; this is
    /// not the per-bin sum of divided values some grooming sheets plot.
    #[serde(default)]
    pub normalize_by_subjects: bool,
    /// Report ratios as percentages.
    #[serde(default)]
    pub percent: bool,
    pub subjects: Vec<SubjectSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubjectSpec {
    pub id: String,
    #[serde(default)]
    pub intervals: Option<PathBuf>,
    #[serde(default)]
    pub category_events: Option<PathBuf>,
    #[serde(default)]
    pub total_events: Option<PathBuf>,
}

impl StudySpec {
    pub fn subject_ids(&self) -> Vec<String> {
        self.subjects.iter().map(|s| s.id.clone()).collect()
    }

    fn resolve_paths(&mut self, base: &Path) {
        for subject in &mut self.subjects {
            for source in [
                &mut subject.intervals,
                &mut subject.category_events,
                &mut subject.total_events,
            ] {
                if let Some(path) = source.as_mut() {
                    if path.is_relative() {
                        *path = base.join(&*path);
                    }
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.subjects.is_empty() {
            bail!("study '{}' lists no subjects", self.name);
        }
        let mut seen = HashSet::new();
        for subject in &self.subjects {
            if !seen.insert(subject.id.as_str()) {
                bail!("subject '{}' is listed twice", subject.id);
            }
        }
        Ok(())
    }
}

/// Read a TOML study manifest; relative data paths resolve against its directory.
pub fn read_study(path: &Path) -> Result<StudySpec> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read study {}", path.display()))?;
    let mut study: StudySpec =
        toml::from_str(&contents).with_context(|| format!("parsing study {}", path.display()))?;
    if let Some(base) = path.parent() {
        study.resolve_paths(base);
    }
    study.validate()?;
    Ok(study)
}

/// One subject's raw records, loaded in roster order.
#[derive(Debug, Clone, Default)]
pub struct SubjectData {
    pub id: String,
    pub intervals: Vec<Interval>,
    pub category_events: Vec<f64>,
    pub total_events: Vec<f64>,
}

/// Load every subject's sources. A source that is not configured is empty.
pub fn load_subjects(study: &StudySpec) -> Result<Vec<SubjectData>> {
    let mut out = Vec::with_capacity(study.subjects.len());
    for subject in &study.subjects {
        let intervals = match &subject.intervals {
            Some(path) => read_intervals(path)
                .with_context(|| format!("loading intervals for {}", subject.id))?,
            None => {
                warn!("{}: no interval source, using an empty record", subject.id);
                Vec::new()
            }
        };
        let category_events = load_events(
            &subject.id,
            "category_events",
            subject.category_events.as_deref(),
        )?;
        let total_events =
            load_events(&subject.id, "total_events", subject.total_events.as_deref())?;
        debug!(
            "{}: {} interval(s), {} category / {} total event(s)",
            subject.id,
            intervals.len(),
            category_events.len(),
            total_events.len()
        );
        out.push(SubjectData {
            id: subject.id.clone(),
            intervals,
            category_events,
            total_events,
        });
    }
    Ok(out)
}

fn load_events(id: &str, kind: &str, source: Option<&Path>) -> Result<Vec<f64>> {
    match source {
        Some(path) => {
            read_event_times(path).with_context(|| format!("loading {} for {}", kind, id))
        }
        None => {
            warn!("{}: '{}' not provided, using an empty series", id, kind);
            Ok(Vec::new())
        }
    }
}

/// Per-subject binned occupancy and its cross-subject summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyReport {
    pub binned: BinnedMatrix,
    pub summary: BinSummary,
}

/// Per-subject category ratios and their cross-subject summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioReport {
    pub percent: bool,
    pub ratios: SubjectMatrix,
    pub summary: BinSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    pub name: String,
    pub window_length: usize,
    pub bin_width: usize,
    /// Row order of every matrix in this report.
    pub subjects: Vec<String>,
    pub occupancy: OccupancyReport,
    pub ratio: RatioReport,
    pub event_totals: CountSummary,
}

pub fn occupancy_report(study: &StudySpec, data: &[SubjectData]) -> Result<OccupancyReport> {
    let mut vectors = Vec::with_capacity(data.len());
    for subject in data {
        let occupancy = rasterize(&subject.intervals, study.window_length)
            .with_context(|| format!("rasterizing {}", subject.id))?;
        debug!("{}: {:.3} s active", subject.id, occupancy.total());
        vectors.push(occupancy);
    }
    let matrix = SubjectMatrix::from_occupancy(vectors)?;
    let binned = bin_sum(&matrix, study.bin_width)?;
    if binned.dropped_cells > 0 {
        info!(
            "dropping {} trailing second(s) that do not fill a {} s bin",
            binned.dropped_cells, study.bin_width
        );
    }
    let normalize_by = study.normalize_by_subjects.then_some(data.len());
    let summary = summarize(&binned.values, normalize_by)?;
    Ok(OccupancyReport { binned, summary })
}

pub fn ratio_report(study: &StudySpec, data: &[SubjectData]) -> Result<RatioReport> {
    let mut rows = Vec::with_capacity(data.len());
    for subject in data {
        let ratios = ratio_per_bin(
            &subject.category_events,
            &subject.total_events,
            study.bin_width,
            study.window_length,
        )
        .with_context(|| format!("binning events for {}", subject.id))?;
        rows.push(ratios);
    }
    let ratios = SubjectMatrix::new(rows)?;
    let summary = summarize(&ratios, None)?;
    let (ratios, summary) = if study.percent {
        (ratios.scaled(100.0), summary.scaled(100.0))
    } else {
        (ratios, summary)
    };
    Ok(RatioReport {
        percent: study.percent,
        ratios,
        summary,
    })
}

/// Run the occupancy and ratio flows over a loaded roster.
pub fn run_study(study: &StudySpec, data: &[SubjectData]) -> Result<StudyReport> {
    info!(
        "study '{}': {} subject(s), {} s window, {} s bins",
        study.name,
        data.len(),
        study.window_length,
        study.bin_width
    );
    let occupancy = occupancy_report(study, data)?;
    let ratio = ratio_report(study, data)?;
    let totals: Vec<&[f64]> = data.iter().map(|s| s.total_events.as_slice()).collect();
    let event_totals = count_summary(&totals);
    Ok(StudyReport {
        name: study.name.clone(),
        window_length: study.window_length,
        bin_width: study.bin_width,
        subjects: data.iter().map(|s| s.id.clone()).collect(),
        occupancy,
        ratio,
        event_totals,
    })
}

/// Write one row per subject: its id followed by one column per bin.
pub fn write_binned_tsv(path: &Path, ids: &[String], matrix: &SubjectMatrix) -> Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
    let mut header = vec!["subject".to_string()];
    header.extend((1..=matrix.n_columns()).map(|bin| format!("bin_{}", bin)));
    writer.write_record(&header)?;
    for (id, row) in ids.iter().zip(matrix.rows()) {
        let mut record = vec![id.clone()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_tsv(path: &Path, summary: &BinSummary) -> Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
    writer.write_record(["bin", "mean", "sem"])?;
    for (i, (mean, sem)) in summary.iter().enumerate() {
        writer.write_record(&[(i + 1).to_string(), mean.to_string(), sem.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SummaryRow {
    pub bin: usize,
    pub mean: f64,
    pub sem: f64,
}

pub fn read_summary_tsv(path: &Path) -> Result<Vec<SummaryRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening summary {}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<SummaryRow>() {
        rows.push(row.with_context(|| format!("parsing summary in {}", path.display()))?);
    }
    Ok(rows)
}

pub fn write_report(path: &Path, report: &StudyReport) -> Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

pub fn read_report(path: &Path) -> Result<StudyReport> {
    let file =
        fs::File::open(path).with_context(|| format!("opening report {}", path.display()))?;
    let report = serde_json::from_reader::<_, StudyReport>(file)
        .with_context(|| format!("parsing report {}", path.display()))?;
    Ok(report)
}

/// Write the report JSON plus binned and summary tables into `dir`.
pub fn write_bundle(dir: &Path, report: &StudyReport) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    write_binned_tsv(
        &dir.join("occupancy_binned.tsv"),
        &report.subjects,
        &report.occupancy.binned.values,
    )?;
    write_summary_tsv(
        &dir.join("occupancy_summary.tsv"),
        &report.occupancy.summary,
    )?;
    write_binned_tsv(
        &dir.join("ratio_binned.tsv"),
        &report.subjects,
        &report.ratio.ratios,
    )?;
    write_summary_tsv(&dir.join("ratio_summary.tsv"), &report.ratio.summary)?;
    write_report(&dir.join("report.json"), report)?;
    info!("wrote study bundle to {}", dir.display());
    Ok(())
}
