use crate::clustering::SimilarityMatrix;
use crate::config::files_handling;
use crate::errors::{Result, SensimError};
use crate::evaluation;
use ndarray::{Array1, Array2, Axis};
use ndarray_stats::QuantileExt;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::ops::Range;
use std::path::Path;

const SIZE: (u32, u32) = (800, 640);
const MARGIN: u32 = 15;
const FONT_STYLE: (&str, i32) = ("sans-serif", 20);

/// SAT answer letters, in answer order.
pub const ANSWER_LABELS: [&str; 5] = ["a", "b", "c", "d", "e"];

// cluster size -> number of clusters of that size
pub fn count_cluster_sizes(sizes: &[usize]) -> BTreeMap<usize, usize> {

    let mut counter = BTreeMap::new();
    for size in sizes {
        *counter.entry(*size).or_insert(0) += 1;
    }
    counter
}

// rows are true labels, columns predicted ones; each non-empty row sums to 1
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_labels: usize) -> Result<Array2<f64>> {

    let mut matrix = Array2::<f64>::zeros((n_labels, n_labels));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if *t >= n_labels || *p >= n_labels {
            return Err(SensimError::plot(format!("label out of range: ({}, {})", t, p)));
        }
        matrix[[*t, *p]] += 1.0;
    }

    let row_sums = matrix.sum_axis(Axis(1));
    for (mut row, sum) in matrix.axis_iter_mut(Axis(0)).zip(row_sums.iter()) {
        if *sum > 0.0 {
            row /= *sum;
        }
    }
    Ok(matrix)
}

// equal width bins over [min, max]; returns the range of the values and the bin counts
pub fn bin_counts(values: &Array1<f64>, n_bins: usize) -> Result<(Range<f64>, Vec<usize>)> {

    let min = *values.min().map_err(SensimError::plot)?;
    let max = *values.max().map_err(SensimError::plot)?;
    let n_bins = n_bins.max(1);

    // a single distinct value lands in the first bin
    let width = if max > min { (max - min) / n_bins as f64 } else { 1.0 };
    let mut counts = vec![0; n_bins];
    for v in values.iter() {
        let bin = (((v - min) / width).floor() as usize).min(n_bins - 1);
        counts[bin] += 1;
    }
    Ok((min..min + width * n_bins as f64, counts))
}

// matplotlib's "summer" colormap, from green (0) to yellow (1)
fn summer(value: f64) -> RGBColor {
    let v = value.clamp(0.0, 1.0);
    RGBColor((255.0 * v) as u8, (255.0 * (0.5 + 0.5 * v)) as u8, 102)
}

// (gold, predicted) answer indices of the answered questions of a predictions file
pub fn read_answered(file_path: &Path) -> Result<(Vec<usize>, Vec<usize>)> {

    let mut y_true = Vec::new();
    let mut y_pred = Vec::new();
    for (i, line) in files_handling::read_lines(file_path)?.enumerate() {

        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields = files_handling::split_fields(&line, 4, file_path, i + 1)?;
        let parse = |s: &str| s.trim().parse::<i64>().map_err(|e| SensimError::malformed(file_path, i + 1, e.to_string()));
        let predicted = parse(fields[2])?;
        let solution = parse(fields[3])?;
        if predicted < 0 || solution < 0 {
            continue;
        }
        y_pred.push(predicted as usize);
        y_true.push(solution as usize);
    }
    Ok((y_true, y_pred))
}

pub struct Plot {}

impl Plot {

    // bar chart of the cluster size distribution of a `.read` clustering file
    pub fn cluster_sizes(read_file: &Path, save_to: &Path) -> Result<BTreeMap<usize, usize>> {

        let sizes = evaluation::read_cluster_sizes(files_handling::read_lines(read_file)?, read_file)?;
        let counter = count_cluster_sizes(&sizes);
        Plot::draw_cluster_sizes(&counter, save_to).map_err(SensimError::plot)?;
        log::info!("cluster sizes plotted to {}", save_to.display());
        Ok(counter)
    }

    fn draw_cluster_sizes(counter: &BTreeMap<usize, usize>, save_to: &Path) -> std::result::Result<(), Box<dyn Error>> {

        let max_size = counter.keys().max().copied().unwrap_or(0);
        let max_count = counter.values().max().copied().unwrap_or(0);

        let root_area = BitMapBackend::new(save_to, SIZE).into_drawing_area();
        root_area.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root_area)
        .margin(MARGIN)
        .caption("Cluster sizes", FONT_STYLE)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0usize..max_size + 1).into_segmented(), 0usize..max_count + 1)?;

        chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("cluster size")
        .y_desc("number of clusters")
        .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(2)
            .data(counter.iter().map(|(size, count)| (*size, *count))),
        )?;

        root_area.present()?;
        Ok(())
    }

    // sparsity pattern of a `id \t id \t sim` similarity graph, row 1 on top
    pub fn sparse_matrix(matrix_file: &Path, save_to: &Path) -> Result<()> {

        let matrix: SimilarityMatrix = files_handling::read_input(matrix_file)?;
        Plot::draw_sparse_matrix(&matrix, save_to).map_err(SensimError::plot)?;
        log::info!("{} matrix entries plotted to {}", matrix.len(), save_to.display());
        Ok(())
    }

    fn draw_sparse_matrix(matrix: &SimilarityMatrix, save_to: &Path) -> std::result::Result<(), Box<dyn Error>> {

        let n = matrix.iter().map(|(id1, id2, _)| id1.max(id2)).max().unwrap_or(0) as f64 + 1.0;

        let root_area = BitMapBackend::new(save_to, (640, 640)).into_drawing_area();
        root_area.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root_area)
        .margin(MARGIN)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..n, n..0f64)?;

        chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()?;

        chart.draw_series(
            matrix.iter().map(|(id1, id2, _)| Circle::new((id2 as f64, id1 as f64), 1, BLACK.filled())),
        )?;

        root_area.present()?;
        Ok(())
    }

    // row-normalised confusion matrix of the answered SAT questions
    pub fn sat_confusion(prediction_file: &Path, save_to: &Path) -> Result<Array2<f64>> {

        let (y_true, y_pred) = read_answered(prediction_file)?;
        let matrix = confusion_matrix(&y_true, &y_pred, ANSWER_LABELS.len())?;
        Plot::draw_confusion(&matrix, &ANSWER_LABELS, save_to).map_err(SensimError::plot)?;
        log::info!("confusion matrix of {} answers plotted to {}", y_true.len(), save_to.display());
        Ok(matrix)
    }

    fn draw_confusion(matrix: &Array2<f64>, labels: &[&str], save_to: &Path) -> std::result::Result<(), Box<dyn Error>> {

        let n = labels.len() as i32;
        let label_of = |v: &i32| labels.get(*v as usize).map_or(String::new(), |l| l.to_string());

        let root_area = BitMapBackend::new(save_to, (640, 640)).into_drawing_area();
        root_area.fill(&WHITE)?;

        // rows go downwards as in a printed matrix
        let mut chart = ChartBuilder::on(&root_area)
        .margin(MARGIN)
        .caption("Confusion matrix", FONT_STYLE)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(0i32..n, n..0i32)?;

        chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(labels.len())
        .y_labels(labels.len())
        .x_label_formatter(&label_of)
        .y_label_formatter(&label_of)
        .x_desc("predicted label")
        .y_desc("true label")
        .draw()?;

        chart.draw_series(
            matrix.indexed_iter().map(|((row, col), value)| {
                let (x, y) = (col as i32, row as i32);
                Rectangle::new([(x, y), (x + 1, y + 1)], summer(*value).filled())
            }),
        )?;

        chart.draw_series(
            matrix.indexed_iter().map(|((row, col), value)| {
                Text::new(format!("{:.2}", value), (col as i32, row as i32), FONT_STYLE)
            }),
        )?;

        root_area.present()?;
        Ok(())
    }

    // histogram of a file holding one number per line
    pub fn histogram(values_file: &Path, n_bins: usize, save_to: &Path) -> Result<Vec<usize>> {

        let mut values = Vec::new();
        for (i, line) in files_handling::read_lines(values_file)?.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value = line.trim().parse::<f64>().map_err(|e| SensimError::malformed(values_file, i + 1, e.to_string()))?;
            values.push(value);
        }

        let (range, counts) = bin_counts(&Array1::from(values), n_bins)?;
        Plot::draw_histogram(&range, &counts, save_to).map_err(SensimError::plot)?;
        log::info!("histogram plotted to {}", save_to.display());
        Ok(counts)
    }

    fn draw_histogram(range: &Range<f64>, counts: &[usize], save_to: &Path) -> std::result::Result<(), Box<dyn Error>> {

        let width = (range.end - range.start) / counts.len() as f64;
        let max_count = counts.iter().max().copied().unwrap_or(0);

        let root_area = BitMapBackend::new(save_to, SIZE).into_drawing_area();
        root_area.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root_area)
        .margin(MARGIN)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(range.clone(), 0f64..max_count as f64 + 1.0)?;

        chart
        .configure_mesh()
        .disable_x_mesh()
        .draw()?;

        chart.draw_series(counts.iter().enumerate().map(|(i, count)| {
            let x0 = range.start + width * i as f64;
            Rectangle::new([(x0, 0.0), (x0 + width, *count as f64)], BLUE.filled())
        }))?;

        root_area.present()?;
        Ok(())
    }
}
