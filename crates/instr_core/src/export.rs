use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::events::EventData;
use crate::histogram::Histogram;

/// Columns of the event Parquet file, in order.
pub const EVENT_COLUMNS: [&str; 8] = ["p", "x", "y", "z", "vx", "vy", "vz", "t"];

/// Write a histogram as CSV: one row per bin with its centre(s), intensity, error and event count.
///
/// 2D histograms are written row-major, `x` varying fastest.
pub fn write_histogram_csv<P: AsRef<Path>>(
    path: P,
    histogram: &Histogram,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);

    match histogram {
        Histogram::OneD(hist) => {
            wtr.write_record([hist.binning.axis.key(), "intensity", "error", "events"])?;
            for (i, center) in hist.binning.centers().into_iter().enumerate() {
                wtr.write_record([
                    center.to_string(),
                    hist.intensity[i].to_string(),
                    hist.error[i].to_string(),
                    hist.events[i].to_string(),
                ])?;
            }
        }
        Histogram::TwoD(hist) => {
            wtr.write_record([
                hist.x.axis.key(),
                hist.y.axis.key(),
                "intensity",
                "error",
                "events",
            ])?;
            let x_centers = hist.x.centers();
            for (iy, y) in hist.y.centers().into_iter().enumerate() {
                for (ix, x) in x_centers.iter().enumerate() {
                    let index = iy * hist.x.bins + ix;
                    wtr.write_record([
                        x.to_string(),
                        y.to_string(),
                        hist.intensity[index].to_string(),
                        hist.error[index].to_string(),
                        hist.events[index].to_string(),
                    ])?;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_events_parquet<P: AsRef<Path>>(
    path: P,
    events: &EventData,
) -> Result<(), Box<dyn Error>> {
    let mut columns: [Vec<f64>; 8] = Default::default();
    for column in columns.iter_mut() {
        column.reserve(events.len());
    }
    for ray in &events.rays {
        let values = [ray.p, ray.x, ray.y, ray.z, ray.vx, ray.vy, ray.vz, ray.t];
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    let schema = Schema::new(
        EVENT_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    );
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|column| Arc::new(Float64Array::from(column)) as ArrayRef)
        .collect();

    write_record_batch(path, schema, arrays)
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
