//! Loader for McCode text output folders.
//!
//! Each monitor writes one `.dat` file: `# key: value` header lines followed by
//! numeric rows. 2D files split their rows into `# Data`, `# Errors` and
//! `# Events` blocks of `ny` rows with `nx` values each. List monitors declare
//! their columns in the `variables` header.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::dataset::{Dataset, MonitorData, MonitorMetadata, MonitorValues};
use crate::events::{EventData, Ray};

const RAY_COLUMNS: [&str; 8] = ["p", "x", "y", "z", "vx", "vy", "vz", "t"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("'{}' line {line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("'{}': {message}", path.display())]
    Shape { path: PathBuf, message: String },
    #[error("'{}': unsupported data type '{kind}'", path.display())]
    UnsupportedType { path: PathBuf, kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Data,
    Errors,
    Events,
}

#[derive(Debug, Default)]
struct RawMonitor {
    headers: BTreeMap<String, String>,
    data: Vec<Vec<f64>>,
    errors: Vec<Vec<f64>>,
    events: Vec<Vec<f64>>,
    has_blocks: bool,
}

/// Load every monitor file of a run folder, ordered by file name.
pub fn load_folder(folder: &Path) -> Result<Dataset, LoadError> {
    let entries = fs::read_dir(folder).map_err(|source| LoadError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: folder.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().map(|ext| ext == "dat").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();

    let mut monitors = Vec::with_capacity(files.len());
    for path in files {
        match load_monitor_file(&path)? {
            Some(monitor) => monitors.push(monitor),
            None => debug!("skipping '{}': no data type header", path.display()),
        }
    }

    Ok(Dataset {
        folder: Some(folder.to_path_buf()),
        monitors,
    })
}

/// Load one monitor file. Files without a `type` header are not monitor output.
pub fn load_monitor_file(path: &Path) -> Result<Option<MonitorData>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_monitor(&text, path)
}

pub fn parse_monitor(text: &str, path: &Path) -> Result<Option<MonitorData>, LoadError> {
    let raw = read_raw(text, path)?;
    let Some(kind) = raw.headers.get("type").cloned() else {
        return Ok(None);
    };

    let values = if let Some(columns) = ray_columns(&raw.headers) {
        MonitorValues::Events(events_from_rows(&raw.data, &columns, path)?)
    } else if let Some(dims) = dimensions(&kind, "array_1d") {
        one_d_from_rows(&raw.data, dims, path)?
    } else if let Some(dims) = dimensions(&kind, "array_2d") {
        two_d_from_blocks(&raw, dims, path)?
    } else {
        return Err(LoadError::UnsupportedType {
            path: path.to_path_buf(),
            kind,
        });
    };

    Ok(Some(MonitorData {
        name: monitor_name(&raw.headers, path),
        metadata: metadata(raw.headers, path),
        values,
    }))
}

fn read_raw(text: &str, path: &Path) -> Result<RawMonitor, LoadError> {
    let mut raw = RawMonitor::default();
    let mut block = Block::Data;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if let Some(next) = block_marker(comment) {
                block = next;
                raw.has_blocks = true;
            } else if let Some((key, value)) = comment.split_once(':') {
                raw.headers
                    .entry(key.trim().to_string())
                    .or_insert_with(|| value.trim().to_string());
            }
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|token| token.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| LoadError::Format {
                path: path.to_path_buf(),
                line: index + 1,
                message: format!("bad number: {error}"),
            })?;
        match block {
            Block::Data => raw.data.push(row),
            Block::Errors => raw.errors.push(row),
            Block::Events => raw.events.push(row),
        }
    }

    Ok(raw)
}

fn block_marker(comment: &str) -> Option<Block> {
    if comment.starts_with("Data [") {
        Some(Block::Data)
    } else if comment.starts_with("Errors [") {
        Some(Block::Errors)
    } else if comment.starts_with("Events [") {
        Some(Block::Events)
    } else {
        None
    }
}

/// Dimensions of `array_1d(n)` or `array_2d(nx, ny)`.
fn dimensions(kind: &str, prefix: &str) -> Option<Vec<usize>> {
    let inner = kind.strip_prefix(prefix)?.trim().strip_prefix('(')?.strip_suffix(')')?;
    inner
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect()
}

fn ray_columns(headers: &BTreeMap<String, String>) -> Option<[usize; 8]> {
    let variables: Vec<&str> = headers.get("variables")?.split_whitespace().collect();
    let mut columns = [0; 8];
    for (slot, name) in columns.iter_mut().zip(RAY_COLUMNS) {
        *slot = variables.iter().position(|variable| *variable == name)?;
    }
    Some(columns)
}

fn events_from_rows(
    rows: &[Vec<f64>],
    columns: &[usize; 8],
    path: &Path,
) -> Result<EventData, LoadError> {
    let needed = columns.iter().max().map(|max| max + 1).unwrap_or(0);
    let mut rays = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if row.len() < needed {
            return Err(LoadError::Shape {
                path: path.to_path_buf(),
                message: format!(
                    "event row {} has {} columns, expected {needed}",
                    index + 1,
                    row.len()
                ),
            });
        }
        let [p, x, y, z, vx, vy, vz, t] = columns.map(|column| row[column]);
        rays.push(Ray {
            p,
            x,
            y,
            z,
            vx,
            vy,
            vz,
            t,
        });
    }
    Ok(EventData::new(rays))
}

fn one_d_from_rows(
    rows: &[Vec<f64>],
    dims: Vec<usize>,
    path: &Path,
) -> Result<MonitorValues, LoadError> {
    let expected = dims.first().copied().unwrap_or(0);
    if rows.len() != expected {
        return Err(LoadError::Shape {
            path: path.to_path_buf(),
            message: format!("expected {expected} rows, found {}", rows.len()),
        });
    }

    let mut x = Vec::with_capacity(expected);
    let mut intensity = Vec::with_capacity(expected);
    let mut error = Vec::with_capacity(expected);
    let mut events = Vec::with_capacity(expected);
    for (index, row) in rows.iter().enumerate() {
        if row.len() < 2 {
            return Err(LoadError::Shape {
                path: path.to_path_buf(),
                message: format!("row {} needs at least x and I columns", index + 1),
            });
        }
        x.push(row[0]);
        intensity.push(row[1]);
        error.push(row.get(2).copied().unwrap_or(0.0));
        events.push(row.get(3).copied().unwrap_or(0.0));
    }

    Ok(MonitorValues::OneD {
        x,
        intensity,
        error,
        events,
    })
}

fn two_d_from_blocks(
    raw: &RawMonitor,
    dims: Vec<usize>,
    path: &Path,
) -> Result<MonitorValues, LoadError> {
    let (nx, ny) = match dims.as_slice() {
        [nx, ny] => (*nx, *ny),
        _ => {
            return Err(LoadError::Shape {
                path: path.to_path_buf(),
                message: format!("2D type needs two dimensions, got {}", dims.len()),
            })
        }
    };

    let intensity = flatten_block(&raw.data, nx, ny, "Data", path)?;
    let error = if raw.errors.is_empty() {
        vec![0.0; nx * ny]
    } else {
        flatten_block(&raw.errors, nx, ny, "Errors", path)?
    };
    let events = if raw.events.is_empty() {
        vec![0.0; nx * ny]
    } else {
        flatten_block(&raw.events, nx, ny, "Events", path)?
    };

    let limits = match raw.headers.get("xylimits").map(|value| parse_limits(value)) {
        Some(Some(limits)) => limits,
        _ => {
            warn!(
                "'{}': missing or malformed xylimits, using bin indices",
                path.display()
            );
            [0.0, nx as f64, 0.0, ny as f64]
        }
    };
    if !raw.has_blocks {
        debug!("'{}': 2D data without block markers", path.display());
    }

    Ok(MonitorValues::TwoD {
        nx,
        ny,
        limits,
        intensity,
        error,
        events,
    })
}

fn flatten_block(
    rows: &[Vec<f64>],
    nx: usize,
    ny: usize,
    block: &str,
    path: &Path,
) -> Result<Vec<f64>, LoadError> {
    if rows.len() != ny || rows.iter().any(|row| row.len() != nx) {
        return Err(LoadError::Shape {
            path: path.to_path_buf(),
            message: format!("{block} block is not {ny} rows of {nx} values"),
        });
    }
    Ok(rows.iter().flatten().copied().collect())
}

fn parse_limits(value: &str) -> Option<[f64; 4]> {
    let numbers = value
        .split_whitespace()
        .map(|token| token.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    numbers.try_into().ok()
}

fn monitor_name(headers: &BTreeMap<String, String>, path: &Path) -> String {
    headers
        .get("component")
        .filter(|component| !component.is_empty())
        .cloned()
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

fn metadata(mut headers: BTreeMap<String, String>, path: &Path) -> MonitorMetadata {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    MonitorMetadata {
        component: headers.remove("component").unwrap_or_default(),
        title: headers.remove("title").unwrap_or_default(),
        filename: headers
            .remove("filename")
            .filter(|name| !name.is_empty())
            .unwrap_or(file_name),
        xlabel: headers.remove("xlabel").unwrap_or_default(),
        ylabel: headers.remove("ylabel").unwrap_or_default(),
        extra: headers,
    }
}
