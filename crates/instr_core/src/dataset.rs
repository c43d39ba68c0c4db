//! Monitor data returned by an instrument run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::events::EventData;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorMetadata {
    pub component: String,
    pub title: String,
    pub filename: String,
    pub xlabel: String,
    pub ylabel: String,
    /// Remaining header entries, verbatim.
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorValues {
    OneD {
        x: Vec<f64>,
        intensity: Vec<f64>,
        error: Vec<f64>,
        events: Vec<f64>,
    },
    /// Row-major, `ny` rows of `nx` values. `limits` is `[xmin, xmax, ymin, ymax]`.
    TwoD {
        nx: usize,
        ny: usize,
        limits: [f64; 4],
        intensity: Vec<f64>,
        error: Vec<f64>,
        events: Vec<f64>,
    },
    Events(EventData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorData {
    pub name: String,
    pub metadata: MonitorMetadata,
    pub values: MonitorValues,
}

impl MonitorData {
    pub fn total_intensity(&self) -> f64 {
        match &self.values {
            MonitorValues::OneD { intensity, .. } | MonitorValues::TwoD { intensity, .. } => {
                intensity.iter().sum()
            }
            MonitorValues::Events(events) => events.total_weight(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.values {
            MonitorValues::OneD { .. } => "1D",
            MonitorValues::TwoD { .. } => "2D",
            MonitorValues::Events(_) => "events",
        }
    }
}

/// Everything a run produced. Monitors keep the order they were loaded in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub folder: Option<PathBuf>,
    pub monitors: Vec<MonitorData>,
}

impl Dataset {
    pub fn new(monitors: Vec<MonitorData>) -> Self {
        Self {
            folder: None,
            monitors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.monitors.iter().map(|monitor| monitor.name.as_str())
    }

    /// Look up a monitor by name, falling back to its component name or file name.
    pub fn monitor(&self, name: &str) -> Option<&MonitorData> {
        self.monitors
            .iter()
            .find(|monitor| monitor.name == name)
            .or_else(|| {
                self.monitors.iter().find(|monitor| {
                    monitor.metadata.component == name || monitor.metadata.filename == name
                })
            })
    }

    pub fn event_monitors(&self) -> impl Iterator<Item = (&str, &EventData)> {
        self.monitors.iter().filter_map(|monitor| match &monitor.values {
            MonitorValues::Events(events) => Some((monitor.name.as_str(), events)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_d(name: &str, component: &str) -> MonitorData {
        MonitorData {
            name: name.to_string(),
            metadata: MonitorMetadata {
                component: component.to_string(),
                filename: format!("{name}.dat"),
                ..Default::default()
            },
            values: MonitorValues::OneD {
                x: vec![0.0, 1.0],
                intensity: vec![1.0, 2.0],
                error: vec![0.1, 0.2],
                events: vec![10.0, 20.0],
            },
        }
    }

    #[test]
    fn monitor_lookup_falls_back_to_component_and_filename() {
        let data = Dataset::new(vec![one_d("l_mon", "lambda_monitor"), one_d("psd", "psd")]);
        assert_eq!(data.monitor("l_mon").map(|m| m.name.as_str()), Some("l_mon"));
        assert_eq!(
            data.monitor("lambda_monitor").map(|m| m.name.as_str()),
            Some("l_mon")
        );
        assert_eq!(data.monitor("psd.dat").map(|m| m.name.as_str()), Some("psd"));
        assert!(data.monitor("missing").is_none());
        assert_eq!(data.monitors[0].total_intensity(), 3.0);
    }
}
