//! STREAMS dataset catalogue: downloadable variables per gauge.

use serde::Serialize;

use crate::error::{Error, Result};

/// Time column shared by the water-quality table.
pub const WATER_QUALITY_TIME_COLUMN: &str = "DateTime";

/// Water-quality labels and the columns (value + flag) they expand to.
pub const WATER_QUALITY_VARIABLES: &[(&str, &[&str])] = &[
    ("Water Temperature", &["WTemp_C", "Flag_WTemp_C"]),
    ("Specific Conductance", &["SpC_uScm", "Flag_SpC_uScm"]),
    ("Dissolved Oxygen", &["DO_mgL", "Flag_DO_mgL"]),
    ("pH", &["pH", "Flag_pH"]),
    ("Turbidity", &["Turb_FNU", "Flag_Turb_FNU"]),
    ("NO3", &["NO3_mgNL", "Flag_NO3_mgNL"]),
    ("fDOM", &["fDOM_QSU", "Flag_fDOM_QSU", "fDOM_RFU", "Flag_fDOM_RFU"]),
    ("Chla", &["Chla_ugL", "Flag_Chla_ugL"]),
    ("PC", &["PC_RFU", "Flag_PC_RFU"]),
];

/// Non water-quality datasets and the column their date filter applies to.
pub const OTHER_DATASETS: &[(&str, &str)] = &[
    ("Streamflow", "DateTime"),
    ("Land Use/Cover", "year"),
    ("Grab Samples", "DateTime"),
    ("Anthropogenic", "year"),
    ("Historical Meteorology", "time"),
];

/// Columns for the selected water-quality labels, time column first.
pub fn water_quality_columns<S: AsRef<str>>(labels: &[S]) -> Result<Vec<&'static str>> {
    let mut columns = vec![WATER_QUALITY_TIME_COLUMN];
    for label in labels {
        let label = label.as_ref();
        let (_, cols) = WATER_QUALITY_VARIABLES
            .iter()
            .find(|(name, _)| *name == label)
            .ok_or_else(|| Error::UnknownDataset(label.to_string()))?;
        columns.extend_from_slice(cols);
    }
    Ok(columns)
}

/// Date column of a non water-quality dataset.
pub fn time_column(dataset: &str) -> Result<&'static str> {
    OTHER_DATASETS
        .iter()
        .find(|(name, _)| *name == dataset)
        .map(|(_, col)| *col)
        .ok_or_else(|| Error::UnknownDataset(dataset.to_string()))
}

/// File stem for one gauge's extract of one dataset.
///
/// The agency prefix of the gauge id (`USGS-`) is dropped; the label is
/// lowercased with `/` and spaces turned into `-`.
pub fn output_filename(gauge: &str, label: &str) -> String {
    let label = label.replace(['/', ' '], "-").to_lowercase();
    let gauge = match gauge.split_once('-') {
        Some((_, rest)) => rest,
        None => gauge,
    };
    format!("{gauge}-{label}")
}

/// Summary of what can be requested, as served to the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetOptions {
    pub water_quality_variables: Vec<WaterQualityOption>,
    pub other_datasets: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaterQualityOption {
    pub label: &'static str,
    pub columns: Vec<&'static str>,
}

impl DatasetOptions {
    pub fn catalogue() -> Self {
        Self {
            water_quality_variables: WATER_QUALITY_VARIABLES
                .iter()
                .map(|&(label, cols)| WaterQualityOption { label, columns: cols.to_vec() })
                .collect(),
            other_datasets: OTHER_DATASETS.iter().map(|(name, _)| *name).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_quality_columns() {
        let cols = water_quality_columns(&["pH", "fDOM"]).unwrap();
        assert_eq!(
            cols,
            vec!["DateTime", "pH", "Flag_pH", "fDOM_QSU", "Flag_fDOM_QSU", "fDOM_RFU", "Flag_fDOM_RFU"]
        );
        assert_eq!(water_quality_columns::<&str>(&[]).unwrap(), vec!["DateTime"]);
        assert!(matches!(
            water_quality_columns(&["Salinity"]),
            Err(Error::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_time_columns() {
        assert_eq!(time_column("Historical Meteorology").unwrap(), "time");
        assert_eq!(time_column("Land Use/Cover").unwrap(), "year");
        assert!(time_column("water_quality").is_err());
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename("USGS-01540500", "Land Use/Cover"),
            "01540500-land-use-cover"
        );
        assert_eq!(output_filename("X-01-02", "water_quality"), "01-02-water_quality");
        assert_eq!(output_filename("plain", "Streamflow"), "plain-streamflow");
    }

    #[test]
    fn test_catalogue_serializes() {
        let v = serde_json::to_value(DatasetOptions::catalogue()).unwrap();
        assert_eq!(v["water_quality_variables"].as_array().unwrap().len(), 9);
        assert_eq!(v["other_datasets"][0], "Streamflow");
    }
}
