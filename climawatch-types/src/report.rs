//! DailyReport - the document written once a day by the report service.
//!
//! The report service is an external collaborator; these types only mirror
//! the JSON it writes (`reports/informe_YYYY-MM-DD.json`). Every field is
//! optional so that a partially filled report still deserializes.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Name of the temperature entry in [`DailyReport::variables`].
pub const VAR_TEMPERATURE: &str = "temperatura";

/// Name of the relative humidity entry in [`DailyReport::variables`].
pub const VAR_HUMIDITY: &str = "humedad_relativa";

/// A daily weather report.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DailyReport {
    /// Report date as `YYYY-MM-DD`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fecha: Option<String>,

    /// One-phrase summary of the day (e.g. "Dia Soleado").
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub condicion_general: Option<String>,

    /// Short readable summary. May contain `<br>` line breaks.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub resumen: Option<String>,

    /// Unusual events detected during the day.
    pub anomalias: Vec<String>,

    /// Closing interpretation of the day's conditions.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub observaciones: Option<String>,

    /// Per-variable statistics, keyed by variable name.
    pub variables: BTreeMap<String, VariableSummary>,
}

/// Statistics for one variable over the report's day.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VariableSummary {
    /// Mean value.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub promedio: Option<f64>,

    /// Maximum value.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub max: Option<f64>,

    /// Minimum value.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub min: Option<f64>,

    /// Trend description ("en aumento", "en descenso", "estable").
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub tendencia: Option<String>,
}

impl DailyReport {
    /// Mean value of a variable, if the report carries one.
    pub fn average(&self, variable: &str) -> Option<f64> {
        self.variables.get(variable).and_then(|v| v.promedio)
    }

    /// Mean temperature.
    pub fn average_temperature(&self) -> Option<f64> {
        self.average(VAR_TEMPERATURE)
    }

    /// Mean relative humidity.
    pub fn average_humidity(&self) -> Option<f64> {
        self.average(VAR_HUMIDITY)
    }
}
