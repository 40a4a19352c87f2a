//! Daily report files written by the external report service.
//!
//! Reports live in one directory as `informe_YYYY-MM-DD.json`. Dates are
//! taken in a fixed UTC offset, the same one the report service uses.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, FixedOffset, NaiveDate};
use climawatch_types::{DailyReport, EpochMillis};
use tracing::{debug, warn};

use crate::notify::MISSING_TEXT;
use crate::AdapterError;

/// Reads daily reports from a directory.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
    offset: FixedOffset,
}

impl ReportStore {
    /// Create a store for `dir`, computing dates in `offset`.
    pub fn new(dir: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            dir: dir.into(),
            offset,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path of the report for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("informe_{}.json", date.format("%Y-%m-%d")))
    }

    /// The calendar date at `now_ms` in the store's offset.
    pub fn date_at(&self, now_ms: EpochMillis) -> NaiveDate {
        DateTime::from_timestamp_millis(now_ms)
            .unwrap_or_default()
            .with_timezone(&self.offset)
            .date_naive()
    }

    /// Load the report for `date`.
    pub fn load(&self, date: NaiveDate) -> Result<DailyReport, AdapterError> {
        let path = self.path_for(date);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AdapterError::NotFound(path.display().to_string())
            } else {
                AdapterError::Io(e)
            }
        })?;

        serde_json::from_str(&content).map_err(|source| AdapterError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load today's report.
    pub fn today(&self, now_ms: EpochMillis) -> Result<DailyReport, AdapterError> {
        self.load(self.date_at(now_ms))
    }

    /// Reports for the last `days` days, newest first.
    ///
    /// Missing or unreadable reports appear as `None`.
    pub fn recent(&self, now_ms: EpochMillis, days: u32) -> Vec<(NaiveDate, Option<DailyReport>)> {
        let today = self.date_at(now_ms);

        (0..days)
            .filter_map(|i| today.checked_sub_days(Days::new(i as u64)))
            .map(|date| match self.load(date) {
                Ok(report) => (date, Some(report)),
                Err(AdapterError::NotFound(_)) => {
                    debug!(%date, "no report for day");
                    (date, None)
                }
                Err(e) => {
                    warn!(%date, error = %e, "report unreadable");
                    (date, None)
                }
            })
            .collect()
    }
}

/// Render a report (or its absence) as readable text.
pub fn render_report(date: NaiveDate, report: Option<&DailyReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Informe del {}", date.format("%Y-%m-%d"));

    let Some(report) = report else {
        let _ = writeln!(out, "  No se encontró el informe para este día.");
        return out;
    };

    let text = |field: &Option<String>| -> String {
        field
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.replace("<br>", "\n    "))
            .unwrap_or_else(|| MISSING_TEXT.to_string())
    };

    let _ = writeln!(out, "  Condición General");
    let _ = writeln!(out, "    {}", text(&report.condicion_general));
    let _ = writeln!(out, "  Resumen del Día");
    let _ = writeln!(out, "    {}", text(&report.resumen));
    let _ = writeln!(out, "  Anomalías Detectadas");
    if report.anomalias.is_empty() {
        let _ = writeln!(out, "    - No se detectaron anomalías.");
    } else {
        for anomaly in &report.anomalias {
            let _ = writeln!(out, "    - {}", anomaly);
        }
    }
    let _ = writeln!(out, "  Observaciones");
    let _ = writeln!(out, "    {}", text(&report.observaciones));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gmt_minus_5() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    // 2025-06-02T03:00:00Z, which is still 2025-06-01 at UTC-05:00
    const NOW: i64 = 1_748_833_200_000;

    fn write_report(dir: &Path, date: &str, json: &str) {
        fs::write(dir.join(format!("informe_{}.json", date)), json).unwrap();
    }

    #[test]
    fn date_uses_offset() {
        let store = ReportStore::new("reports", gmt_minus_5());
        assert_eq!(
            store.date_at(NOW),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );

        let utc = ReportStore::new("reports", FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc.date_at(NOW), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
    }

    #[test]
    fn test_path_for() {
        let store = ReportStore::new("reports", gmt_minus_5());
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(
            store.path_for(date),
            PathBuf::from("reports/informe_2025-01-09.json")
        );
    }

    #[test]
    fn test_today_loads_report() {
        let dir = TempDir::new().unwrap();
        write_report(
            dir.path(),
            "2025-06-01",
            r#"{"resumen": "Despejado", "variables": {"temperatura": {"promedio": 19.0}}}"#,
        );

        let store = ReportStore::new(dir.path(), gmt_minus_5());
        let report = store.today(NOW).unwrap();
        assert_eq!(report.resumen.as_deref(), Some("Despejado"));
        assert_eq!(report.average_temperature(), Some(19.0));
    }

    #[test]
    fn missing_report_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new(dir.path(), gmt_minus_5());
        assert!(matches!(store.today(NOW), Err(AdapterError::NotFound(_))));
    }

    #[test]
    fn invalid_report_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), "2025-06-01", "{ not json");
        let store = ReportStore::new(dir.path(), gmt_minus_5());
        assert!(matches!(store.today(NOW), Err(AdapterError::Parse { .. })));
    }

    #[test]
    fn test_recent_lists_days_newest_first() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), "2025-06-01", r#"{"resumen": "hoy"}"#);
        write_report(dir.path(), "2025-05-30", r#"{"resumen": "antier"}"#);
        write_report(dir.path(), "2025-05-29", "broken");

        let store = ReportStore::new(dir.path(), gmt_minus_5());
        let recent = store.recent(NOW, 7);

        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0].0, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert!(recent[0].1.is_some());
        assert!(recent[1].1.is_none());
        assert_eq!(
            recent[2].1.as_ref().unwrap().resumen.as_deref(),
            Some("antier")
        );
        assert!(recent[3].1.is_none());
        assert_eq!(recent[6].0, NaiveDate::from_ymd_opt(2025, 5, 26).unwrap());
    }

    #[test]
    fn test_render_full_report() {
        let report: DailyReport = serde_json::from_str(
            r#"{
                "condicion_general": "Dia Soleado",
                "resumen": "Caluroso",
                "anomalias": ["Pico de luz a las 12:00"],
                "observaciones": "Sin lluvia"
            }"#,
        )
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let text = render_report(date, Some(&report));
        assert!(text.starts_with("Informe del 2025-06-01\n"));
        assert!(text.contains("    Dia Soleado\n"));
        assert!(text.contains("    - Pico de luz a las 12:00\n"));
        assert!(text.contains("    Sin lluvia\n"));
    }

    #[test]
    fn render_uses_placeholders() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let text = render_report(date, Some(&DailyReport::default()));
        assert_eq!(text.matches("No disponible.").count(), 3);
        assert!(text.contains("No se detectaron anomalías."));

        let missing = render_report(date, None);
        assert!(missing.contains("No se encontró el informe para este día."));
    }
}
