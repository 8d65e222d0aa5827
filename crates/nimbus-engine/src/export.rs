//! Tabular export of audit results

use nimbus_core::{CheckResult, NimbusError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column names of the exported table
pub const HEADER: [&str; 4] = ["Category", "Check", "Resource", "Notes"];

/// Options that change which rows are exported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Emit one row with an empty Resource cell for every result that has
    /// a note but no resources. Off by default, which keeps the table to
    /// findings only.
    pub include_degraded: bool,
}

/// One row of the exported table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Check")]
    pub check: String,
    /// Resource record rendered as compact JSON, empty for note-only rows
    #[serde(rename = "Resource")]
    pub resource: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl ExportRow {
    fn fields(&self) -> [&str; 4] {
        [&self.category, &self.check, &self.resource, &self.notes]
    }
}

/// File formats the exporter can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Flattens ordered check results into table rows.
///
/// Output depends only on the input and the options: the same results
/// always produce the same rows in the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportExporter {
    options: ExportOptions,
}

impl ReportExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ExportOptions {
        self.options
    }

    /// One row per resource, in result order then resource order
    pub fn rows(&self, results: &[CheckResult]) -> Result<Vec<ExportRow>> {
        let mut rows = Vec::new();

        for result in results {
            if result.resources.is_empty() {
                if self.options.include_degraded && result.is_degraded() {
                    rows.push(ExportRow {
                        category: result.category.clone(),
                        check: result.check_name.clone(),
                        resource: String::new(),
                        notes: result.notes.clone(),
                    });
                }
                continue;
            }

            for resource in &result.resources {
                rows.push(ExportRow {
                    category: result.category.clone(),
                    check: result.check_name.clone(),
                    resource: resource.to_cell()?,
                    notes: result.notes.clone(),
                });
            }
        }

        Ok(rows)
    }

    /// Write the header and all rows as CSV
    pub fn write_csv<W: Write>(&self, results: &[CheckResult], writer: W) -> Result<()> {
        let rows = self.rows(results)?;
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv.write_record(HEADER)?;
        for row in &rows {
            csv.write_record(row.fields())?;
        }
        csv.flush()?;
        Ok(())
    }

    /// CSV export as bytes
    pub fn to_csv_bytes(&self, results: &[CheckResult]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_csv(results, &mut buffer)?;
        Ok(buffer)
    }

    /// Rows as a JSON array
    pub fn to_json(&self, results: &[CheckResult], pretty: bool) -> Result<String> {
        let rows = self.rows(results)?;
        if pretty {
            serde_json::to_string_pretty(&rows).map_err(Into::into)
        } else {
            serde_json::to_string(&rows).map_err(Into::into)
        }
    }

    /// Write the export into `dir` under a timestamped name
    pub fn write_file(
        &self,
        results: &[CheckResult],
        dir: &Path,
        format: ExportFormat,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<PathBuf> {
        let path = dir.join(export_filename(now, format.extension()));
        let content = match format {
            ExportFormat::Csv => self.to_csv_bytes(results)?,
            ExportFormat::Json => self.to_json(results, true)?.into_bytes(),
        };

        std::fs::write(&path, content)
            .map_err(|e| NimbusError::Export(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// `audit-YYYYMMDDTHHMMSSZ.<extension>`
pub fn export_filename(now: chrono::DateTime<chrono::Utc>, extension: &str) -> String {
    format!("audit-{}.{}", now.format("%Y%m%dT%H%M%SZ"), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nimbus_core::{OwnerMemberRecord, ResourceRecord};

    fn owners(members: &[&str]) -> CheckResult {
        CheckResult::new(
            "IAM",
            "Service Accounts with roles/owner",
            members
                .iter()
                .map(|m| {
                    ResourceRecord::OwnerMember(OwnerMemberRecord {
                        member: m.to_string(),
                    })
                })
                .collect(),
        )
    }

    #[test]
    fn test_one_row_per_resource() {
        let rows = ReportExporter::default()
            .rows(&[owners(&["user:a@example.com", "user:b@example.com"])])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resource, r#"{"member":"user:a@example.com"}"#);
        assert_eq!(rows[1].check, "Service Accounts with roles/owner");
        assert!(rows[1].notes.is_empty());
    }

    #[test]
    fn test_note_only_results_dropped_by_default() {
        let results = vec![CheckResult::degraded("GKE", "GKE clusters", "GKE API not enabled")];
        assert!(ReportExporter::default().rows(&results).unwrap().is_empty());
    }

    #[test]
    fn test_include_degraded_emits_note_row() {
        let exporter = ReportExporter::new(ExportOptions {
            include_degraded: true,
        });
        let results = vec![
            CheckResult::degraded("GKE", "GKE clusters", "GKE API not enabled"),
            CheckResult::new("IAM", "Owners", Vec::new()),
        ];
        let rows = exporter.rows(&results).unwrap();
        assert_eq!(
            rows,
            vec![ExportRow {
                category: "GKE".to_string(),
                check: "GKE clusters".to_string(),
                resource: String::new(),
                notes: "GKE API not enabled".to_string(),
            }]
        );
    }

    #[test]
    fn test_partial_data_rows_carry_note() {
        let result = owners(&["user:a@example.com"]).with_notes("zone b unreachable");
        let rows = ReportExporter::default().rows(&[result]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notes, "zone b unreachable");
    }

    #[test]
    fn test_csv_has_header_even_when_empty() {
        let bytes = ReportExporter::default().to_csv_bytes(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "Category,Check,Resource,Notes\n");
    }

    #[test]
    fn test_csv_quotes_json_cells() {
        let bytes = ReportExporter::default()
            .to_csv_bytes(&[owners(&["user:a@example.com"])])
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[1],
            r#"IAM,Service Accounts with roles/owner,"{""member"":""user:a@example.com""}","#
        );
    }

    #[test]
    fn test_filename() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(export_filename(now, "csv"), "audit-20240309T070501Z.csv");
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = ReportExporter::default()
            .write_file(&[owners(&["user:a@example.com"])], dir.path(), ExportFormat::Json, now)
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "audit-20240102T030405Z.json");
        let rows: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rows[0]["Category"], "IAM");
    }
}
