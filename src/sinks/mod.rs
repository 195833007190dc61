pub mod csv_file;
pub mod json_file;
pub mod snapshot;
pub mod spreadsheet;

use crate::errors::Result;
use crate::models::quote::{Quote, QUOTE_COLUMNS};
use crate::models::table::ResultTable;
use crate::services::aggregator::Summary;
use crate::util::{round2, run_stamp};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 输出文件名前缀
pub const OUTPUT_PREFIX: &str = "india_stocks";

/// Paths of every file one run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
    pub xlsx: Option<PathBuf>,
    pub arrow: PathBuf,
    pub summary: PathBuf,
}

/// 每列的非空/空值计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub non_null_count: usize,
    pub null_count: usize,
}

/// Contents of `{base}_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub total_records: usize,
    pub columns: Vec<String>,
    pub column_info: BTreeMap<String, ColumnInfo>,
    pub scraped_at: String,
    pub csv_size_mb: f64,
    pub statistics: Summary,
}

/// Writes a finalized table to every configured format under one directory.
pub struct OutputWriter {
    output_dir: PathBuf,
    write_xlsx: bool,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>, write_xlsx: bool) -> Self {
        Self { output_dir: output_dir.into(), write_xlsx }
    }

    pub fn base_name(scraped_at: DateTime<Utc>) -> String {
        format!("{}_{}", OUTPUT_PREFIX, run_stamp(scraped_at))
    }

    fn path_for(&self, base: &str, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", base, suffix))
    }

    pub fn write_all(&self, table: &ResultTable, summary: &Summary, scraped_at: DateTime<Utc>) -> Result<OutputFiles> {
        fs::create_dir_all(&self.output_dir)?;
        let base = Self::base_name(scraped_at);
        let quotes = table.quotes();

        let csv = self.path_for(&base, ".csv");
        csv_file::write_csv(&csv, quotes)?;

        let json = self.path_for(&base, ".json");
        json_file::write_json(&json, quotes)?;

        let xlsx = if self.write_xlsx {
            let path = self.path_for(&base, ".xlsx");
            spreadsheet::write_workbook(&path, quotes)?;
            Some(path)
        } else {
            None
        };

        let arrow = self.path_for(&base, ".arrow");
        snapshot::write_snapshot(&arrow, quotes)?;

        let summary_path = self.path_for(&base, "_summary.json");
        let summary_file = SummaryFile {
            total_records: quotes.len(),
            columns: QUOTE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            column_info: column_info(quotes)?,
            scraped_at: scraped_at.to_rfc3339(),
            csv_size_mb: file_size_mb(&csv)?,
            statistics: summary.clone(),
        };
        json_file::write_json(&summary_path, &summary_file)?;

        info!("已写入 {} 条记录到 {}", quotes.len(), self.output_dir.display());
        Ok(OutputFiles { csv, json, xlsx, arrow, summary: summary_path })
    }
}

/// Null coverage of every column in `QUOTE_COLUMNS`.
pub fn column_info(quotes: &[Quote]) -> Result<BTreeMap<String, ColumnInfo>> {
    let mut info: BTreeMap<String, ColumnInfo> =
        QUOTE_COLUMNS.iter().map(|c| (c.to_string(), ColumnInfo::default())).collect();

    for quote in quotes {
        let row = serde_json::to_value(quote)?;
        for (column, counts) in info.iter_mut() {
            match row.get(column) {
                Some(Value::Null) | None => counts.null_count += 1,
                Some(_) => counts.non_null_count += 1,
            }
        }
    }
    Ok(info)
}

fn file_size_mb(path: &Path) -> Result<f64> {
    let bytes = fs::metadata(path)?.len();
    Ok(round2(bytes as f64 / (1024.0 * 1024.0)))
}
