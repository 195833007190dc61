use crate::errors::Result;
use crate::models::quote::{Quote, QUOTE_COLUMNS};
use std::path::Path;

/// One row per quote; the header is always written, even for an empty table.
pub fn write_csv(path: &Path, quotes: &[Quote]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(QUOTE_COLUMNS)?;
    for quote in quotes {
        writer.serialize(quote)?;
    }
    writer.flush()?;
    Ok(())
}
