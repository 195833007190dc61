use crate::errors::Result;
use crate::models::quote::{Quote, QUOTE_COLUMNS};
use crate::services::aggregator::{sector_breakdown, top_gainers, top_losers, SectorStats};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

pub const SHEET_ALL: &str = "All Stocks";
pub const SHEET_GAINERS: &str = "Top Gainers";
pub const SHEET_LOSERS: &str = "Top Losers";
pub const SHEET_SECTORS: &str = "Sector Analysis";

/// 涨跌榜行数
pub const MOVERS_LIMIT: usize = 20;

const SECTOR_COLUMNS: &[&str] = &["sector", "count", "mean_change_percent", "total_market_cap"];

/// 多工作表导出
pub fn write_workbook(path: &Path, quotes: &[Quote]) -> Result<()> {
    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet().set_name(SHEET_ALL)?;
    write_quotes(sheet, &header, quotes)?;

    let sheet = workbook.add_worksheet().set_name(SHEET_GAINERS)?;
    write_quotes(sheet, &header, &top_gainers(quotes, MOVERS_LIMIT))?;

    let sheet = workbook.add_worksheet().set_name(SHEET_LOSERS)?;
    write_quotes(sheet, &header, &top_losers(quotes, MOVERS_LIMIT))?;

    let sheet = workbook.add_worksheet().set_name(SHEET_SECTORS)?;
    write_sectors(sheet, &header, &sector_breakdown(quotes))?;

    workbook.save(path)?;
    Ok(())
}

fn write_header(sheet: &mut Worksheet, format: &Format, columns: &[&str]) -> Result<()> {
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, format)?;
    }
    Ok(())
}

fn write_text(sheet: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        sheet.write_string(row, col, value)?;
    }
    Ok(())
}

fn write_float(sheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<()> {
    if let Some(value) = value.filter(|v| v.is_finite()) {
        sheet.write_number(row, col, value)?;
    }
    Ok(())
}

fn write_quotes(sheet: &mut Worksheet, header: &Format, quotes: &[Quote]) -> Result<()> {
    write_header(sheet, header, QUOTE_COLUMNS)?;

    for (i, q) in quotes.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &q.symbol)?;
        write_text(sheet, row, 1, q.name.as_deref())?;
        write_float(sheet, row, 2, q.price)?;
        write_float(sheet, row, 3, q.previous_close)?;
        write_float(sheet, row, 4, q.change)?;
        write_float(sheet, row, 5, q.change_percent)?;
        write_float(sheet, row, 6, q.volume.map(|v| v as f64))?;
        write_float(sheet, row, 7, q.day_high)?;
        write_float(sheet, row, 8, q.day_low)?;
        write_float(sheet, row, 9, q.day_open)?;
        write_float(sheet, row, 10, q.market_cap)?;
        write_text(sheet, row, 11, q.sector.as_deref())?;
        write_text(sheet, row, 12, q.industry.as_deref())?;
        write_float(sheet, row, 13, q.week52_high)?;
        write_float(sheet, row, 14, q.week52_low)?;
        write_float(sheet, row, 15, q.pe_ratio)?;
        write_text(sheet, row, 16, q.venue.as_deref())?;
        sheet.write_string(row, 17, q.fetched_at.to_rfc3339())?;
    }
    Ok(())
}

fn write_sectors(sheet: &mut Worksheet, header: &Format, stats: &[SectorStats]) -> Result<()> {
    write_header(sheet, header, SECTOR_COLUMNS)?;

    for (i, s) in stats.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &s.sector)?;
        sheet.write_number(row, 1, s.count as f64)?;
        write_float(sheet, row, 2, s.mean_change_percent)?;
        sheet.write_number(row, 3, s.total_market_cap)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::symbol::Symbol;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::Utc;

    fn quote(code: &str, price: f64, prev: f64, sector: Option<&str>) -> Quote {
        let mut q = Quote::priced(&Symbol::parse(code).unwrap(), price, Some(prev), Utc::now()).unwrap();
        q.sector = sector.map(|s| s.to_string());
        q
    }

    #[test]
    fn workbook_has_four_named_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.xlsx");
        let quotes = vec![
            quote("AAA", 110.0, 100.0, Some("Energy")),
            quote("BBB", 90.0, 100.0, Some("Energy")),
            quote("CCC", 50.0, 50.0, None),
        ];

        write_workbook(&path, &quotes).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_ALL, SHEET_GAINERS, SHEET_LOSERS, SHEET_SECTORS]);

        let all = workbook.worksheet_range(SHEET_ALL).unwrap();
        assert_eq!(all.height(), 4);
        assert_eq!(all.get((0, 0)), Some(&Data::String("symbol".to_string())));
        assert_eq!(all.get((1, 2)), Some(&Data::Float(110.0)));

        let gainers = workbook.worksheet_range(SHEET_GAINERS).unwrap();
        assert_eq!(gainers.get((1, 0)), Some(&Data::String("AAA".to_string())));

        let sectors = workbook.worksheet_range(SHEET_SECTORS).unwrap();
        assert_eq!(sectors.get((1, 0)), Some(&Data::String("Energy".to_string())));
        assert_eq!(sectors.get((1, 1)), Some(&Data::Float(2.0)));
    }
}
