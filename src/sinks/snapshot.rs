use crate::errors::{Result, ScraperError};
use crate::models::quote::Quote;
use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use arrow_array::{Array, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use chrono::{DateTime, Utc};
use log::info;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

const TEXT_COLUMNS: &[&str] = &["name", "sector", "industry", "venue"];

const FLOAT_COLUMNS: &[&str] = &[
    "price",
    "previous_close",
    "change",
    "change_percent",
    "day_high",
    "day_low",
    "day_open",
    "market_cap",
    "week52_high",
    "week52_low",
    "pe_ratio",
];

pub fn snapshot_schema() -> Schema {
    let mut fields = vec![Field::new("symbol", DataType::Utf8, false)];
    fields.extend(TEXT_COLUMNS.iter().map(|name| Field::new(*name, DataType::Utf8, true)));
    fields.extend(FLOAT_COLUMNS.iter().map(|name| Field::new(*name, DataType::Float64, true)));
    fields.push(Field::new("volume", DataType::Int64, true));
    fields.push(Field::new(
        "fetched_at",
        DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
        false,
    ));
    Schema::new(fields)
}

fn text_value<'a>(quote: &'a Quote, column: &str) -> Option<&'a str> {
    match column {
        "name" => quote.name.as_deref(),
        "sector" => quote.sector.as_deref(),
        "industry" => quote.industry.as_deref(),
        "venue" => quote.venue.as_deref(),
        _ => None,
    }
}

fn float_value(quote: &Quote, column: &str) -> Option<f64> {
    match column {
        "price" => quote.price,
        "previous_close" => quote.previous_close,
        "change" => quote.change,
        "change_percent" => quote.change_percent,
        "day_high" => quote.day_high,
        "day_low" => quote.day_low,
        "day_open" => quote.day_open,
        "market_cap" => quote.market_cap,
        "week52_high" => quote.week52_high,
        "week52_low" => quote.week52_low,
        "pe_ratio" => quote.pe_ratio,
        _ => None,
    }
}

fn float_slot<'a>(quote: &'a mut Quote, column: &str) -> Option<&'a mut Option<f64>> {
    match column {
        "price" => Some(&mut quote.price),
        "previous_close" => Some(&mut quote.previous_close),
        "change" => Some(&mut quote.change),
        "change_percent" => Some(&mut quote.change_percent),
        "day_high" => Some(&mut quote.day_high),
        "day_low" => Some(&mut quote.day_low),
        "day_open" => Some(&mut quote.day_open),
        "market_cap" => Some(&mut quote.market_cap),
        "week52_high" => Some(&mut quote.week52_high),
        "week52_low" => Some(&mut quote.week52_low),
        "pe_ratio" => Some(&mut quote.pe_ratio),
        _ => None,
    }
}

fn text_slot<'a>(quote: &'a mut Quote, column: &str) -> Option<&'a mut Option<String>> {
    match column {
        "name" => Some(&mut quote.name),
        "sector" => Some(&mut quote.sector),
        "industry" => Some(&mut quote.industry),
        "venue" => Some(&mut quote.venue),
        _ => None,
    }
}

// 将行情转换为Arrow记录批次
pub fn quotes_to_record_batch(quotes: &[Quote]) -> Result<RecordBatch> {
    let mut symbol_builder = StringBuilder::new();
    let mut volume_builder = Int64Builder::new();
    let mut fetched_builder = TimestampMillisecondBuilder::new().with_timezone("UTC");

    for quote in quotes {
        symbol_builder.append_value(&quote.symbol);
        volume_builder.append_option(quote.volume);
        fetched_builder.append_value(quote.fetched_at.timestamp_millis());
    }

    let mut columns: Vec<ArrayRef> = vec![Arc::new(symbol_builder.finish())];
    for column in TEXT_COLUMNS {
        let mut builder = StringBuilder::new();
        for quote in quotes {
            builder.append_option(text_value(quote, column));
        }
        columns.push(Arc::new(builder.finish()));
    }
    for column in FLOAT_COLUMNS {
        let mut builder = Float64Builder::new();
        for quote in quotes {
            builder.append_option(float_value(quote, column));
        }
        columns.push(Arc::new(builder.finish()));
    }
    columns.push(Arc::new(volume_builder.finish()));
    columns.push(Arc::new(fetched_builder.finish()));

    Ok(RecordBatch::try_new(Arc::new(snapshot_schema()), columns)?)
}

/// 保存行情快照到Arrow IPC文件
pub fn write_snapshot(path: &Path, quotes: &[Quote]) -> Result<()> {
    info!("Saving {} quotes to {}", quotes.len(), path.display());

    let batch = quotes_to_record_batch(quotes)?;
    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ScraperError::ArrowError(format!("Failed to downcast {} column", name)))
}

/// 从Arrow快照读取行情
pub fn read_snapshot(path: &Path) -> Result<Vec<Quote>> {
    let file = File::open(path)?;
    let reader = FileReader::try_new(file, None)?;
    let mut quotes = Vec::new();

    for batch in reader {
        let batch = batch?;
        let symbols = column::<StringArray>(&batch, "symbol")?;
        let volumes = column::<Int64Array>(&batch, "volume")?;
        let fetched = column::<TimestampMillisecondArray>(&batch, "fetched_at")?;

        let texts = TEXT_COLUMNS
            .iter()
            .map(|name| column::<StringArray>(&batch, name).map(|a| (*name, a)))
            .collect::<Result<Vec<_>>>()?;
        let floats = FLOAT_COLUMNS
            .iter()
            .map(|name| column::<Float64Array>(&batch, name).map(|a| (*name, a)))
            .collect::<Result<Vec<_>>>()?;

        for i in 0..batch.num_rows() {
            let fetched_at = DateTime::<Utc>::from_timestamp_millis(fetched.value(i))
                .ok_or_else(|| ScraperError::ArrowError(format!("fetched_at out of range in row {}", i)))?;

            let mut quote = Quote {
                symbol: symbols.value(i).to_string(),
                name: None,
                price: None,
                previous_close: None,
                change: None,
                change_percent: None,
                volume: (!volumes.is_null(i)).then(|| volumes.value(i)),
                day_high: None,
                day_low: None,
                day_open: None,
                market_cap: None,
                sector: None,
                industry: None,
                week52_high: None,
                week52_low: None,
                pe_ratio: None,
                venue: None,
                fetched_at,
            };

            for (name, array) in &texts {
                if let Some(slot) = text_slot(&mut quote, name) {
                    *slot = (!array.is_null(i)).then(|| array.value(i).to_string());
                }
            }
            for (name, array) in &floats {
                if let Some(slot) = float_slot(&mut quote, name) {
                    *slot = (!array.is_null(i)).then(|| array.value(i));
                }
            }

            quotes.push(quote);
        }
    }

    Ok(quotes)
}
