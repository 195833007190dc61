use thiserror::Error;
use std::num::ParseIntError;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Excel parsing error: {0}")]
    ExcelError(#[from] calamine::Error),

    #[error("Spreadsheet writing error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Arrow error: {0}")]
    ArrowError(String),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Malformed payload: {0}")]
    PayloadError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Parse int error: {0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ScraperError {
    /// Whether a retry against the same endpoint may succeed.
    ///
    /// Transport failures, timeouts and non-2xx statuses are transient;
    /// everything that comes from looking at a body we did receive is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::RequestError(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_status()
            }
            ScraperError::HttpStatus { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;

impl From<arrow::error::ArrowError> for ScraperError {
    fn from(e: arrow::error::ArrowError) -> Self {
        ScraperError::ArrowError(e.to_string())
    }
}

// 用于从字符串创建错误
impl From<String> for ScraperError {
    fn from(s: String) -> Self {
        ScraperError::Unknown(s)
    }
}

impl From<&str> for ScraperError {
    fn from(s: &str) -> Self {
        ScraperError::Unknown(s.to_string())
    }
}
