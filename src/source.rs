use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::RVError;
use crate::record::{FieldValue, Record, SortField, parse_rank};

/// The external document the record set is read from.
pub trait DataSource {
    fn name(&self) -> String;
    fn fetch(&mut self) -> Result<Vec<Record>, RVError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Record document on disk.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Expands `~` and environment variables in `path`.
    pub fn new(path: &str) -> Result<Self, RVError> {
        let expanded = shellexpand::full(path)
            .map_err(|e| RVError::LoadingFailed(format!("cannot expand {path}: {e}")))?;
        Ok(Self {
            path: PathBuf::from(expanded.as_ref()),
        })
    }

    fn get_file_info(path: &Path) -> Result<FileInfo, RVError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RVError::FileNotFound,
            ErrorKind::PermissionDenied => RVError::PermissionDenied,
            _ => RVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(RVError::LoadingFailed("Not a file!".into()));
        }

        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size: metadata.len(),
            file_type: detect_file_type(path)?,
        })
    }

    /// Checks that the document exists and has a known type.
    pub fn probe(&self) -> Result<FileInfo, RVError> {
        Self::get_file_info(&self.path)
    }
}

impl DataSource for FileSource {
    fn name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }

    fn fetch(&mut self) -> Result<Vec<Record>, RVError> {
        let file_info = Self::get_file_info(&self.path)?;
        let start_time = Instant::now();
        let records = match file_info.file_type {
            FileType::JSON => load_json(&file_info.path)?,
            FileType::CSV => records_from_frame(load_csv(&file_info.path)?)?,
            FileType::PARQUET => records_from_frame(load_parquet(&file_info.path)?)?,
            FileType::ARROW => records_from_frame(load_arrow(&file_info.path)?)?,
        };
        info!(
            "Read {} records ({} bytes, {:?}) in {}ms",
            records.len(),
            file_info.file_size,
            file_info.file_type,
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, RVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(RVError::UnknownFileType),
    }
}

fn load_json(path: &Path) -> Result<Vec<Record>, RVError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// One recognised column, converted to per-row values.
struct FieldColumn {
    field: SortField,
    values: Vec<Option<FieldValue>>,
}

fn load_column(df: &DataFrame, field: SortField, col_name: &str) -> Result<FieldColumn, PolarsError> {
    let numeric = is_numeric_type(df.column(col_name)?.dtype());
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;

    let values = series
        .into_iter()
        .map(|value| {
            value.map(|s| match s.parse::<f64>() {
                Ok(n) if numeric => FieldValue::Number(n),
                _ => FieldValue::Text(s.to_string()),
            })
        })
        .collect();
    Ok(FieldColumn { field, values })
}

// Each recognised column is converted in its own rayon task, then the
// columns are zipped back into records in source row order.
fn records_from_frame(frame: LazyFrame) -> Result<Vec<Record>, RVError> {
    let df = frame.collect()?;
    let names: Vec<(SortField, String)> = df
        .get_column_names()
        .iter()
        .filter_map(|name| {
            let field = SortField::from_column_name(name.as_str());
            if field.is_none() {
                debug!("Ignoring column \"{}\"", name);
            }
            field.map(|f| (f, name.to_string()))
        })
        .collect();

    let columns: Result<Vec<FieldColumn>, _> = names
        .par_iter()
        .map(|(field, name)| load_column(&df, *field, name))
        .collect();
    let columns = columns?;

    let mut records = vec![Record::default(); df.height()];
    for column in columns {
        trace!("Column {:?}: {} rows", column.field, column.values.len());
        for (record, value) in records.iter_mut().zip(column.values) {
            set_field(record, column.field, value);
        }
    }
    Ok(records)
}

fn set_field(record: &mut Record, field: SortField, value: Option<FieldValue>) {
    let text = |v: Option<FieldValue>| v.map(|v| v.to_string()).unwrap_or_default();
    match field {
        SortField::Rank => record.rank = value.and_then(parse_rank),
        SortField::Name => record.name = text(value),
        SortField::Location => record.location = text(value),
        SortField::Course => record.course = text(value),
        SortField::Fees => record.fees = value,
        SortField::Placement => record.placement = value,
        SortField::UserReviews => record.review_rating = value,
        SortField::Rating => record.rating = value,
    }
}
