use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Number of records revealed per `advance()`.
pub const PAGE_SIZE: usize = 10;
/// Distance from the bottom of the content at which the next page is requested,
/// in the unit of a pixel-measured viewport.
pub const SCROLL_LOOKAHEAD: usize = 200;
/// The same distance for the terminal table, in rows. A row of a card list is
/// about 144 units tall, so 200 units is a little under one and a half rows.
pub const TABLE_LOOKAHEAD_ROWS: usize = 2;

pub const HELP_TEXT: &str = "\
 q          quit
 j/k ↑/↓    move selection
 h/l ←/→    select column
 PgUp/PgDn  move one page
 g/G        first/last row
 s/S        sort selected column ascending/descending
 x          clear sort
 /          filter by name (Enter keeps, Esc clears)
 m          load more records
 Enter      show record
 y          copy row to clipboard
 Esc        close view
 ?          this help";

#[derive(Debug)]
pub enum RVError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for RVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RVError::IoError(e) => write!(f, "io error: {e}"),
            RVError::PolarsError(e) => write!(f, "could not read table: {e}"),
            RVError::JsonError(e) => write!(f, "could not parse records: {e}"),
            RVError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            RVError::FileNotFound => write!(f, "file not found"),
            RVError::PermissionDenied => write!(f, "permission denied"),
            RVError::UnknownFileType => write!(f, "unknown file type"),
        }
    }
}

impl std::error::Error for RVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RVError::IoError(e) => Some(e),
            RVError::PolarsError(e) => Some(e),
            RVError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for RVError {
    fn from(err: Error) -> Self {
        RVError::IoError(err)
    }
}

impl From<PolarsError> for RVError {
    fn from(err: PolarsError) -> Self {
        RVError::PolarsError(err)
    }
}

impl From<serde_json::Error> for RVError {
    fn from(err: serde_json::Error) -> Self {
        RVError::JsonError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct RVConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    pub scroll_lookahead: usize,
    pub max_column_width: usize,
}

impl Default for RVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: PAGE_SIZE,
            scroll_lookahead: TABLE_LOOKAHEAD_ROWS,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Filter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    SortAscending,
    SortDescending,
    ClearSort,
    Filter,
    LoadMore,
    Enter,
    Exit,
    CopyRow,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
