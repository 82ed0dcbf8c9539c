use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::{CMDMode, HELP_TEXT, Message, RVConfig};
use crate::inputter::{InputResult, Inputter};
use crate::loader::WindowLoader;
use crate::record::{Record, SortField};
use crate::scroll::{ScrollSignal, ScrollTrigger};
use crate::sort::{Direction, SortDirective};
use crate::source::DataSource;
use crate::ui::{CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, TABLE_HEADER_HEIGHT};
use crate::view::ViewComposer;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Default)]
struct TableView {
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
}

impl TableView {
    fn selected(&self) -> usize {
        self.offset_row + self.curser_row
    }
}

#[derive(Debug, Default)]
struct RecordView {
    record_idx: usize, // Index into the composed rows
    curser_row: usize,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub statusline_width: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width,
            table_height: ui_height.saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT),
            statusline_width: ui_width,
            statusline_height: CMDLINE_HEIGH,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the ui needs to draw one frame.
#[derive(Clone, Debug)]
pub struct UIData {
    pub name: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>, // Visible rows only
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub directive: String,
    pub query: String,
    pub loaded: usize,
    pub total: Option<usize>,
    pub exhausted: bool,
    pub source_error: Option<String>,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            directive: SortDirective::Unsorted.to_string(),
            query: String::new(),
            loaded: 0,
            total: None,
            exhausted: false,
            source_error: None,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: RVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    loader: WindowLoader,
    composer: ViewComposer,
    trigger: ScrollTrigger,
    directive: SortDirective,
    query: String,
    rows: Arc<Vec<usize>>,
    table: TableView,
    record_view: RecordView,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    /// Opens a session on `source` and reveals the first page.
    pub fn init(
        config: &RVConfig,
        source: Box<dyn DataSource>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            loader: WindowLoader::new(source, config.page_size),
            composer: ViewComposer::new(),
            trigger: ScrollTrigger::new(config.scroll_lookahead),
            directive: SortDirective::Unsorted,
            query: String::new(),
            rows: Arc::new(Vec::new()),
            table: TableView::default(),
            record_view: RecordView::default(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        model.input.set_width(model.uilayout.statusline_width);
        model.request_more();
        model.settle_load();
        model.update_uidata();
        model
    }

    // -------------------- User controls ---------------------- //

    pub fn set_sort(&mut self, field: SortField, direction: Direction) {
        self.apply_directive(SortDirective::by(field, direction));
    }

    pub fn clear_sort(&mut self) {
        self.apply_directive(SortDirective::Unsorted);
    }

    fn apply_directive(&mut self, directive: SortDirective) {
        info!("Sort directive: {}", directive);
        self.directive = directive;
        self.refresh_view();
        self.select_row(0);
        self.set_status_message(format!("Sorted: {}", directive));
    }

    pub fn set_query(&mut self, query: &str) {
        if query == self.query {
            return;
        }
        debug!("Query: \"{}\"", query);
        self.query = query.to_string();
        self.refresh_view();
        self.select_row(0);
        let found = self.rows.len();
        self.set_status_message(format!("{} matches", found));
    }

    /// Asks for one more page. Returns `false` if a load is already pending
    /// or the source is exhausted.
    pub fn request_more(&mut self) -> bool {
        self.loader.request()
    }

    // -------------------- Read access ---------------------- //

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn loader(&self) -> &WindowLoader {
        &self.loader
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // -------------------- Update loop ---------------------- //

    pub fn update(&mut self, message: Option<Message>) {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection(1, true),
                    Message::MoveUp => self.move_selection(1, false),
                    Message::MovePageDown => self.move_selection(self.page_rows(), true),
                    Message::MovePageUp => self.move_selection(self.page_rows(), false),
                    Message::MoveBeginning => self.select_row(0),
                    Message::MoveEnd => self.select_row(self.rows.len().saturating_sub(1)),
                    Message::MoveLeft => self.move_column(false),
                    Message::MoveRight => self.move_column(true),
                    Message::SortAscending => self.sort_current_column(Direction::Ascending),
                    Message::SortDescending => self.sort_current_column(Direction::Descending),
                    Message::ClearSort => self.clear_sort(),
                    Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                    Message::LoadMore => self.manual_load(),
                    Message::Enter => self.enter(),
                    Message::Exit => self.exit(),
                    Message::CopyRow => self.copy_row(self.table.selected()),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::RawKey(_) => (),
                },
                Modus::RECORD => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_record_selection(true),
                    Message::MoveUp => self.move_record_selection(false),
                    Message::MoveLeft => self.previous_record(),
                    Message::MoveRight => self.next_record(),
                    Message::CopyRow => self.copy_row(self.record_view.record_idx),
                    Message::Help => self.show_help(),
                    Message::Exit => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.settle_load();
        self.check_scroll();
        self.update_uidata();
    }

    // Performs a load requested since the last update.
    fn settle_load(&mut self) {
        if self.loader.settle() {
            self.refresh_view();
            let state = self.loader.state();
            let total = self.loader.total().unwrap_or(state.loaded_count);
            self.set_status_message(format!("Loaded {} of {} records", state.loaded_count, total));
        }
        if self.loader.is_exhausted() {
            if let Some(e) = self.loader.last_error() {
                let message = format!("Source unavailable: {e}");
                self.set_status_message(message);
            }
        }
    }

    // The table offset, table height and view length stand in for the
    // scroll position, viewport and content height.
    fn check_scroll(&mut self) {
        if self.modus != Modus::TABLE {
            return;
        }
        let signal = ScrollSignal {
            offset: self.table.offset_row,
            viewport: self.uilayout.table_height,
            content: self.rows.len(),
        };
        if self.trigger.should_advance(signal, self.loader.is_exhausted()) && self.request_more() {
            trace!("Scroll requested next page");
        }
    }

    fn manual_load(&mut self) {
        if self.loader.is_exhausted() {
            self.set_status_message("No more data to load");
        } else if self.loader.is_pending() {
            trace!("Load already pending");
        } else {
            self.request_more();
        }
    }

    // The selected row and the open record follow their record to its new
    // position. If it is no longer in the view the selection is clamped.
    fn refresh_view(&mut self) {
        let selected = self.rows.get(self.table.selected()).copied();
        let shown = self.rows.get(self.record_view.record_idx).copied();
        self.rows = self.composer.compose(
            self.loader.store(),
            self.loader.window(),
            &self.directive,
            &self.query,
        );

        let rows = &self.rows;
        let position = |idx: Option<usize>| idx.and_then(|i| rows.iter().position(|&r| r == i));
        if let Some(row) = position(shown) {
            self.record_view.record_idx = row;
        }
        let row = position(selected).unwrap_or(self.table.selected());
        self.select_row(row);
    }

    // -------------------- Table handling ---------------------- //

    fn page_rows(&self) -> usize {
        self.uilayout.table_height.max(1)
    }

    fn select_row(&mut self, row: usize) {
        let height = self.page_rows();
        let row = row.min(self.rows.len().saturating_sub(1));
        let table = &mut self.table;
        if row < table.offset_row {
            table.offset_row = row;
        } else if row >= table.offset_row + height {
            table.offset_row = row + 1 - height;
        }
        table.curser_row = row - table.offset_row;
    }

    fn move_selection(&mut self, size: usize, down: bool) {
        let current = self.table.selected();
        let target = if down {
            current + size
        } else {
            current.saturating_sub(size)
        };
        self.select_row(target);
    }

    fn move_column(&mut self, right: bool) {
        let table = &mut self.table;
        if right {
            table.curser_column = (table.curser_column + 1).min(SortField::ALL.len() - 1);
        } else {
            table.curser_column = table.curser_column.saturating_sub(1);
        }
    }

    fn sort_current_column(&mut self, direction: Direction) {
        let field = SortField::ALL[self.table.curser_column];
        self.set_sort(field, direction);
    }

    fn calculate_column_width(&self, field: SortField, cells: &[Vec<String>], idx: usize) -> usize {
        let content = cells
            .iter()
            .map(|row| row[idx].chars().count())
            .max()
            .unwrap_or(0);
        let width = std::cmp::max(field.title().chars().count(), content) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, self.config.max_column_width)
    }

    // -------------------- Views ---------------------- //

    fn enter(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        self.record_view = RecordView {
            record_idx: self.table.selected(),
            curser_row: 0,
        };
        self.previous_modus = self.modus;
        self.modus = Modus::RECORD;
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {}
            Modus::RECORD => {
                // Return to the table at the record we were looking at
                let idx = self.record_view.record_idx;
                self.previous_modus = Modus::RECORD;
                self.modus = Modus::TABLE;
                self.select_row(idx);
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn move_record_selection(&mut self, down: bool) {
        let record = &mut self.record_view;
        if down {
            record.curser_row = (record.curser_row + 1).min(SortField::ALL.len() - 1);
        } else {
            record.curser_row = record.curser_row.saturating_sub(1);
        }
    }

    fn previous_record(&mut self) {
        let record = &mut self.record_view;
        record.record_idx = record.record_idx.saturating_sub(1);
    }

    fn next_record(&mut self) {
        let record = &mut self.record_view;
        if record.record_idx + 1 < self.rows.len() {
            record.record_idx += 1;
        }
    }

    // -------------------- Command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        self.input.clear();
        self.input.set(&self.query);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        match self.cmd_mode {
            Some(CMDMode::Filter) => {
                // The filter follows every keystroke
                let query = self.last_input.input.clone();
                self.set_query(&query);
            }
            None => debug!("Cmd mode is none!"),
        }
        if self.last_input.finished {
            trace!("Leaving command mode with \"{}\"", self.last_input.input);
            self.active_cmdinput = false;
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
            self.cmd_mode = None;
        }
    }

    // -------------------- Clipboard ---------------------- //

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn row_as_csv(record: &Record) -> String {
        SortField::ALL
            .iter()
            .map(|&f| {
                let value = record.value(f).map(|v| v.to_string()).unwrap_or_default();
                Self::wrap_cell_content(&value)
            })
            .collect::<Vec<String>>()
            .join(",")
    }

    fn copy_row(&mut self, row: usize) {
        let Some(&idx) = self.rows.get(row) else {
            return;
        };
        let content = Self::row_as_csv(&self.loader.window()[idx]);
        trace!("Row content: {}", content);

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    debug!("No clipboard available: {:?}", e);
                    self.set_status_message("Clipboard not available");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied row to clipboard"),
                Err(e) => debug!("Error copying to clipboard: {:?}", e),
            }
        }
    }

    // -------------------- UI data ---------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.input.set_width(self.uilayout.statusline_width);
        self.select_row(self.table.selected());
    }

    fn update_uidata(&mut self) {
        let window = self.loader.window();
        let state = self.loader.state();

        let in_record = self.modus == Modus::RECORD
            || (self.modus == Modus::POPUP && self.previous_modus == Modus::RECORD);
        let shown_record = self
            .rows
            .get(self.record_view.record_idx)
            .filter(|_| in_record)
            .map(|&i| &window[i]);

        let (name, headers, cells, nrows, selected_row, selected_column, abs_selected_row) =
            match shown_record {
                Some(record) => {
                    let cells: Vec<Vec<String>> = SortField::ALL
                        .iter()
                        .map(|&f| vec![f.title().to_string(), record.cell(f)])
                        .collect();
                    (
                        format!("R[{}]", self.loader.source_name()),
                        vec!["Field".to_string(), "Value".to_string()],
                        cells,
                        self.rows.len(),
                        self.record_view.curser_row,
                        1,
                        self.record_view.record_idx,
                    )
                }
                None => {
                    let begin = self.table.offset_row.min(self.rows.len());
                    let end = std::cmp::min(begin + self.uilayout.table_height, self.rows.len());
                    let cells: Vec<Vec<String>> = self.rows[begin..end]
                        .iter()
                        .map(|&i| SortField::ALL.iter().map(|&f| window[i].cell(f)).collect())
                        .collect();
                    let name = if self.query.is_empty() {
                        self.loader.source_name()
                    } else {
                        format!("F[{}]", self.loader.source_name())
                    };
                    (
                        name,
                        SortField::ALL.iter().map(|f| f.title().to_string()).collect(),
                        cells,
                        self.rows.len(),
                        self.table.curser_row,
                        self.table.curser_column,
                        self.table.selected(),
                    )
                }
            };

        let widths = if headers.len() == SortField::ALL.len() {
            SortField::ALL
                .iter()
                .enumerate()
                .map(|(idx, &f)| self.calculate_column_width(f, &cells, idx))
                .collect()
        } else {
            let header_width = SortField::ALL.iter().map(|f| f.title().len()).max().unwrap_or(0);
            vec![
                header_width + COLUMN_WIDTH_MARGIN,
                self.uilayout.table_width.saturating_sub(header_width + COLUMN_WIDTH_MARGIN),
            ]
        };

        self.uidata = UIData {
            name,
            headers,
            widths,
            rows: cells,
            nrows,
            selected_row,
            selected_column,
            abs_selected_row,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.active_cmdinput,
            directive: self.directive.to_string(),
            query: self.query.clone(),
            loaded: state.loaded_count,
            total: self.loader.total(),
            exhausted: state.exhausted,
            source_error: self.loader.last_error().map(str::to_string),
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }
}

#[cfg(test)]
impl Model {
    fn directive(&self) -> SortDirective {
        self.directive
    }

    fn query(&self) -> &str {
        &self.query
    }

    /// The composed view, resolved to records.
    fn visible_records(&self) -> Vec<&Record> {
        let window = self.loader.window();
        self.rows.iter().map(|&i| &window[i]).collect()
    }
}
