use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
        TableState,
    },
};

use crate::model::{Model, UIData};

pub const CMDLINE_HEIGH: usize = 2;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SCROLLBAR_WIDTH: u16 = 1;

const FILTER_PROMPT: &str = "/";

#[derive(Default)]
pub struct TableUI {
    state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.render_table(uidata, frame, table_area);
        Self::render_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            Self::render_popup(uidata, frame);
        }
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [table_area, scrollbar_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(SCROLLBAR_WIDTH)]).areas(area);

        let header = Row::new(
            uidata
                .headers
                .iter()
                .map(|h| Cell::from(h.clone()))
                .collect::<Vec<Cell>>(),
        )
        .style(Style::new().bold().fg(Color::White).bg(Color::Cyan));

        let rows = uidata.rows.iter().map(|r| {
            Row::new(r.iter().map(|c| Cell::from(c.clone())).collect::<Vec<Cell>>())
        });
        let widths = uidata
            .widths
            .iter()
            .map(|&w| Constraint::Length(w as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .column_highlight_style(Style::new().fg(Color::Yellow))
            .cell_highlight_style(Style::new().add_modifier(Modifier::BOLD | Modifier::REVERSED));

        if uidata.rows.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(uidata.selected_row));
        }
        self.state.select_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, table_area, &mut self.state);

        let mut scrollbar_state =
            ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }

    fn render_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [info_area, cmd_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

        let total = uidata
            .total
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string());
        let mut spans = vec![
            Span::from(format!(" {} ", uidata.name)).bold(),
            Span::from(format!(
                "| row {}/{} | loaded {}/{} | {} ",
                (uidata.abs_selected_row + 1).min(uidata.nrows),
                uidata.nrows,
                uidata.loaded,
                total,
                uidata.directive
            )),
        ];
        if !uidata.query.is_empty() {
            spans.push(Span::from(format!("| filter \"{}\" ", uidata.query)).yellow());
        }
        if let Some(e) = &uidata.source_error {
            spans.push(Span::from(format!("| Source unavailable: {e}")).red().bold());
        } else if uidata.exhausted {
            spans.push(Span::from("| No more data to load").green());
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::new().bg(Color::DarkGray)),
            info_area,
        );

        if uidata.active_cmdinput {
            let line = Line::from(vec![
                Span::from(FILTER_PROMPT).bold(),
                Span::from(uidata.cmdinput.input.clone()),
            ]);
            frame.render_widget(Paragraph::new(line), cmd_area);
            frame.set_cursor_position(Position::new(
                cmd_area.x + (FILTER_PROMPT.len() + uidata.cmdinput.curser_pos) as u16,
                cmd_area.y,
            ));
        } else {
            frame.render_widget(Paragraph::new(uidata.status_message.clone()), cmd_area);
        }
    }

    fn render_popup(uidata: &UIData, frame: &mut Frame) {
        let lines = uidata.popup_message.lines().count() as u16 + 2;
        let width = uidata
            .popup_message
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as u16
            + 4;
        let area = frame.area();
        let popup = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(lines) / 2,
            width: width.min(area.width),
            height: lines.min(area.height),
        };
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.clone())
                .block(Block::bordered().title(Line::from(" Help ".bold()).centered())),
            popup,
        );
    }
}
