use std::time::Duration;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, StatefulWidget, Table, TableState, Tabs, Widget, Wrap},
};

use crate::domain::TVConfig;
use crate::model::Model;
use crate::render::{CellStyle, RenderedGrid};
use crate::views::ViewKind;

const STALE_STATUS: Duration = Duration::from_secs(5);

pub struct TVUI {
    highlight: Style,
}

impl TVUI {
    pub fn new(_cfg: &TVConfig) -> Self {
        Self {
            highlight: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [tabs_area, bar_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(view_tabs(model.view_kind()), tabs_area);
        frame.render_widget(model.paginator(), bar_area);
        let mut state = TableState::default().with_selected(Some(model.selected_row()));
        frame.render_stateful_widget(
            GridView {
                grid: model.rendered(),
                highlight: self.highlight,
            },
            table_area,
            &mut state,
        );

        let status_style = if model.status_age() > STALE_STATUS {
            Style::default().dim()
        } else {
            Style::default()
        };
        let status = Line::from(vec![
            Span::from(format!(" {} ", model.server())).blue(),
            Span::from(model.status_message()),
        ])
        .style(status_style);
        frame.render_widget(status, status_area);

        if let Some(message) = model.popup() {
            let title = if model.is_confirming() {
                Line::from(vec![" Confirm ".bold(), "<y>".blue().bold(), " / ".into(), "<Esc> ".blue().bold()])
            } else {
                Line::from(" tvgrid ".bold())
            };
            frame.render_widget(Popup { title, message }, frame.area());
        }
    }
}

fn view_tabs(current: ViewKind) -> Tabs<'static> {
    Tabs::new(
        ViewKind::ALL
            .iter()
            .enumerate()
            .map(|(idx, kind)| format!("{} {}", idx + 1, kind.label())),
    )
    .select(current.index())
    .highlight_style(Style::default().yellow().bold())
}

fn field_style(key: &str) -> Style {
    match key {
        "channel" => Style::default().fg(Color::Green),
        "scrambled" => Style::default().fg(Color::Yellow),
        "name" => Style::default().bold(),
        _ => Style::default(),
    }
}

struct GridView<'a> {
    grid: &'a RenderedGrid,
    highlight: Style,
}

impl GridView<'_> {
    fn widths(&self) -> Vec<Constraint> {
        let columns = self.grid.header.len();
        (0..columns)
            .map(|idx| {
                if idx + 1 == columns {
                    return Constraint::Fill(1);
                }
                let header = self.grid.header[idx].chars().count();
                let widest = self
                    .grid
                    .rows()
                    .iter()
                    .filter_map(|row| row.cells.get(idx))
                    .flat_map(|cell| cell.text.lines())
                    .map(|line| line.chars().count())
                    .max()
                    .unwrap_or(0);
                Constraint::Length(header.max(widest) as u16)
            })
            .collect()
    }
}

impl StatefulWidget for GridView<'_> {
    type State = TableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", self.grid.name)).bold().centered())
            .border_set(border::PLAIN);

        if let Some(err) = &self.grid.error {
            Paragraph::new(err.as_str().red())
                .wrap(Wrap { trim: false })
                .block(block)
                .render(area, buf);
            return;
        }

        let header = Row::new(self.grid.header.iter().enumerate().map(|(idx, label)| {
            let text = Text::from(label.as_str()).bold();
            if self.grid.numeric.get(idx).copied().unwrap_or(false) {
                Cell::from(text.alignment(Alignment::Right))
            } else {
                Cell::from(text)
            }
        }));

        let rows = self.grid.rows().iter().map(|row| {
            let cells = row.cells.iter().map(|cell| match &cell.style {
                CellStyle::Numeric => {
                    Cell::from(Text::from(cell.text.clone()).alignment(Alignment::Right))
                }
                CellStyle::Field(key) => Cell::from(Text::from(cell.text.clone())).style(field_style(key)),
            });
            Row::new(cells).height(row.height().max(1) as u16)
        });

        let table = Table::new(rows, self.widths())
            .header(header)
            .block(block)
            .column_spacing(2)
            .row_highlight_style(self.highlight);
        StatefulWidget::render(table, area, buf, state);
    }
}

struct Popup<'a> {
    title: Line<'a>,
    message: &'a str,
}

impl Widget for Popup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.message.lines().count() as u16 + 2;
        let [area] = Layout::vertical([Constraint::Length(lines)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::horizontal([Constraint::Percentage(60)])
            .flex(Flex::Center)
            .areas(area);
        Clear.render(area, buf);
        Paragraph::new(self.message)
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(self.title.centered())
                    .border_set(border::THICK),
            )
            .render(area, buf);
    }
}
