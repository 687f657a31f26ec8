use ratatui::{
    buffer::Buffer,
    crossterm::event::KeyEvent,
    layout::Rect,
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::Widget,
};
use tracing::trace;

use crate::fetcher::Dispatch;
use crate::grid::GridHandle;
use crate::inputter::{InputResult, Inputter};

pub const PREV_SYMBOL: &str = "⇧";
pub const NEXT_SYMBOL: &str = "⇩";

/// Prev/next controls and the search box of one grid.
///
/// Only focus and the text being typed live here, the paging state stays in
/// the grid.
#[derive(Default)]
pub struct Paginator {
    input: Inputter,
    focused: bool,
    last_input: InputResult,
}

impl Paginator {
    pub fn prev(&self, grid: &mut dyn GridHandle, fetch: &dyn Dispatch) {
        grid.scroll_prev(fetch);
    }

    pub fn next(&self, grid: &mut dyn GridHandle, fetch: &dyn Dispatch) {
        grid.scroll_next(fetch);
    }

    /// Opens the search box on the term the grid is filtered by.
    pub fn focus(&mut self, grid: &dyn GridHandle) {
        self.input.set(grid.search());
        self.input.resume();
        self.last_input = self.input.get();
        self.focused = true;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Feeds one released key to the search box and re-submits its content.
    ///
    /// Every key counts, cursor keys included; the grid ignores a term it
    /// already has.
    pub fn key_released(&mut self, key: KeyEvent, grid: &mut dyn GridHandle, fetch: &dyn Dispatch) {
        if !self.focused {
            return;
        }
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            trace!("Search box of {} lost focus", grid.name());
            self.focused = false;
        }
        grid.set_search(&self.last_input.input, fetch);
    }

    pub fn view<'a>(&'a self, summary: Option<&'a str>, grid: &dyn GridHandle) -> PaginatorBar<'a> {
        PaginatorBar {
            summary,
            input: &self.last_input,
            focused: self.focused,
            has_prev: grid.start() > 0,
            has_next: grid.start() + grid.page_size() < grid.count(),
        }
    }
}

pub struct PaginatorBar<'a> {
    summary: Option<&'a str>,
    input: &'a InputResult,
    focused: bool,
    has_prev: bool,
    has_next: bool,
}

fn arrow(symbol: &str, active: bool) -> Span<'static> {
    let span = Span::from(format!(" {symbol} "));
    if active { span.blue().bold() } else { span.dim() }
}

impl PaginatorBar<'_> {
    pub fn line(&self) -> Line<'_> {
        let mut spans = vec![
            Span::from(format!(" {} ", self.summary.unwrap_or(""))),
            arrow(PREV_SYMBOL, self.has_prev),
            arrow(NEXT_SYMBOL, self.has_next),
            Span::from("  search: "),
        ];
        if self.focused {
            let (before, after) = split_at_char(&self.input.input, self.input.curser_pos);
            let mut rest = after.chars();
            let cursor = rest.next().map(String::from).unwrap_or_else(|| " ".to_string());
            spans.push(Span::from(before.to_string()).yellow());
            spans.push(Span::styled(
                cursor,
                Style::default().add_modifier(Modifier::REVERSED),
            ));
            spans.push(Span::from(rest.as_str().to_string()).yellow());
        } else {
            spans.push(Span::from(self.input.input.clone()).yellow());
        }
        Line::from(spans)
    }
}

fn split_at_char(s: &str, pos: usize) -> (&str, &str) {
    let idx = s.char_indices().nth(pos).map(|(i, _)| i).unwrap_or(s.len());
    s.split_at(idx)
}

impl Widget for PaginatorBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.line().render(area, buf);
    }
}
