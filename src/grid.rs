use std::num::NonZeroUsize;
use std::rc::Rc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::columns::Columns;
use crate::domain::{Command, TVError};
use crate::fetcher::{self, Dispatch, Outcome, Request, Sequencer, Target, Ticket};
use crate::record::Record;
use crate::render::{self, RenderedGrid};

// Everything encodeURIComponent leaves alone stays readable in the logs.
const SEARCH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub type Activation<R> = Rc<dyn Fn(&R) -> Command>;

/// Pulls the row values out of a payload that is not a `{data, count}` page.
pub type Unpack = Rc<dyn Fn(&Value) -> Vec<Value>>;

// Rows stay raw here so one unusable record cannot take its page down.
#[derive(Default, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    start: usize,
    #[serde(default)]
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completed {
    Applied,
    Stale,
}

/// Paging state of one server side table.
pub struct Grid<R: Record> {
    name: String,
    url: String,
    page_size: usize,
    start: usize,
    search: String,
    count: usize,
    rows: Vec<R>,
    span: (usize, usize), // start/end of the last page as reported by the server
    error: Option<String>,
    columns: Columns<R>,
    activation: Option<Activation<R>>,
    update: Option<Activation<R>>,
    unpack: Option<Unpack>,
    sequencer: Sequencer,
}

impl<R: Record> Grid<R> {
    pub fn configure(name: &str, url: &str, page_size: usize) -> Result<Self, TVError> {
        let page_size = NonZeroUsize::new(page_size).ok_or(TVError::InvalidPageSize)?;
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            page_size: page_size.get(),
            start: 0,
            search: String::new(),
            count: 0,
            rows: Vec::new(),
            span: (0, 0),
            error: None,
            columns: Columns::default(),
            activation: None,
            update: None,
            unpack: None,
            sequencer: Sequencer::default(),
        })
    }

    pub fn set_columns(&mut self, columns: Columns<R>) {
        self.columns = columns;
    }

    pub fn set_row_activation(&mut self, callback: impl Fn(&R) -> Command + 'static) {
        self.activation = Some(Rc::new(callback));
    }

    /// Secondary row action, bound to the update key.
    pub fn set_row_update(&mut self, callback: impl Fn(&R) -> Command + 'static) {
        self.update = Some(Rc::new(callback));
    }

    /// For endpoints that answer with something other than a page. The rows
    /// come from `unpack` and the result is shown as an unpaged list.
    pub fn set_unpack(&mut self, unpack: impl Fn(&Value) -> Vec<Value> + 'static) {
        self.unpack = Some(Rc::new(unpack));
    }

    pub fn columns(&self) -> &Columns<R> {
        &self.columns
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn activation(&self) -> Option<&Activation<R>> {
        self.activation.as_ref()
    }

    pub fn update(&self) -> Option<&Activation<R>> {
        self.update.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn span(&self) -> (usize, usize) {
        self.span
    }

    pub fn request_url(&self) -> String {
        let separator = match self.url.split_once('?') {
            Some((_, query)) if !query.is_empty() => "&",
            Some(_) => "",
            None => "?",
        };
        format!(
            "{}{separator}page_size={}&start={}&search={}",
            self.url,
            self.page_size,
            self.start,
            utf8_percent_encode(&self.search, SEARCH)
        )
    }

    fn apply_page(&mut self, payload: &Value) {
        let page = match &self.unpack {
            Some(unpack) => Page {
                data: unpack(payload),
                ..Page::default()
            },
            None => Page::deserialize(payload).unwrap_or_else(|e| {
                warn!("Grid {}: unusable page payload, showing no rows: {e}", self.name);
                Page::default()
            }),
        };
        let received = page.data.len();
        let rows: Vec<R> = page
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| {
                R::deserialize(value)
                    .map_err(|e| warn!("Grid {}: skipping row {idx}: {e}", self.name))
                    .ok()
            })
            .collect();
        debug!(
            "Grid {}: {}/{received} rows, {} - {} / {}",
            self.name,
            rows.len(),
            page.start,
            page.end,
            page.count
        );
        self.rows = rows;
        self.count = page.count;
        self.span = (page.start, page.end);
        self.error = None;
    }
}

/// The operations a host drives a grid with, independent of its row type.
pub trait GridHandle {
    fn name(&self) -> &str;
    fn start(&self) -> usize;
    fn page_size(&self) -> usize;
    fn count(&self) -> usize;
    fn search(&self) -> &str;
    fn load(&mut self, fetch: &dyn Dispatch);
    fn scroll_prev(&mut self, fetch: &dyn Dispatch);
    fn scroll_next(&mut self, fetch: &dyn Dispatch);
    fn set_search(&mut self, term: &str, fetch: &dyn Dispatch);
    fn complete(&mut self, ticket: &Ticket, outcome: &Outcome) -> Completed;
    fn render(&self) -> RenderedGrid;
}

impl<R: Record> GridHandle for Grid<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> usize {
        self.start
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn count(&self) -> usize {
        self.count
    }

    fn search(&self) -> &str {
        &self.search
    }

    fn load(&mut self, fetch: &dyn Dispatch) {
        let ticket = self.sequencer.issue();
        let url = self.request_url();
        trace!("Grid {} load #{}: {url}", self.name, ticket.seq());
        fetch.dispatch(Request {
            target: Target::Grid(self.name.clone()),
            ticket,
            url,
        });
    }

    fn scroll_prev(&mut self, fetch: &dyn Dispatch) {
        self.start = self.start.saturating_sub(self.page_size);
        self.load(fetch);
    }

    fn scroll_next(&mut self, fetch: &dyn Dispatch) {
        if self.start + self.page_size < self.count {
            self.start += self.page_size;
        }
        self.load(fetch);
    }

    fn set_search(&mut self, term: &str, fetch: &dyn Dispatch) {
        if term == self.search {
            return;
        }
        trace!("Grid {} search {:?} -> {:?}", self.name, self.search, term);
        self.search = term.to_string();
        self.start = 0;
        self.load(fetch);
    }

    fn complete(&mut self, ticket: &Ticket, outcome: &Outcome) -> Completed {
        if !self.sequencer.is_current(ticket) {
            debug!(
                "Grid {}: dropping stale response #{} (latest #{})",
                self.name,
                ticket.seq(),
                self.sequencer.latest()
            );
            return Completed::Stale;
        }
        fetcher::complete(outcome, |payload, err| {
            match payload {
                Some(payload) => self.apply_page(payload),
                None => self.error = Some(err.unwrap_or_default().to_string()),
            }
            true
        });
        Completed::Applied
    }

    fn render(&self) -> RenderedGrid {
        render::render(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::columns::Column;
    use crate::fetcher::{FailureKind, FetchFailure};
    use crate::record::Row;
    use proptest::prelude::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Default)]
    pub(crate) struct RecordingDispatch {
        pub requests: RefCell<Vec<Request>>,
    }

    impl RecordingDispatch {
        pub fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|r| r.url.clone()).collect()
        }

        pub fn last(&self) -> Request {
            self.requests.borrow().last().cloned().expect("no request issued")
        }
    }

    impl Dispatch for RecordingDispatch {
        fn dispatch(&self, request: Request) {
            self.requests.borrow_mut().push(request);
        }
    }

    fn channels() -> Grid<Row> {
        Grid::configure("channels", "tvd?c=tvdaemon&a=get_channels", 20).unwrap()
    }

    /// Grid whose last load answered with `count` rows in total.
    fn loaded(count: usize, page_size: usize, fetch: &RecordingDispatch) -> Grid<Row> {
        let mut grid: Grid<Row> = Grid::configure("t", "tvd", page_size).unwrap();
        grid.load(fetch);
        let ticket = fetch.last().ticket;
        grid.complete(
            &ticket,
            &Ok(json!({"data": [], "count": count, "start": 0, "end": 0})),
        );
        grid
    }

    #[test]
    fn configure_starts_empty() {
        let grid = channels();
        assert_eq!(grid.start(), 0);
        assert_eq!(grid.search(), "");
        assert_eq!(grid.count(), 0);
        assert!(grid.rows().is_empty());
        assert_eq!(grid.page_size(), 20);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(matches!(
            Grid::<Row>::configure("t", "tvd", 0),
            Err(TVError::InvalidPageSize)
        ));
    }

    #[test]
    fn channels_scenario() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.set_columns(Columns::new(vec![
            Column::plain("number", "#"),
            Column::plain("name", "Channel"),
        ]));
        grid.load(&fetch);
        assert_eq!(
            fetch.urls(),
            ["tvd?c=tvdaemon&a=get_channels&page_size=20&start=0&search="]
        );

        let ticket = fetch.last().ticket;
        let applied = grid.complete(
            &ticket,
            &Ok(json!({"data": [{"id": 1, "number": "1", "name": "BBC"}], "count": 1, "start": 0, "end": 1})),
        );
        assert_eq!(applied, Completed::Applied);
        assert_eq!(grid.count(), 1);
        assert_eq!(grid.rows().len(), 1);

        let rendered = grid.render();
        assert_eq!(rendered.summary.as_deref(), Some("1 - 1 / 1"));
        assert_eq!(rendered.rows().len(), 1);
    }

    #[test]
    fn url_without_query_gets_question_mark() {
        let fetch = RecordingDispatch::default();
        let mut grid: Grid<Row> = Grid::configure("t", "tvd", 5).unwrap();
        grid.load(&fetch);
        assert_eq!(fetch.urls(), ["tvd?page_size=5&start=0&search="]);
    }

    #[test]
    fn url_with_empty_query_is_not_doubled() {
        let grid: Grid<Row> = Grid::configure("t", "tvd?", 5).unwrap();
        assert_eq!(grid.request_url(), "tvd?page_size=5&start=0&search=");
    }

    #[test]
    fn search_is_percent_encoded() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.set_search("BBC One&Two", &fetch);
        assert_eq!(
            fetch.urls(),
            ["tvd?c=tvdaemon&a=get_channels&page_size=20&start=0&search=BBC%20One%26Two"]
        );
    }

    #[test]
    fn same_search_twice_fetches_once() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.set_search("bbc", &fetch);
        grid.set_search("bbc", &fetch);
        assert_eq!(fetch.requests.borrow().len(), 1);
    }

    #[test]
    fn new_search_resets_start() {
        let fetch = RecordingDispatch::default();
        let mut grid = loaded(100, 10, &fetch);
        grid.scroll_next(&fetch);
        grid.scroll_next(&fetch);
        assert_eq!(grid.start(), 20);

        grid.set_search("news", &fetch);
        assert_eq!(grid.start(), 0);
        assert!(fetch.last().url.contains("&start=0&search=news"));
    }

    #[test]
    fn scroll_next_stops_at_last_page_but_still_loads() {
        let fetch = RecordingDispatch::default();
        let mut grid = loaded(25, 10, &fetch);
        grid.scroll_next(&fetch);
        grid.scroll_next(&fetch);
        assert_eq!(grid.start(), 20);
        let before = fetch.requests.borrow().len();
        grid.scroll_next(&fetch);
        assert_eq!(grid.start(), 20);
        assert_eq!(fetch.requests.borrow().len(), before + 1);
    }

    #[test]
    fn failed_load_keeps_rows_and_count() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.load(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({"data": [{"id": 1, "name": "BBC"}], "count": 41, "start": 0, "end": 20})),
        );
        grid.scroll_next(&fetch);
        let applied = grid.complete(
            &fetch.last().ticket,
            &Err(FetchFailure::new(FailureKind::Timeout, "timeout")),
        );

        assert_eq!(applied, Completed::Applied);
        assert_eq!(grid.count(), 41);
        assert_eq!(grid.rows().len(), 1);
        assert_eq!(grid.start(), 20);
        assert_eq!(grid.error(), Some("timeout"));
        assert_eq!(
            grid.render().error.as_deref(),
            Some("error loading data: timeout")
        );

        // Any navigation retries.
        grid.scroll_prev(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({"data": [], "count": 41, "start": 0, "end": 20})),
        );
        assert_eq!(grid.error(), None);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.set_search("a", &fetch);
        let first = fetch.last().ticket;
        grid.set_search("ab", &fetch);
        let second = fetch.last().ticket;

        assert_eq!(
            grid.complete(
                &second,
                &Ok(json!({"data": [{"name": "ABC"}], "count": 1, "start": 0, "end": 1}))
            ),
            Completed::Applied
        );
        assert_eq!(
            grid.complete(
                &first,
                &Ok(json!({"data": [{"name": "A1"}, {"name": "A2"}], "count": 2, "start": 0, "end": 2}))
            ),
            Completed::Stale
        );
        assert_eq!(grid.count(), 1);
        assert_eq!(grid.rows()[0].field("name").as_deref(), Some("ABC"));
    }

    #[test]
    fn malformed_payload_means_no_rows() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.load(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({"data": [{"id": 1}], "count": 1, "start": 0, "end": 1})),
        );
        grid.load(&fetch);
        grid.complete(&fetch.last().ticket, &Ok(json!(["not", "a", "page"])));
        assert!(grid.rows().is_empty());
        assert_eq!(grid.count(), 0);
        assert_eq!(grid.error(), None);
    }

    #[test]
    fn unusable_row_does_not_take_its_siblings_down() {
        let fetch = RecordingDispatch::default();
        let mut grid = channels();
        grid.load(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({
                "data": [{"id": 1, "name": "BBC"}, 5, {"id": 3, "name": "ZDF"}],
                "count": 3, "start": 0, "end": 3
            })),
        );
        assert_eq!(grid.count(), 3);
        let names: Vec<String> = grid
            .rows()
            .iter()
            .filter_map(|r| r.field("name"))
            .collect();
        assert_eq!(names, ["BBC", "ZDF"]);
        assert_eq!(grid.render().summary.as_deref(), Some("1 - 3 / 3"));
    }

    #[test]
    fn unpacked_payloads_list_without_paging() {
        let fetch = RecordingDispatch::default();
        let mut grid: Grid<Row> = Grid::configure("devices", "tvd?c=tvdaemon&a=get_devices", 10).unwrap();
        grid.set_unpack(|payload| {
            payload
                .as_array()
                .map(|items| items.iter().flat_map(|i| i["ports"].as_array().cloned().unwrap_or_default()).collect())
                .unwrap_or_default()
        });
        grid.load(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!([{"ports": [{"id": 0}, {"id": 1}]}, {"ports": [{"id": 2}]}])),
        );
        assert_eq!(grid.rows().len(), 3);
        assert_eq!(grid.rows()[2].id(), Some(2));
        assert_eq!(grid.count(), 0);
    }

    #[test]
    fn payload_without_count_is_an_unpaged_list() {
        let fetch = RecordingDispatch::default();
        let mut grid: Grid<Row> = Grid::configure("sources", "tvd?c=tvdaemon&a=get_sources", 10).unwrap();
        grid.load(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({"iTotalRecords": 2, "data": [{"id": 0}, {"id": 1}]})),
        );
        assert_eq!(grid.rows().len(), 2);
        assert_eq!(grid.count(), 0);
        assert_eq!(grid.render().summary, None);
    }

    proptest! {
        #[test]
        fn scroll_prev_clamps_at_zero(page_size in 1usize..50, count in 0usize..500, nexts in 0usize..20, prevs in 0usize..40) {
            let fetch = RecordingDispatch::default();
            let mut grid = loaded(count, page_size, &fetch);
            for _ in 0..nexts {
                grid.scroll_next(&fetch);
            }
            let expected = grid.start().saturating_sub(prevs * page_size);
            for _ in 0..prevs {
                grid.scroll_prev(&fetch);
            }
            prop_assert_eq!(grid.start(), expected);
            for _ in 0..(count / page_size + 1) {
                grid.scroll_prev(&fetch);
            }
            prop_assert_eq!(grid.start(), 0);
            grid.scroll_prev(&fetch);
            prop_assert_eq!(grid.start(), 0);
        }

        #[test]
        fn scroll_next_only_advances_inside_count(page_size in 1usize..50, count in 0usize..500, steps in 0usize..30) {
            let fetch = RecordingDispatch::default();
            let mut grid = loaded(count, page_size, &fetch);
            for _ in 0..steps {
                let before = grid.start();
                grid.scroll_next(&fetch);
                if before + page_size < count {
                    prop_assert_eq!(grid.start(), before + page_size);
                } else {
                    prop_assert_eq!(grid.start(), before);
                }
                prop_assert!(grid.start() == 0 || grid.start() < count);
            }
        }
    }
}
