use std::fmt;
use std::rc::Rc;

use crate::domain::Command;
use crate::grid::{Activation, Grid, GridHandle};
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellStyle {
    Numeric,
    Field(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub text: String,
    pub style: CellStyle,
}

pub type RowAction = Rc<dyn Fn() -> Command>;

pub struct RenderedRow {
    pub cells: Vec<RenderedCell>,
    on_activate: Option<RowAction>,
    on_update: Option<RowAction>,
}

impl RenderedRow {
    pub fn is_activatable(&self) -> bool {
        self.on_activate.is_some()
    }

    pub fn activate(&self) -> Option<Command> {
        self.on_activate.as_ref().map(|f| f())
    }

    pub fn update(&self) -> Option<Command> {
        self.on_update.as_ref().map(|f| f())
    }

    pub fn height(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.text.lines().count())
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

impl fmt::Debug for RenderedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedRow")
            .field("cells", &self.cells)
            .field("activatable", &self.is_activatable())
            .finish()
    }
}

/// One complete presentation of a grid. Built from scratch on every render,
/// nothing is carried over from the previous one.
#[derive(Debug, Default)]
pub struct RenderedGrid {
    pub name: String,
    pub summary: Option<String>,
    pub header: Vec<String>,
    pub numeric: Vec<bool>,
    pub body: Vec<RenderedRow>,
    pub error: Option<String>,
}

impl RenderedGrid {
    pub fn rows(&self) -> &[RenderedRow] {
        &self.body
    }
}

pub fn render<R: Record>(grid: &Grid<R>) -> RenderedGrid {
    let mut out = RenderedGrid {
        name: grid.name().to_string(),
        ..RenderedGrid::default()
    };

    if let Some(err) = grid.error() {
        out.error = Some(format!("error loading data: {err}"));
        return out;
    }

    if grid.count() > 0 {
        let (start, end) = grid.span();
        out.summary = Some(format!("{} - {} / {}", start + 1, end, grid.count()));
    }

    let columns = grid.columns();
    out.header = columns.iter().map(|c| c.label.clone()).collect();
    out.numeric = columns.iter().map(|c| c.is_numeric()).collect();

    out.body = grid
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let cells = columns
                .iter()
                .map(|column| RenderedCell {
                    text: column.cell(row, idx),
                    style: if column.is_numeric() {
                        CellStyle::Numeric
                    } else {
                        CellStyle::Field(column.key.clone())
                    },
                })
                .collect();
            RenderedRow {
                cells,
                on_activate: grid.activation().map(|callback| bind(callback, row)),
                on_update: grid.update().map(|callback| bind(callback, row)),
            }
        })
        .collect();

    out
}

// Each row owns its own copy of the record.
fn bind<R: Record>(callback: &Activation<R>, row: &R) -> RowAction {
    let callback = Rc::clone(callback);
    let row = row.clone();
    Rc::new(move || callback(&row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{Column, Columns};
    use crate::grid::tests::RecordingDispatch;
    use crate::record::Row;
    use serde_json::{Value, json};

    fn grid_with(columns: Vec<Column<Row>>, page: Value) -> Grid<Row> {
        let fetch = RecordingDispatch::default();
        let mut grid: Grid<Row> = Grid::configure("channels", "tvd?c=tvdaemon&a=get_channels", 20).unwrap();
        grid.set_columns(Columns::new(columns));
        grid.load(&fetch);
        grid.complete(&fetch.last().ticket, &Ok(page));
        grid
    }

    fn two_rows() -> Value {
        json!({
            "data": [
                {"id": 1, "number": "1", "name": "BBC"},
                {"id": 2, "number": "2", "name": "ARD"}
            ],
            "count": 2, "start": 0, "end": 2
        })
    }

    #[test]
    fn header_follows_column_order() {
        let grid = grid_with(
            vec![Column::plain("number", "#"), Column::plain("name", "Channel")],
            two_rows(),
        );
        let rendered = render(&grid);
        assert_eq!(rendered.header, ["#", "Channel"]);
        assert_eq!(rendered.rows().len(), 2);
        assert_eq!(rendered.rows()[1].cells[1].text, "ARD");
        assert_eq!(rendered.summary.as_deref(), Some("1 - 2 / 2"));
    }

    #[test]
    fn empty_label_renders_empty_header() {
        let grid = grid_with(
            vec![Column::<Row>::computed("", "", |_, _, _| "update".to_string())],
            two_rows(),
        );
        assert_eq!(render(&grid).header, [""]);
    }

    #[test]
    fn style_hooks() {
        let grid = grid_with(
            vec![
                Column::numeric("id", "PID"),
                Column::plain("name", "Service"),
                Column::<Row>::computed("number", "No", |r, _, idx| {
                    format!("{}@{idx}", r.field("number").unwrap_or_default())
                }),
            ],
            two_rows(),
        );
        let rendered = render(&grid);
        let cells = &rendered.rows()[1].cells;
        assert_eq!(cells[0].style, CellStyle::Numeric);
        assert_eq!(cells[0].text, "2");
        assert_eq!(cells[1].style, CellStyle::Field("name".into()));
        assert_eq!(cells[2].style, CellStyle::Field("number".into()));
        assert_eq!(cells[2].text, "2@1");
        assert_eq!(rendered.numeric, [true, false, false]);
    }

    #[test]
    fn missing_fields_render_empty() {
        let grid = grid_with(vec![Column::plain("provider", "Provider")], two_rows());
        assert_eq!(render(&grid).rows()[0].cells[0].text, "");
    }

    #[test]
    fn no_summary_without_count() {
        let grid = grid_with(
            vec![Column::plain("name", "Channel")],
            json!({"data": [], "count": 0, "start": 0, "end": 0}),
        );
        let rendered = render(&grid);
        assert_eq!(rendered.summary, None);
        assert!(rendered.rows().is_empty());
    }

    #[test]
    fn rows_are_not_activatable_without_callback() {
        let grid = grid_with(vec![Column::plain("name", "Channel")], two_rows());
        let rendered = render(&grid);
        assert!(!rendered.rows()[0].is_activatable());
        assert_eq!(rendered.rows()[0].activate(), None);
        assert_eq!(rendered.rows()[0].update(), None);
    }

    #[test]
    fn activation_is_bound_to_the_rows_own_record() {
        let fetch = RecordingDispatch::default();
        let mut grid = grid_with(vec![Column::plain("name", "Channel")], two_rows());
        grid.set_row_activation(|row: &Row| Command::Status(row.field("name").unwrap_or_default()));

        let first_page = render(&grid);
        assert_eq!(
            first_page.rows()[0].activate(),
            Some(Command::Status("BBC".into()))
        );
        assert_eq!(
            first_page.rows()[1].activate(),
            Some(Command::Status("ARD".into()))
        );

        grid.scroll_next(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({"data": [{"id": 3, "name": "ZDF"}], "count": 3, "start": 2, "end": 3})),
        );
        let second_page = render(&grid);
        assert_eq!(second_page.rows().len(), 1);
        assert_eq!(
            second_page.rows()[0].activate(),
            Some(Command::Status("ZDF".into()))
        );
        // The old presentation still refers to its own records.
        assert_eq!(
            first_page.rows()[1].activate(),
            Some(Command::Status("ARD".into()))
        );
    }

    #[test]
    fn update_is_bound_next_to_activation() {
        let mut grid = grid_with(vec![Column::plain("name", "Channel")], two_rows());
        grid.set_row_update(|row: &Row| Command::Copy(format!("update {}", row.id().unwrap_or_default())));
        let rendered = render(&grid);
        assert!(!rendered.rows()[1].is_activatable());
        assert_eq!(rendered.rows()[1].update(), Some(Command::Copy("update 2".into())));
    }

    #[test]
    fn multi_line_cells_set_row_height() {
        let grid = grid_with(
            vec![Column::<Row>::computed("name", "", |r, _, _| {
                format!("{}\n{}", r.field("name").unwrap_or_default(), "line two")
            })],
            two_rows(),
        );
        assert_eq!(render(&grid).rows()[0].height(), 2);
    }

    #[test]
    #[should_panic(expected = "renderer bug")]
    fn panicking_renderer_is_not_caught() {
        let grid = grid_with(
            vec![Column::<Row>::computed("name", "Channel", |_, _, _| panic!("renderer bug"))],
            two_rows(),
        );
        let _ = render(&grid);
    }
}
