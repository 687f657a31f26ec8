use serde::Deserialize;

use crate::columns::{Column, Columns};
use crate::domain::TVError;
use crate::grid::Grid;
use crate::record::Record;
use crate::views::ViewEnv;
use crate::views::format;

// Answers with every source at once and without a count.
pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_sources";
const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub source_type: i64,
    #[serde(default)]
    pub transponders: i64,
    #[serde(default)]
    pub services: i64,
}

impl Record for Source {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "name" => Some(self.name.clone()),
            "type" => Some(self.source_type.to_string()),
            "transponders" => Some(self.transponders.to_string()),
            "services" => Some(self.services.to_string()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

pub fn columns() -> Columns<Source> {
    Columns::new(vec![
        Column::plain("name", "Source"),
        Column::numeric("type", "Type"),
        Column::numeric("transponders", "Transponders"),
        Column::numeric("services", "Services"),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<Grid<Source>, TVError> {
    let mut grid = Grid::configure("sources", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns());
    Ok(grid)
}
