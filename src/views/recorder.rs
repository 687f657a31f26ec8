use serde::Deserialize;

use crate::columns::{Column, Columns};
use crate::domain::TVError;
use crate::grid::Grid;
use crate::record::Record;
use crate::views::ViewEnv;
use crate::views::format::{self, Stamp};

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_recordings";
const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub name: String,
    #[serde(default, deserialize_with = "format::text")]
    pub channel: String,
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    start_hour: u32,
    #[serde(default)]
    start_min: u32,
    #[serde(default)]
    start_day: u32,
    #[serde(default)]
    start_month: u32,
    #[serde(default, deserialize_with = "format::flag")]
    start_istoday: bool,
    #[serde(default, deserialize_with = "format::flag")]
    start_istomorrow: bool,
}

impl Recording {
    pub fn start(&self) -> Stamp {
        Stamp {
            hour: self.start_hour,
            min: self.start_min,
            day: self.start_day,
            month: self.start_month,
            istoday: self.start_istoday,
            istomorrow: self.start_istomorrow,
        }
    }
}

impl Record for Recording {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "name" => Some(self.name.clone()),
            "channel" => Some(self.channel.clone()),
            "state" => Some(self.state.to_string()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

pub fn columns() -> Columns<Recording> {
    Columns::new(vec![
        Column::computed("start", "Start", |r: &Recording, _, _| {
            format::print_time(&r.start())
        }),
        Column::plain("channel", "Channel"),
        Column::plain("name", "Name"),
        Column::computed("state", "State", |r: &Recording, _, _| {
            format::recording_state(r.state).to_string()
        }),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<Grid<Recording>, TVError> {
    let mut grid = Grid::configure("recorder", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns());
    Ok(grid)
}
