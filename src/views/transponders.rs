use serde::Deserialize;

use crate::columns::{Column, Columns};
use crate::domain::TVError;
use crate::grid::Grid;
use crate::record::Record;
use crate::views::ViewEnv;
use crate::views::format;

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_transponders";
const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Transponder {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub delsys: i64,
    #[serde(default)]
    pub frequency: u64,
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub epg_state: i64,
    #[serde(default)]
    pub enabled: i64,
    #[serde(default)]
    pub tsid: i64,
    #[serde(default)]
    pub signal: i64,
    #[serde(default)]
    pub noise: i64,
    #[serde(default)]
    pub services: i64,
}

impl Record for Transponder {
    fn field(&self, key: &str) -> Option<String> {
        let value = match key {
            "id" => return self.id.map(|id| id.to_string()),
            "delsys" => self.delsys,
            "state" => self.state,
            "epg_state" => self.epg_state,
            "enabled" => self.enabled,
            "tsid" => self.tsid,
            "signal" => self.signal,
            "noise" => self.noise,
            "services" => self.services,
            "frequency" => return Some(self.frequency.to_string()),
            _ => return None,
        };
        Some(value.to_string())
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

pub fn columns() -> Columns<Transponder> {
    Columns::new(vec![
        Column::computed("delsys", "", |t: &Transponder, _, _| {
            format::delivery_system(t.delsys).to_string()
        }),
        Column::computed("frequency", "Frequency", |t: &Transponder, _, _| {
            format::frequency(t.frequency)
        }),
        Column::computed("state", "State", |t: &Transponder, _, _| {
            format::transponder_state(t.state).to_string()
        }),
        Column::computed("epg_state", "EPG", |t: &Transponder, _, _| {
            format::epg_state(t.epg_state).to_string()
        }),
        Column::plain("enabled", "Enabled"),
        Column::plain("tsid", "TS ID"),
        Column::computed("signal", "S/N", |t: &Transponder, _, _| {
            format!("{}/{}", t.signal, t.noise)
        }),
        Column::plain("services", "Services"),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<Grid<Transponder>, TVError> {
    let mut grid = Grid::configure("transponders", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns());
    Ok(grid)
}
