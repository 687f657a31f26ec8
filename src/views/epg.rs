use serde::Deserialize;

use crate::columns::{Column, Columns};
use crate::domain::{AfterCall, Command, TVError};
use crate::grid::Grid;
use crate::record::Record;
use crate::views::ViewEnv;
use crate::views::format::{self, Stamp};

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_epg";
const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub name: String,
    #[serde(default, deserialize_with = "format::text")]
    pub description: String,
    #[serde(default, deserialize_with = "format::text")]
    pub description_extended: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, deserialize_with = "format::text")]
    pub channel: String,
    #[serde(default)]
    pub channel_id: Option<i64>,
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

impl Event {
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

impl Record for Event {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "name" => Some(self.name.clone()),
            "description" => Some(self.description.clone()),
            "description_extended" => Some(self.description_extended.clone()),
            "duration" => Some(self.duration.to_string()),
            "channel" => Some(self.channel.clone()),
            "channel_id" => self.channel_id.map(|id| id.to_string()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

fn print_start(e: &Event) -> String {
    format!("{}\n{}", format::print_time(&e.start()), format::duration(e.duration))
}

fn print_event(e: &Event) -> String {
    let mut cell = format!("{}\n{}\n{}", e.name, e.channel, e.description);
    if !e.description_extended.is_empty() {
        cell.push('\n');
        cell.push_str(&e.description_extended);
    }
    cell
}

/// Scheduling needs both the channel and the event id.
pub fn schedule_url(e: &Event) -> Option<String> {
    let (channel_id, event_id) = (e.channel_id?, e.id()?);
    Some(format!(
        "tvd?c=channel&a=schedule&channel_id={channel_id}&event_id={event_id}"
    ))
}

pub fn columns() -> Columns<Event> {
    Columns::new(vec![
        Column::computed("start", "", |e: &Event, _, _| print_start(e)),
        Column::computed("name", "", |e: &Event, _, _| print_event(e)),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<Grid<Event>, TVError> {
    let mut grid = Grid::configure("epg", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns());
    grid.set_row_activation(|e: &Event| match schedule_url(e) {
        Some(url) => Command::Confirm {
            prompt: format!("Record {} ?", e.name),
            then: Box::new(Command::Call {
                url,
                after: AfterCall::Nothing,
            }),
        },
        None => Command::Status(format!("{} cannot be scheduled", e.name)),
    });
    Ok(grid)
}
