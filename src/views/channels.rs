use serde::Deserialize;

use crate::columns::{Column, Columns};
use crate::domain::{AfterCall, Command, TVError};
use crate::grid::Grid;
use crate::record::Record;
use crate::views::ViewEnv;
use crate::views::format::{self, Stamp};

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_channels";
const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub number: String,
    #[serde(default, deserialize_with = "format::text")]
    pub name: String,
    #[serde(default)]
    pub epg_state: i64,
    #[serde(default)]
    last_epg_hour: u32,
    #[serde(default)]
    last_epg_min: u32,
    #[serde(default)]
    last_epg_day: u32,
    #[serde(default)]
    last_epg_month: u32,
    #[serde(default, deserialize_with = "format::flag")]
    last_epg_istoday: bool,
    #[serde(default, deserialize_with = "format::flag")]
    last_epg_istomorrow: bool,
}

impl Channel {
    pub fn last_epg(&self) -> Stamp {
        Stamp {
            hour: self.last_epg_hour,
            min: self.last_epg_min,
            day: self.last_epg_day,
            month: self.last_epg_month,
            istoday: self.last_epg_istoday,
            istomorrow: self.last_epg_istomorrow,
        }
    }
}

impl Record for Channel {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "number" => Some(self.number.clone()),
            "name" => Some(self.name.clone()),
            "epg_state" => Some(self.epg_state.to_string()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

pub fn stream_location(host: &str, channel_id: i64) -> String {
    format!("rtsp://{host}/tvd?c=channel&a=stream&channel_id={channel_id}")
}

pub fn update_epg_url(channel_id: i64) -> String {
    format!("tvd?c=channel&a=update_epg&channel_id={channel_id}")
}

fn without_id(c: &Channel) -> Command {
    Command::Status(format!("Channel {} has no id", c.name))
}

pub fn columns() -> Columns<Channel> {
    Columns::new(vec![
        Column::plain("number", "#"),
        Column::plain("name", "Channel"),
        Column::computed("epg_state", "EPG", |c: &Channel, _, _| {
            format::epg_state(c.epg_state).to_string()
        }),
        Column::computed("last_epg", "Last Update", |c: &Channel, _, _| {
            format::print_time(&c.last_epg())
        }),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<Grid<Channel>, TVError> {
    let mut grid = Grid::configure("channels", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns());
    let host = env.host.clone();
    // The terminal cannot play the stream, hand its location to the user.
    grid.set_row_activation(move |c: &Channel| match c.id() {
        Some(id) => Command::Copy(stream_location(&host, id)),
        None => without_id(c),
    });
    grid.set_row_update(|c: &Channel| match c.id() {
        Some(id) => Command::Call {
            url: update_epg_url(id),
            after: AfterCall::Reload,
        },
        None => without_id(c),
    });
    Ok(grid)
}
