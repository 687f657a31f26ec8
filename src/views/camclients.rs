use serde::Deserialize;

use crate::columns::{Column, Columns};
use crate::domain::{AfterCall, Command, TVError};
use crate::grid::Grid;
use crate::record::Record;
use crate::views::ViewEnv;
use crate::views::format;

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_camclients";
const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct CamClient {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub hostname: String,
    #[serde(default, deserialize_with = "format::text")]
    pub service: String,
    #[serde(default, deserialize_with = "format::text")]
    pub username: String,
}

impl Record for CamClient {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "hostname" => Some(self.hostname.clone()),
            "service" => Some(self.service.clone()),
            "username" => Some(self.username.clone()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

pub fn columns() -> Columns<CamClient> {
    Columns::new(vec![
        Column::plain("hostname", "Hostname"),
        Column::plain("service", "Service"),
        Column::plain("username", "Username"),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<Grid<CamClient>, TVError> {
    let mut grid = Grid::configure("camclients", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns());
    grid.set_row_activation(|c: &CamClient| match c.id() {
        Some(id) => Command::Confirm {
            prompt: format!("Remove {} ?", c.hostname),
            then: Box::new(Command::Call {
                url: format!("tvd?c=tvdaemon&a=remove_camclient&id={id}"),
                after: AfterCall::Reload,
            }),
        },
        None => Command::Status(format!("CAM client {} has no id", c.hostname)),
    });
    Ok(grid)
}
