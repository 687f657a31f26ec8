//! Tuner hardware: every adapter port with the source it receives.
//!
//! `get_devices` is not paged. It answers with the adapters keyed by id, each
//! holding its frontends and their ports, and the grid lists one row per port.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::columns::{Column, Columns};
use crate::domain::TVError;
use crate::grid::Grid;
use crate::record::{Record, value_text};
use crate::views::format;
use crate::views::{ViewContext, ViewEnv};

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_devices";
pub const SOURCES: &str = "tvd?c=tvdaemon&a=get_sources";
const PAGE_SIZE: usize = 20;

fn no_source() -> i64 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Port {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub name: String,
    #[serde(default = "no_source")]
    pub source_id: i64,
    #[serde(default, deserialize_with = "format::text")]
    pub adapter: String,
    #[serde(default, deserialize_with = "format::flag")]
    pub present: bool,
    #[serde(default, deserialize_with = "format::text")]
    pub frontend: String,
}

impl Port {
    fn label(&self) -> String {
        match (self.name.is_empty(), self.id) {
            (false, _) => self.name.clone(),
            (true, Some(id)) => format!("Port {id}"),
            (true, None) => String::new(),
        }
    }
}

impl Record for Port {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "name" => Some(self.label()),
            "source_id" => Some(self.source_id.to_string()),
            "adapter" => Some(self.adapter.clone()),
            "frontend" => Some(self.frontend.clone()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

/// Children of a node, whether the backend sent a list or an object keyed by id.
fn members(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(items)) => items.values().collect(),
        _ => Vec::new(),
    }
}

/// One row per port, carrying the names of its adapter and frontend.
pub fn flatten(devices: &Value) -> Vec<Value> {
    let mut rows = Vec::new();
    for adapter in members(Some(devices)) {
        for frontend in members(adapter.get("frontends")) {
            for port in members(frontend.get("ports")) {
                let mut row = port.as_object().cloned().unwrap_or_else(Map::new);
                row.insert("adapter".into(), adapter.get("name").cloned().unwrap_or(Value::Null));
                row.insert("present".into(), adapter.get("present").cloned().unwrap_or(Value::Null));
                row.insert("frontend".into(), frontend.get("name").cloned().unwrap_or(Value::Null));
                rows.push(Value::Object(row));
            }
        }
    }
    rows
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    pub name: String,
    pub transponders: i64,
    pub services: i64,
}

/// Sources the port rows point at, by id.
#[derive(Debug, Default)]
pub struct AdapterContext {
    pub sources: HashMap<i64, SourceInfo>,
}

impl AdapterContext {
    pub fn source(&self, id: i64) -> Option<&SourceInfo> {
        self.sources.get(&id)
    }

    pub fn source_name(&self, id: i64) -> String {
        if id < 0 {
            return "Undefined".into();
        }
        self.source(id).map(|s| s.name.clone()).unwrap_or_default()
    }
}

pub struct AdapterContextLoader(Rc<RefCell<AdapterContext>>);

impl ViewContext for AdapterContextLoader {
    fn requests(&self) -> Vec<(&'static str, String)> {
        vec![("sources", SOURCES.to_string())]
    }

    fn absorb(&mut self, key: &str, payload: &Value) -> bool {
        if key != "sources" {
            warn!("Adapters got unknown context {key}");
            return false;
        }
        let mut context = self.0.borrow_mut();
        context.sources = members(payload.get("data"))
            .into_iter()
            .filter_map(|s| {
                let id = s.get("id")?.as_i64()?;
                Some((
                    id,
                    SourceInfo {
                        name: s.get("name").map(value_text).unwrap_or_default(),
                        transponders: s.get("transponders").and_then(Value::as_i64).unwrap_or(0),
                        services: s.get("services").and_then(Value::as_i64).unwrap_or(0),
                    },
                ))
            })
            .collect();
        debug!("Got {} sources", context.sources.len());
        true
    }
}

pub fn columns(context: &Rc<RefCell<AdapterContext>>) -> Columns<Port> {
    let names = Rc::clone(context);
    let transponders = Rc::clone(context);
    let services = Rc::clone(context);
    Columns::new(vec![
        Column::computed("adapter", "Adapter", |p: &Port, _, _| {
            if p.present {
                p.adapter.clone()
            } else {
                format!("{} (absent)", p.adapter)
            }
        }),
        Column::plain("frontend", "Frontend"),
        Column::plain("name", "Port"),
        Column::computed("source_id", "Source", move |p: &Port, _, _| {
            names.borrow().source_name(p.source_id)
        }),
        Column::computed("transponders", "Transponders", move |p: &Port, _, _| {
            transponders
                .borrow()
                .source(p.source_id)
                .map(|s| s.transponders.to_string())
                .unwrap_or_default()
        }),
        Column::computed("services", "Services", move |p: &Port, _, _| {
            services
                .borrow()
                .source(p.source_id)
                .map(|s| s.services.to_string())
                .unwrap_or_default()
        }),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<(Grid<Port>, AdapterContextLoader), TVError> {
    let context = Rc::new(RefCell::new(AdapterContext::default()));
    let mut grid = Grid::configure("adapters", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns(&context));
    grid.set_unpack(flatten);
    Ok((grid, AdapterContextLoader(context)))
}
