use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::columns::{Column, Columns};
use crate::domain::{AfterCall, Command, TVError};
use crate::grid::Grid;
use crate::record::{Record, value_text};
use crate::views::format;
use crate::views::{ViewContext, ViewEnv};

pub const ENDPOINT: &str = "tvd?c=tvdaemon&a=get_services";
pub const SERVICE_TYPES: &str = "tvd?c=tvdaemon&a=get_service_types";
pub const SOURCES: &str = "tvd?c=tvdaemon&a=get_sources";
const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "format::text")]
    pub name: String,
    #[serde(default, deserialize_with = "format::text")]
    pub provider: String,
    #[serde(default, rename = "type")]
    pub service_type: i64,
    #[serde(default, deserialize_with = "format::flag")]
    pub scrambled: bool,
    #[serde(default, deserialize_with = "format::flag")]
    pub channel: bool,
    #[serde(default)]
    pub transponder_id: i64,
    #[serde(default)]
    pub source_id: i64,
    #[serde(default, deserialize_with = "format::text")]
    pub transponder: String,
}

impl Record for Service {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.map(|id| id.to_string()),
            "name" => Some(self.name.clone()),
            "provider" => Some(self.provider.clone()),
            "type" => Some(self.service_type.to_string()),
            "transponder_id" => Some(self.transponder_id.to_string()),
            "source_id" => Some(self.source_id.to_string()),
            "transponder" => Some(self.transponder.clone()),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

/// Names the service table resolves ids against.
#[derive(Debug, Default)]
pub struct ServiceContext {
    pub service_types: Vec<String>,
    pub sources: HashMap<i64, String>,
}

impl ServiceContext {
    pub fn service_type(&self, idx: i64) -> String {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.service_types.get(i))
            .cloned()
            .unwrap_or_default()
    }

    pub fn source(&self, id: i64) -> String {
        self.sources.get(&id).cloned().unwrap_or_default()
    }
}

pub struct ServiceContextLoader(Rc<RefCell<ServiceContext>>);

impl ViewContext for ServiceContextLoader {
    fn requests(&self) -> Vec<(&'static str, String)> {
        vec![
            ("service_types", SERVICE_TYPES.to_string()),
            ("sources", SOURCES.to_string()),
        ]
    }

    fn absorb(&mut self, key: &str, payload: &Value) -> bool {
        let mut context = self.0.borrow_mut();
        match key {
            "service_types" => {
                context.service_types = payload
                    .as_array()
                    .map(|types| types.iter().map(value_text).collect())
                    .unwrap_or_default();
                debug!("Got {} service types", context.service_types.len());
                true
            }
            "sources" => {
                context.sources = payload
                    .get("data")
                    .and_then(Value::as_array)
                    .map(|sources| {
                        sources
                            .iter()
                            .filter_map(|s| {
                                let id = s.get("id")?.as_i64()?;
                                Some((id, s.get("name").map(value_text).unwrap_or_default()))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                debug!("Got {} sources", context.sources.len());
                true
            }
            _ => {
                warn!("Services got unknown context {key}");
                false
            }
        }
    }
}

pub fn add_channel_url(s: &Service) -> Option<String> {
    Some(format!(
        "tvd?c=service&a=add_channel&source_id={}&transponder_id={}&service_id={}",
        s.source_id,
        s.transponder_id,
        s.id()?
    ))
}

pub fn columns(context: &Rc<RefCell<ServiceContext>>) -> Columns<Service> {
    let types = Rc::clone(context);
    let sources = Rc::clone(context);
    Columns::new(vec![
        Column::computed("channel", "", |s: &Service, _, _| {
            if s.channel { "C".into() } else { String::new() }
        }),
        Column::computed("scrambled", "", |s: &Service, _, _| {
            if s.scrambled { "⚷".into() } else { String::new() }
        }),
        Column::plain("name", "Service"),
        Column::plain("provider", "Provider"),
        Column::computed("type", "Type", move |s: &Service, _, _| {
            types.borrow().service_type(s.service_type)
        }),
        Column::computed("source_id", "Source", move |s: &Service, _, _| {
            sources.borrow().source(s.source_id)
        }),
        Column::numeric("id", "PID"),
    ])
}

pub fn grid(env: &ViewEnv) -> Result<(Grid<Service>, ServiceContextLoader), TVError> {
    let context = Rc::new(RefCell::new(ServiceContext::default()));
    let mut grid = Grid::configure("services", ENDPOINT, env.page_size(PAGE_SIZE))?;
    grid.set_columns(columns(&context));
    grid.set_row_activation(|s: &Service| match add_channel_url(s) {
        Some(url) => Command::Call {
            url,
            after: AfterCall::Reload,
        },
        None => Command::Status(format!("Service {} has no id", s.name)),
    });
    Ok((grid, ServiceContextLoader(context)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridHandle;
    use crate::grid::tests::RecordingDispatch;
    use crate::render::CellStyle;
    use serde_json::json;

    fn page() -> Value {
        json!({
            "data": [{
                "id": 28106, "name": "Das Erste", "provider": "ARD", "type": 1,
                "scrambled": 0, "channel": 1, "transponder_id": 3, "source_id": 0,
                "transponder": "11836 H"
            }],
            "count": 1, "start": 0, "end": 1
        })
    }

    #[test]
    fn cells_resolve_against_the_view_context() {
        let fetch = RecordingDispatch::default();
        let (mut grid, mut context) = grid(&ViewEnv::default()).unwrap();
        grid.load(&fetch);
        grid.complete(&fetch.last().ticket, &Ok(page()));

        // Before the context arrived the names are unknown.
        let before = grid.render();
        assert_eq!(before.rows()[0].cells[4].text, "");

        assert!(context.absorb("service_types", &json!(["Unknown", "TV", "Radio"])));
        assert!(context.absorb(
            "sources",
            &json!({"iTotalRecords": 1, "data": [{"id": 0, "name": "Astra 19.2E"}]})
        ));
        assert!(!context.absorb("adapters", &json!({})));

        let rendered = grid.render();
        let texts: Vec<&str> = rendered.rows()[0]
            .cells
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, ["C", "", "Das Erste", "ARD", "TV", "Astra 19.2E", "28106"]);
        assert_eq!(rendered.rows()[0].cells[6].style, CellStyle::Numeric);
    }

    #[test]
    fn activation_adds_a_channel_and_reloads() {
        let fetch = RecordingDispatch::default();
        let (mut grid, _context) = grid(&ViewEnv::default()).unwrap();
        grid.load(&fetch);
        grid.complete(&fetch.last().ticket, &Ok(page()));
        assert_eq!(
            grid.render().rows()[0].activate(),
            Some(Command::Call {
                url: "tvd?c=service&a=add_channel&source_id=0&transponder_id=3&service_id=28106"
                    .into(),
                after: AfterCall::Reload,
            })
        );
    }

    #[test]
    fn service_without_id_is_not_added() {
        let fetch = RecordingDispatch::default();
        let (mut grid, _context) = grid(&ViewEnv::default()).unwrap();
        grid.load(&fetch);
        grid.complete(
            &fetch.last().ticket,
            &Ok(json!({
                "data": [{"name": "Radio 1", "provider": null, "transponder_id": 3}],
                "count": 1, "start": 0, "end": 1
            })),
        );
        let rendered = grid.render();
        assert_eq!(rendered.rows()[0].cells[3].text, "");
        assert_eq!(
            rendered.rows()[0].activate(),
            Some(Command::Status("Service Radio 1 has no id".into()))
        );
    }

    #[test]
    fn out_of_range_type_is_empty() {
        let context = ServiceContext {
            service_types: vec!["TV".into()],
            sources: HashMap::new(),
        };
        assert_eq!(context.service_type(-1), "");
        assert_eq!(context.service_type(5), "");
        assert_eq!(context.source(9), "");
    }
}
