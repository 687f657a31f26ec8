//! Host views: one backend collection each, with its column model, row
//! activation and the auxiliary data its cells need.
//!
//! A view is built when it is opened and dropped when the user switches away,
//! so everything it fetched for itself goes with it.

pub mod adapters;
pub mod camclients;
pub mod channels;
pub mod epg;
pub mod format;
pub mod recorder;
pub mod services;
pub mod sources;
pub mod transponders;

use clap::ValueEnum;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::TVError;
use crate::fetcher::{Dispatch, Request, Sequencer, Target, Ticket};
use crate::grid::GridHandle;
use crate::paginator::Paginator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    Transponders,
    Services,
    Channels,
    Epg,
    Recorder,
    CamClients,
    Sources,
    Adapters,
}

impl ViewKind {
    pub const ALL: [ViewKind; 8] = [
        ViewKind::Transponders,
        ViewKind::Services,
        ViewKind::Channels,
        ViewKind::Epg,
        ViewKind::Recorder,
        ViewKind::CamClients,
        ViewKind::Sources,
        ViewKind::Adapters,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ViewKind::Transponders => "Transponders",
            ViewKind::Services => "Services",
            ViewKind::Channels => "Channels",
            ViewKind::Epg => "EPG",
            ViewKind::Recorder => "Recorder",
            ViewKind::CamClients => "CAM Clients",
            ViewKind::Sources => "Sources",
            ViewKind::Adapters => "Adapters",
        }
    }

    pub fn index(&self) -> usize {
        ViewKind::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    pub fn next(&self) -> ViewKind {
        ViewKind::ALL[(self.index() + 1) % ViewKind::ALL.len()]
    }

    pub fn prev(&self) -> ViewKind {
        ViewKind::ALL[(self.index() + ViewKind::ALL.len() - 1) % ViewKind::ALL.len()]
    }
}

/// What views need to know about the application they run in.
#[derive(Debug, Clone, Default)]
pub struct ViewEnv {
    /// `host[:port]` of the backend, used for stream locations.
    pub host: String,
    /// Overrides the per-view default page size.
    pub page_size: Option<usize>,
}

impl ViewEnv {
    pub fn page_size(&self, default: usize) -> usize {
        self.page_size.unwrap_or(default)
    }
}

/// Auxiliary collections a view fetches besides its grid.
pub trait ViewContext {
    /// `(key, url)` pairs to fetch when the view opens.
    fn requests(&self) -> Vec<(&'static str, String)>;
    /// Takes a fetched collection. Returns false when `key` is unknown.
    fn absorb(&mut self, key: &str, payload: &Value) -> bool;
}

pub struct View {
    pub kind: ViewKind,
    pub grid: Box<dyn GridHandle>,
    pub paginator: Paginator,
    context: Option<Box<dyn ViewContext>>,
    context_requests: Sequencer,
}

impl View {
    pub fn open(kind: ViewKind, env: &ViewEnv) -> Result<Self, TVError> {
        let (grid, context): (Box<dyn GridHandle>, Option<Box<dyn ViewContext>>) = match kind {
            ViewKind::Transponders => (Box::new(transponders::grid(env)?), None),
            ViewKind::Services => {
                let (grid, context) = services::grid(env)?;
                (Box::new(grid), Some(Box::new(context)))
            }
            ViewKind::Channels => (Box::new(channels::grid(env)?), None),
            ViewKind::Epg => (Box::new(epg::grid(env)?), None),
            ViewKind::Recorder => (Box::new(recorder::grid(env)?), None),
            ViewKind::CamClients => (Box::new(camclients::grid(env)?), None),
            ViewKind::Sources => (Box::new(sources::grid(env)?), None),
            ViewKind::Adapters => {
                let (grid, context) = adapters::grid(env)?;
                (Box::new(grid), Some(Box::new(context)))
            }
        };
        info!("Opened view {}", kind.label());
        Ok(Self {
            kind,
            grid,
            paginator: Paginator::default(),
            context,
            context_requests: Sequencer::default(),
        })
    }

    /// Fetches the auxiliary collections and the first page.
    pub fn start(&mut self, fetch: &dyn Dispatch) {
        if let Some(context) = &self.context {
            for (key, url) in context.requests() {
                fetch.dispatch(Request {
                    target: Target::Context(key.to_string()),
                    ticket: self.context_requests.issue(),
                    url,
                });
            }
        }
        self.grid.load(fetch);
    }

    /// Hands a context collection to this view, if it asked for it.
    pub fn absorb(&mut self, key: &str, ticket: &Ticket, payload: &Value) -> bool {
        if !self.context_requests.owns(ticket) {
            debug!("Context {key} belongs to a closed view");
            return false;
        }
        match &mut self.context {
            Some(context) => context.absorb(key, payload),
            None => false,
        }
    }
}
