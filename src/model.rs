use std::collections::HashMap;
use std::time::Instant;

use arboard::Clipboard;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{AfterCall, Command, HELP_TEXT, Message, TVConfig, TVError};
use crate::fetcher::{self, Completion, Dispatch, Request, Sequencer, Target};
use crate::grid::Completed;
use crate::paginator::PaginatorBar;
use crate::render::RenderedGrid;
use crate::views::{View, ViewEnv, ViewKind};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    CMDINPUT,
    POPUP,
    CONFIRM,
}

pub struct Model {
    config: TVConfig,
    env: ViewEnv,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    view: View,
    rendered: RenderedGrid,
    selected_row: usize,
    popup_message: String,
    pending: Option<Command>,
    /// Follow-up of each pending call, with the grid that issued it.
    actions: HashMap<u64, (String, AfterCall)>,
    action_requests: Sequencer,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
    ui_size: (usize, usize),
}

impl Model {
    pub fn init(config: &TVConfig, host: String, fetch: &dyn Dispatch) -> Result<Self, TVError> {
        let env = ViewEnv {
            host,
            page_size: config.page_size,
        };
        let mut view = View::open(config.view, &env)?;
        view.start(fetch);
        let rendered = view.grid.render();
        Ok(Self {
            config: config.clone(),
            env,
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            view,
            rendered,
            selected_row: 0,
            popup_message: String::new(),
            pending: None,
            actions: HashMap::new(),
            action_requests: Sequencer::default(),
            clipboard: None,
            status_message: format!("Loading from {} ...", config.server),
            last_status_message_update: Instant::now(),
            ui_size: (0, 0),
        })
    }

    // ------------------------- Accessors for the ui ------------------------- //

    pub fn view_kind(&self) -> ViewKind {
        self.view.kind
    }

    pub fn rendered(&self) -> &RenderedGrid {
        &self.rendered
    }

    pub fn paginator(&self) -> PaginatorBar<'_> {
        self.view.paginator.view(self.rendered.summary.as_deref(), self.view.grid.as_ref())
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    pub fn popup(&self) -> Option<&str> {
        match self.modus {
            Modus::POPUP | Modus::CONFIRM => Some(&self.popup_message),
            _ => None,
        }
    }

    pub fn is_confirming(&self) -> bool {
        self.modus == Modus::CONFIRM
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn server(&self) -> &str {
        &self.config.server
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    pub fn status_age(&self) -> std::time::Duration {
        self.last_status_message_update.elapsed()
    }

    // ---------------------------- Message handling -------------------------- //

    pub fn update(&mut self, message: Option<Message>, fetch: &dyn Dispatch) -> Result<(), TVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.selected_row = self.selected_row.saturating_sub(1),
                Message::MoveDown => {
                    if self.selected_row + 1 < self.rendered.rows().len() {
                        self.selected_row += 1;
                    }
                }
                Message::ScrollPrev => {
                    let View {
                        grid, paginator, ..
                    } = &mut self.view;
                    paginator.prev(grid.as_mut(), fetch);
                }
                Message::ScrollNext => {
                    let View {
                        grid, paginator, ..
                    } = &mut self.view;
                    paginator.next(grid.as_mut(), fetch);
                }
                Message::Enter => self.activate_selected_row(fetch),
                Message::Update => self.update_selected_row(fetch),
                Message::Search => {
                    let View {
                        grid, paginator, ..
                    } = &mut self.view;
                    paginator.focus(grid.as_ref());
                    self.previous_modus = self.modus;
                    self.modus = Modus::CMDINPUT;
                }
                Message::Reload => self.view.grid.load(fetch),
                Message::NextView => self.switch_view(self.view.kind.next(), fetch)?,
                Message::PrevView => self.switch_view(self.view.kind.prev(), fetch)?,
                Message::SelectView(idx) => {
                    if let Some(&kind) = ViewKind::ALL.get(idx) {
                        self.switch_view(kind, fetch)?;
                    }
                }
                Message::Help => self.show_popup(HELP_TEXT.to_string()),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    let View {
                        grid, paginator, ..
                    } = &mut self.view;
                    paginator.key_released(key, grid.as_mut(), fetch);
                    if !paginator.is_focused() {
                        self.modus = self.previous_modus;
                        self.previous_modus = Modus::CMDINPUT;
                    }
                } else if let Message::Resize(width, height) = msg {
                    self.ui_resize(width, height);
                }
            }
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Accept => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CONFIRM => match msg {
                Message::Accept => {
                    self.close_popup();
                    if let Some(command) = self.pending.take() {
                        self.run(command, fetch);
                    }
                }
                Message::Exit | Message::Quit => {
                    self.close_popup();
                    self.pending = None;
                    self.set_status_message("Canceled");
                }
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    fn show_popup(&mut self, message: String) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = message;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::POPUP;
        self.popup_message.clear();
    }

    fn switch_view(&mut self, kind: ViewKind, fetch: &dyn Dispatch) -> Result<(), TVError> {
        if kind == self.view.kind {
            return Ok(());
        }
        // Dropping the old view drops its grid and context, late answers for
        // it are ignored by the new one.
        self.view = View::open(kind, &self.env)?;
        self.view.start(fetch);
        self.rendered = self.view.grid.render();
        self.selected_row = 0;
        self.set_status_message(format!("{} ...", kind.label()));
        Ok(())
    }

    fn activate_selected_row(&mut self, fetch: &dyn Dispatch) {
        let command = self
            .rendered
            .rows()
            .get(self.selected_row)
            .and_then(|row| row.activate());
        match command {
            Some(command) => self.run(command, fetch),
            None => trace!("Row {} has no activation", self.selected_row),
        }
    }

    fn update_selected_row(&mut self, fetch: &dyn Dispatch) {
        let command = self
            .rendered
            .rows()
            .get(self.selected_row)
            .and_then(|row| row.update());
        match command {
            Some(command) => self.run(command, fetch),
            None => self.set_status_message(format!("Nothing to update in {}", self.view.kind.label())),
        }
    }

    fn run(&mut self, command: Command, fetch: &dyn Dispatch) {
        debug!("Running {command:?}");
        match command {
            Command::Confirm { prompt, then } => {
                self.previous_modus = self.modus;
                self.modus = Modus::CONFIRM;
                self.popup_message = prompt;
                self.pending = Some(*then);
            }
            Command::Call { url, after } => {
                let ticket = self.action_requests.issue();
                self.actions
                    .insert(ticket.seq(), (self.view.grid.name().to_string(), after));
                fetch.dispatch(Request {
                    target: Target::Action(ticket.seq()),
                    ticket,
                    url,
                });
            }
            Command::Copy(text) => self.copy(text),
            Command::Status(text) => self.set_status_message(text),
        }
    }

    fn copy(&mut self, text: String) {
        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new()
                .map_err(|e| warn!("No clipboard available: {e}"))
                .ok();
        }
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text.clone()).map_err(|e| e.to_string()),
            None => Err("no clipboard".to_string()),
        };
        match result {
            Ok(_) => self.set_status_message(format!("Copied {text}")),
            Err(e) => {
                error!("Error copying to clipboard: {e}");
                self.set_status_message(format!("{text} (clipboard unavailable)"));
            }
        }
    }

    // ------------------------------ Completions ----------------------------- //

    pub fn complete(&mut self, completion: Completion, fetch: &dyn Dispatch) {
        let Completion {
            target,
            ticket,
            outcome,
        } = completion;
        match target {
            Target::Grid(name) => {
                if name != self.view.grid.name() {
                    debug!("Page for closed grid {name} dropped");
                    return;
                }
                if self.view.grid.complete(&ticket, &outcome) == Completed::Applied {
                    self.rerender();
                    match &self.rendered.error {
                        Some(err) => self.set_status_message(err.clone()),
                        None => self.set_status_message(format!(
                            "{} {}",
                            self.view.kind.label(),
                            self.rendered.summary.as_deref().unwrap_or("")
                        )),
                    }
                }
            }
            Target::Context(key) => {
                let view = &mut self.view;
                fetcher::complete(&outcome, |payload, _| match payload {
                    Some(payload) => {
                        view.absorb(&key, &ticket, payload);
                        true
                    }
                    // Columns resolving against it stay empty.
                    None => true,
                });
                self.rerender();
            }
            Target::Action(id) => {
                let reload = match self.actions.remove(&id) {
                    Some((issuer, AfterCall::Reload)) if issuer == self.view.grid.name() => true,
                    Some((issuer, AfterCall::Reload)) => {
                        debug!("Grid {issuer} is closed, no reload");
                        false
                    }
                    _ => false,
                };
                let grid = &mut self.view.grid;
                let surfaced = fetcher::complete(&outcome, |payload, _| {
                    if reload {
                        grid.load(fetch);
                    }
                    payload.is_some()
                });
                match surfaced {
                    Some(text) => self.show_popup(text),
                    None if outcome.is_ok() => self.set_status_message("Done"),
                    None => {}
                }
            }
        }
    }

    fn rerender(&mut self) {
        self.rendered = self.view.grid.render();
        let rows = self.rendered.rows().len();
        if self.selected_row >= rows {
            self.selected_row = rows.saturating_sub(1);
        }
        info!(
            "Rendered {}: {} rows{}",
            self.rendered.name,
            rows,
            if self.rendered.error.is_some() { " (error)" } else { "" }
        );
    }
}
