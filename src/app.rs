use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::LandQueueClient;
use crate::config::AppConfig;
use crate::queue::item::{ActionOutcome, FetchTicket, QueueAction, QueueItem, TicketCounter, Toggle};
use crate::queue::{ActionResponse, LandRequestInfo, StatusUpdate};
use crate::users::UserDirectory;

/// How long a status message stays in the info line
const STATUS_MESSAGE_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
    Confirm,
    Alert, // Backend refused an action; must be dismissed
}

/// Results of background requests, applied on the UI loop
#[derive(Debug)]
pub enum AppEvent {
    QueueLoaded {
        /// Only the newest refresh is applied
        generation: u64,
        result: Result<Vec<StatusUpdate>, String>,
    },
    DetailLoaded {
        request_id: String,
        ticket: FetchTicket,
        result: Result<LandRequestInfo, String>,
    },
    ActionFinished {
        request_id: String,
        action: QueueAction,
        result: Result<ActionResponse, String>,
    },
    UserLoaded {
        aaid: String,
        name: String,
    },
}

pub struct App {
    pub config: AppConfig,
    client: LandQueueClient,

    // Raw queue snapshot (dependency lookups) and the items drawn from it
    pub queue: Vec<StatusUpdate>,
    pub items: Vec<QueueItem>,
    pub selected: usize,

    pub popup: Popup,
    pub alert_message: Option<String>,
    pub confirm_message: Option<String>,
    pending_action: Option<(String, QueueAction)>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    pub users: UserDirectory,

    pub loaded: bool,
    refresh_in_flight: bool,
    refresh_generation: u64,
    // A reload was asked for; the next applied snapshot rebuilds every item
    resync_pending: bool,
    last_refresh: Instant,
    tickets: TicketCounter,

    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(config: AppConfig, client: LandQueueClient) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let users = UserDirectory::new(&config.users);

        Self {
            config,
            client,
            queue: Vec::new(),
            items: Vec::new(),
            selected: 0,
            popup: Popup::None,
            alert_message: None,
            confirm_message: None,
            pending_action: None,
            status_message: None,
            status_message_time: None,
            users,
            loaded: false,
            refresh_in_flight: false,
            refresh_generation: 0,
            resync_pending: false,
            last_refresh: Instant::now(),
            tickets: TicketCounter::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn server_url(&self) -> &str {
        self.client.base_url()
    }

    /// Set a status message (auto-clears after a few seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Run a request in the background and feed its result back into the loop
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // Receiver only goes away on shutdown
            let _ = tx.send(task.await);
        });
    }

    /// Fetch the queue. `resync` throws away local expand state, like a page reload.
    pub fn refresh(&mut self, resync: bool) {
        let generation = self.start_refresh(resync);

        let client = self.client.clone();
        self.spawn(async move {
            let result = client.current_queue().await.map_err(|e| e.to_string());
            AppEvent::QueueLoaded { generation, result }
        });
    }

    /// Supersede any refresh still in flight
    pub(crate) fn start_refresh(&mut self, resync: bool) -> u64 {
        self.refresh_generation += 1;
        self.resync_pending |= resync;
        self.refresh_in_flight = true;
        self.last_refresh = Instant::now();
        self.refresh_generation
    }

    pub fn selected_item(&self) -> Option<&QueueItem> {
        self.items.get(self.selected)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Show more / show less
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),

            // Remove (queued) or cancel (running)
            KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => self.request_action(),

            KeyCode::Char('R') | KeyCode::Char('r') => {
                self.refresh(false);
                self.set_status("Refreshing queue...");
            }

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc
                        | KeyCode::Char('?')
                        | KeyCode::Char('h')
                        | KeyCode::Enter
                        | KeyCode::Char('q')
                ) {
                    self.popup = Popup::None;
                }
            }
            Popup::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.popup = Popup::None;
                    self.confirm_action();
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.popup = Popup::None;
                    self.pending_action = None;
                    self.confirm_message = None;
                }
                _ => {}
            },
            Popup::Alert => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('q')
                ) {
                    self.popup = Popup::None;
                    self.alert_message = None;
                }
            }
            Popup::None => {}
        }
        Ok(())
    }

    fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1).min(self.items.len() - 1);
        }
    }

    fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn toggle_selected(&mut self) {
        let Some(item) = self.items.get_mut(self.selected) else {
            return;
        };

        if let Toggle::Fetch(ticket) = item.toggle(&mut self.tickets) {
            let request_id = item.request_id().to_string();
            let client = self.client.clone();
            self.spawn(async move {
                let result = client.land_request(&request_id).await.map_err(|e| e.to_string());
                AppEvent::DetailLoaded { request_id, ticket, result }
            });
        }
    }

    fn request_action(&mut self) {
        let Some(item) = self.items.get(self.selected) else {
            return;
        };
        let Some(action) = item.available_action() else {
            self.set_status("Nothing to do for this request");
            return;
        };

        let pr = item.status().request.pull_request_id;
        self.confirm_message = Some(match action {
            QueueAction::Remove => format!("Remove PR #{} from the queue?", pr),
            QueueAction::Cancel => format!("Cancel the running build for PR #{}?", pr),
        });
        self.pending_action = Some((item.request_id().to_string(), action));
        self.popup = Popup::Confirm;
    }

    fn confirm_action(&mut self) {
        self.confirm_message = None;
        let Some((request_id, action)) = self.pending_action.take() else {
            return;
        };

        let client = self.client.clone();
        self.spawn(async move {
            let result = client.perform(action, &request_id).await.map_err(|e| e.to_string());
            AppEvent::ActionFinished { request_id, action, result }
        });
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::QueueLoaded { generation, result } => {
                if generation != self.refresh_generation {
                    tracing::debug!("Dropping superseded queue refresh {}", generation);
                    return;
                }
                self.refresh_in_flight = false;
                match result {
                    Ok(statuses) => {
                        self.loaded = true;
                        let resync = std::mem::take(&mut self.resync_pending);
                        self.replace_queue(statuses, resync);
                        self.fetch_unknown_users();
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load queue: {}", e);
                        self.set_status(format!("Error: {}", e));
                    }
                }
            }
            AppEvent::DetailLoaded { request_id, ticket, result } => {
                let Some(item) = self.items.iter_mut().find(|i| i.request_id() == request_id) else {
                    return;
                };
                match result {
                    Ok(info) => {
                        item.apply_detail(ticket, info);
                    }
                    Err(e) => {
                        item.fetch_failed(ticket);
                        tracing::warn!("Failed to load request {}: {}", request_id, e);
                        self.set_status(format!("Error: {}", e));
                    }
                }
            }
            AppEvent::ActionFinished { request_id, action, result } => match result {
                Ok(response) => match response.outcome() {
                    ActionOutcome::Alert(error) => {
                        tracing::error!("{} {} refused: {}", action.label(), request_id, error);
                        self.alert_message = Some(error);
                        self.popup = Popup::Alert;
                    }
                    ActionOutcome::Reload => {
                        tracing::info!("{} {} accepted", action.label(), request_id);
                        self.refresh(true);
                    }
                },
                Err(e) => {
                    tracing::warn!("{} {} failed: {}", action.label(), request_id, e);
                    self.set_status(format!("Error: {}", e));
                }
            },
            AppEvent::UserLoaded { aaid, name } => self.users.insert(aaid, name),
        }
    }

    /// Swap in a new queue snapshot
    fn replace_queue(&mut self, statuses: Vec<StatusUpdate>, resync: bool) {
        let mut previous = if resync {
            Vec::new()
        } else {
            std::mem::take(&mut self.items)
        };

        self.items = statuses
            .iter()
            .map(|status| {
                match previous.iter().position(|i| i.request_id() == status.request_id) {
                    Some(index) => {
                        let mut item = previous.swap_remove(index);
                        item.update_status(status.clone());
                        item
                    }
                    None => QueueItem::new(status.clone()),
                }
            })
            .collect();
        self.queue = statuses;

        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }

    fn fetch_unknown_users(&mut self) {
        let unknown: Vec<String> = self
            .queue
            .iter()
            .map(|s| s.request.pull_request.author_aaid.clone())
            .filter(|aaid| self.users.should_fetch(aaid))
            .collect();

        for aaid in unknown {
            let client = self.client.clone();
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                match client.user_display_name(&aaid).await {
                    Ok(name) => {
                        let _ = tx.send(AppEvent::UserLoaded { aaid, name });
                    }
                    Err(e) => tracing::debug!("No display name for {}: {}", aaid, e),
                }
            });
        }
    }

    pub async fn tick(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }

        // Clear status message after a few seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        // Periodic refresh keeps expanded items expanded
        if self.config.refresh_secs > 0
            && !self.refresh_in_flight
            && self.last_refresh.elapsed().as_secs() >= self.config.refresh_secs
        {
            self.refresh(false);
        }

        Ok(())
    }
}
