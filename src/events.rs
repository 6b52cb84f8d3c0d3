//! Messages sent from background workers to the UI thread.
//!
//! Workers never touch widgets. They hold an [`EventSink`] and emit
//! [`UiEvent`]s; the GUI drains them on the GLib main context.

#[cfg(test)]
use std::sync::Mutex;

use gtk4::glib;

use crate::connectivity::LinkChange;
use crate::installer::InstallMode;

/// Style of a notice shown in the status label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Long-running work in progress
    Progress,
    Success,
    Warning,
    Failure,
}

impl NoticeKind {
    fn color(self) -> &'static str {
        match self {
            NoticeKind::Progress => "cyan",
            NoticeKind::Success => "purple",
            NoticeKind::Warning => "orange",
            NoticeKind::Failure => "red",
        }
    }
}

/// A styled status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub detail: Option<String>,
    /// Stays until replaced instead of being cleared on a timer
    pub sticky: bool,
}

impl Notice {
    pub fn new(kind: NoticeKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            detail: None,
            // progress stays up until the operation reports back
            sticky: kind == NoticeKind::Progress,
        }
    }

    pub fn progress(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Progress, title)
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, title)
    }

    pub fn failure(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Failure, title)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Pango markup for the status label
    pub fn markup(&self) -> String {
        let title = glib::markup_escape_text(&self.title);
        match &self.detail {
            Some(detail) => format!(
                "<span foreground='{}'><b>{}</b>\n{}</span>",
                self.kind.color(),
                title,
                glib::markup_escape_text(detail)
            ),
            None => format!("<span foreground='{}'><b>{}</b></span>", self.kind.color(), title),
        }
    }
}

/// What the status label should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotAction {
    Show(Notice),
    Clear,
    Keep,
}

/// Bookkeeping for the single status label.
///
/// Operation notices and the offline warning share the label. While the
/// link is down the offline warning is what the label falls back to, and
/// a restored link only clears the label if that warning is on screen.
#[derive(Debug, Clone)]
pub struct NoticeSlot {
    online: bool,
    /// Bumped on every change so stale clear timers do nothing
    generation: u64,
    showing_offline: bool,
    offline: Notice,
}

impl NoticeSlot {
    pub fn new(offline: Notice) -> Self {
        Self {
            online: true,
            generation: 0,
            showing_offline: false,
            offline: offline.sticky(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Record that an operation notice is now displayed; returns its generation
    pub fn show(&mut self) -> u64 {
        self.generation += 1;
        self.showing_offline = false;
        self.generation
    }

    pub fn link_lost(&mut self) -> SlotAction {
        self.online = false;
        self.display_offline()
    }

    pub fn link_restored(&mut self) -> SlotAction {
        self.online = true;
        if !self.showing_offline {
            return SlotAction::Keep;
        }
        self.showing_offline = false;
        self.generation += 1;
        SlotAction::Clear
    }

    /// Timer for the notice shown at `generation` ran out
    pub fn expired(&mut self, generation: u64) -> SlotAction {
        if generation != self.generation {
            return SlotAction::Keep;
        }
        if !self.online {
            return self.display_offline();
        }
        self.generation += 1;
        SlotAction::Clear
    }

    fn display_offline(&mut self) -> SlotAction {
        self.generation += 1;
        self.showing_offline = true;
        SlotAction::Show(self.offline.clone())
    }
}

/// Everything a worker may ask the UI to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notice(Notice),
    Link(LinkChange),
    MirrorsBusy(bool),
    /// Calamares config files were copied (or failed to)
    InstallerPrepared { mode: InstallMode, ok: bool },
}

/// Thread-safe destination for [`UiEvent`]s
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);

    fn notice(&self, notice: Notice) {
        self.emit(UiEvent::Notice(notice));
    }
}

impl EventSink for async_channel::Sender<UiEvent> {
    fn emit(&self, event: UiEvent) {
        if let Err(e) = self.send_blocking(event) {
            tracing::warn!("UI event dropped, main loop gone: {}", e);
        }
    }
}

/// Collects events in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<UiEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, event: UiEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
