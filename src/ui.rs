use std::time::Duration;

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    None,
    History,
    Bookmarks,
}

/// Side panels. At most one is open.
#[derive(Debug, Default)]
pub struct Panels {
    active: Panel,
}

impl Panels {
    pub fn toggle_history(&mut self) {
        self.toggle(Panel::History);
    }

    pub fn toggle_bookmarks(&mut self) {
        self.toggle(Panel::Bookmarks);
    }

    fn toggle(&mut self, panel: Panel) {
        self.active = if self.active == panel { Panel::None } else { panel };
    }

    pub fn close_all(&mut self) {
        self.active = Panel::None;
    }

    pub fn active(&self) -> Panel {
        self.active
    }

    pub fn is_open(&self, panel: Panel) -> bool {
        panel != Panel::None && self.active == panel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
}

/// Holds the single visible toast. A new toast replaces the current one.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Toast>,
    next_id: u64,
}

impl Notifier {
    pub fn show(&mut self, message: impl Into<String>, severity: Severity) -> ToastId {
        self.next_id += 1;
        let id = ToastId(self.next_id);
        self.current = Some(Toast {
            id,
            message: message.into(),
            severity,
        });
        id
    }

    /// Hides the toast only if it is still the one identified by `id`.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        match &self.current {
            Some(toast) if toast.id == id => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }
}
