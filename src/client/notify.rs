use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// A transient message shown to the user once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Shared queue of notices. Views push, the front end drains and shows them.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    queue: Arc<Mutex<Vec<Notice>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: NoticeKind, text: impl Into<String>) {
        let notice = Notice {
            kind,
            text: text.into(),
        };
        match notice.kind {
            NoticeKind::Error => tracing::warn!(text = %notice.text, "notice"),
            _ => tracing::debug!(text = %notice.text, "notice"),
        }
        if let Ok(mut q) = self.queue.lock() {
            q.push(notice);
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(NoticeKind::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(NoticeKind::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(NoticeKind::Error, text);
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.queue
            .lock()
            .map(|mut q| std::mem::take(&mut *q))
            .unwrap_or_default()
    }
}
