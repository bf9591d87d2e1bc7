/// An edit in progress on one interval cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub url: String,
    /// Last server-confirmed interval when the edit began.
    pub previous: u32,
    /// What the user has typed so far.
    pub pending: String,
}

/// An editable interval cell.
///
/// Mirrors the table cell contract: the cell knows its site url and its last
/// confirmed interval, and separately holds the text currently displayed,
/// which may be an unconfirmed edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalCell {
    url: String,
    confirmed: u32,
    text: String,
    session: Option<EditSession>,
}

impl IntervalCell {
    pub fn new(url: impl Into<String>, confirmed: u32) -> Self {
        Self {
            url: url.into(),
            confirmed,
            text: confirmed.to_string(),
            session: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn confirmed(&self) -> u32 {
        self.confirmed
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_some()
    }

    /// Opens an edit session unless one is already open.
    pub fn focus(&mut self) {
        if self.session.is_none() {
            self.session = Some(EditSession {
                url: self.url.clone(),
                previous: self.confirmed,
                pending: self.text.clone(),
            });
        }
    }

    /// Replaces the displayed text. Typing implies focus.
    pub fn input(&mut self, text: &str) {
        self.focus();
        self.text = text.to_string();
        if let Some(session) = self.session.as_mut() {
            session.pending = text.to_string();
        }
    }

    /// Enter confirms the edit by blurring the cell, so the blur that follows
    /// finds no session and cannot commit a second time.
    pub fn press_enter(&mut self) -> Option<EditSession> {
        self.blur()
    }

    /// Closes the session, handing it back for commit.
    pub fn blur(&mut self) -> Option<EditSession> {
        self.session.take()
    }

    /// Displays a validated but unconfirmed value.
    pub fn show_pending(&mut self, value: u32) {
        self.text = value.to_string();
    }

    /// Puts the last confirmed value back on display.
    pub fn rollback(&mut self) {
        self.session = None;
        self.text = self.confirmed.to_string();
    }

    /// Records a value the server acknowledged.
    pub fn confirm(&mut self, value: u32) {
        self.confirmed = value;
        self.text = value.to_string();
    }

    // Takes a confirmed value from a fresh listing. Text being typed, or an
    // edit awaiting its response, stays on display.
    pub(crate) fn sync_confirmed(&mut self, value: u32, keep_display: bool) {
        self.confirmed = value;
        if !keep_display && self.session.is_none() {
            self.text = value.to_string();
        }
    }
}
