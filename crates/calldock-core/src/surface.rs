//! # Surfaces
//!
//! Abstract view descriptions produced by elements and interpreted by a
//! rendering adapter. Elements never touch the terminal (or any other
//! backend); they describe themselves as plain data and the adapter decides
//! pixels, colors, and layout.
//!
//! Surfaces are rebuilt from scratch on every frame. They are intentionally
//! small: a handful of variants covers every screen the widget has.

/// A single labeled input line inside a [`Surface::Form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: String,
    pub value: String,
    /// Field currently holding the input cursor.
    pub active: bool,
    /// Render the value masked (access tokens).
    pub secret: bool,
}

impl FormField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            active: false,
            secret: false,
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Value as rendered: masked when secret, cursor marker when active.
    pub fn display_value(&self) -> String {
        if self.secret {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// One row of a [`Surface::List`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowItem {
    pub primary: String,
    pub secondary: String,
    /// Render de-emphasized (missed calls, disabled entries).
    pub dim: bool,
}

impl RowItem {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            dim: false,
        }
    }

    pub fn dim(mut self) -> Self {
        self.dim = true;
        self
    }
}

/// Abstract description of what an element looks like.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Nothing to draw (closed containers, logic-only nodes).
    None,
    /// Static text block with an optional footer line.
    Panel {
        title: String,
        body: Vec<String>,
        footer: Option<String>,
    },
    /// Labeled input fields plus a submit hint.
    Form {
        title: String,
        fields: Vec<FormField>,
        submit_label: String,
        error: Option<String>,
    },
    /// Scrollable rows with selection and a load-more indicator.
    List {
        title: String,
        items: Vec<RowItem>,
        selected: Option<usize>,
        loading_more: bool,
        empty_hint: String,
    },
    /// The in-call screen.
    CallFace {
        remote: String,
        state_line: String,
        /// `mm:ss` once connected, absent before.
        duration: Option<String>,
        muted: bool,
        video_on: bool,
        /// Key/label pairs for the control legend.
        controls: Vec<(String, String)>,
    },
    /// Short-lived notification line.
    Toast { text: String },
    /// Vertical selection menu.
    Menu {
        items: Vec<String>,
        selected: usize,
    },
    /// Layers drawn back to front; later entries overlay earlier ones.
    Stack { layers: Vec<Surface> },
}

impl Surface {
    /// Whether there is anything to draw at all.
    pub fn is_visible(&self) -> bool {
        match self {
            Surface::None => false,
            Surface::Stack { layers } => layers.iter().any(Surface::is_visible),
            _ => true,
        }
    }

    /// Flatten nested stacks into a single back-to-front layer list,
    /// dropping invisible layers.
    pub fn layers(self) -> Vec<Surface> {
        match self {
            Surface::None => Vec::new(),
            Surface::Stack { layers } => layers.into_iter().flat_map(Surface::layers).collect(),
            other => vec![other],
        }
    }
}
