//! Note, attribute and branch entities.

use serde::{Deserialize, Serialize};

/// Kind of content a note holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteType {
    #[default]
    Text,
    Code,
    Mermaid,
    Canvas,
    MindMap,
    Book,
    Render,
    File,
    Image,
    Search,
    RelationMap,
    WebView,
    NoteMap,
    Launcher,
    Doc,
    ContentWidget,
}

impl NoteType {
    /// Name as it appears in queries and flat text.
    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Text => "text",
            NoteType::Code => "code",
            NoteType::Mermaid => "mermaid",
            NoteType::Canvas => "canvas",
            NoteType::MindMap => "mindMap",
            NoteType::Book => "book",
            NoteType::Render => "render",
            NoteType::File => "file",
            NoteType::Image => "image",
            NoteType::Search => "search",
            NoteType::RelationMap => "relationMap",
            NoteType::WebView => "webView",
            NoteType::NoteMap => "noteMap",
            NoteType::Launcher => "launcher",
            NoteType::Doc => "doc",
            NoteType::ContentWidget => "contentWidget",
        }
    }

    /// Types whose content is searched and used for snippets.
    pub fn has_searchable_content(self) -> bool {
        matches!(
            self,
            NoteType::Text | NoteType::Code | NoteType::Mermaid | NoteType::Canvas | NoteType::MindMap
        )
    }

    /// Icon used when the note has no `#iconClass` label.
    pub fn default_icon(self) -> &'static str {
        match self {
            NoteType::File => "bx bx-file",
            NoteType::Image => "bx bx-image",
            NoteType::Code => "bx bx-code",
            NoteType::Render => "bx bx-extension",
            NoteType::Search => "bx bx-file-find",
            NoteType::RelationMap | NoteType::NoteMap => "bx bxs-network-chart",
            NoteType::Book => "bx bx-book",
            NoteType::Mermaid => "bx bx-selection",
            NoteType::Canvas => "bx bx-pen",
            NoteType::WebView => "bx bx-globe-alt",
            NoteType::Launcher => "bx bx-link",
            NoteType::Doc => "bx bxs-file-doc",
            NoteType::ContentWidget => "bx bxs-widget",
            NoteType::MindMap => "bx bx-sitemap",
            NoteType::Text => "bx bx-note",
        }
    }
}

fn default_mime() -> String {
    "text/html".to_string()
}

/// A node of the note hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default = "default_mime")]
    pub mime: String,
    /// Stored content. For protected notes this is the encrypted form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub date_modified: String,
    #[serde(default)]
    pub utc_date_created: String,
    #[serde(default)]
    pub utc_date_modified: String,
}

impl Note {
    pub fn new(note_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            note_type: NoteType::Text,
            mime: default_mime(),
            content: None,
            is_protected: false,
            date_created: String::new(),
            date_modified: String::new(),
            utc_date_created: String::new(),
            utc_date_modified: String::new(),
        }
    }

    pub fn with_type(mut self, note_type: NoteType, mime: impl Into<String>) -> Self {
        self.note_type = note_type;
        self.mime = mime.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn protected(mut self) -> Self {
        self.is_protected = true;
        self
    }

    pub fn with_dates(mut self, created: impl Into<String>, modified: impl Into<String>) -> Self {
        self.date_created = created.into();
        self.date_modified = modified.into();
        self.utc_date_created = self.date_created.clone();
        self.utc_date_modified = self.date_modified.clone();
        self
    }
}

/// Attribute flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Label,
    Relation,
}

impl AttributeType {
    /// Sigil used in queries: `#` for labels, `~` for relations.
    pub fn sigil(self) -> char {
        match self {
            AttributeType::Label => '#',
            AttributeType::Relation => '~',
        }
    }
}

/// A label or relation owned by a note. A relation's value is the target note id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub note_id: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_inheritable: bool,
    #[serde(default)]
    pub position: i64,
}

impl Attribute {
    pub fn label(note_id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            kind: AttributeType::Label,
            name: name.into(),
            value: value.into(),
            is_inheritable: false,
            position: 0,
        }
    }

    pub fn relation(note_id: impl Into<String>, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: AttributeType::Relation,
            ..Self::label(note_id, name, target)
        }
    }

    pub fn inheritable(mut self) -> Self {
        self.is_inheritable = true;
        self
    }

    pub fn is_label(&self) -> bool {
        self.kind == AttributeType::Label
    }

    pub fn is_relation(&self) -> bool {
        self.kind == AttributeType::Relation
    }
}

/// Placement of a note under a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub note_id: String,
    pub parent_note_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub note_position: i64,
}
