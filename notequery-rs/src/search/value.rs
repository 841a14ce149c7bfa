//! Note property values and property paths (`note.relations.author.title`).

use crate::graph::{Attribute, AttributeType, Note, NoteGraph, NoteSizeStats};

/// Properties usable as `note.<name>`.
pub const PROPERTIES: &[&str] = &[
    "noteId",
    "title",
    "type",
    "mime",
    "isProtected",
    "isArchived",
    "dateCreated",
    "dateModified",
    "utcDateCreated",
    "utcDateModified",
    "parentCount",
    "childrenCount",
    "attributeCount",
    "labelCount",
    "ownedLabelCount",
    "relationCount",
    "relationCountIncludingLinks",
    "ownedRelationCount",
    "ownedRelationCountIncludingLinks",
    "ownedAttributeCount",
    "targetRelationCount",
    "targetRelationCountIncludingLinks",
    "contentSize",
    "contentAndAttachmentsSize",
    "contentAndAttachmentsAndRevisionsSize",
    "revisionCount",
];

/// Properties computed from blob statistics.
pub const DB_LOAD_PROPERTIES: &[&str] = &[
    "contentSize",
    "contentAndAttachmentsSize",
    "contentAndAttachmentsAndRevisionsSize",
    "revisionCount",
];

/// Relations created automatically from links in note content.
const LINK_RELATIONS: &[&str] = &["internalLink", "imageLink", "includeNoteLink", "relationMapLink"];

/// Canonical name of a property, looked up case-insensitively.
pub fn property_name(name: &str) -> Option<&'static str> {
    PROPERTIES.iter().copied().find(|p| p.eq_ignore_ascii_case(name))
}

pub fn needs_db_load(property: &str) -> bool {
    DB_LOAD_PROPERTIES.iter().any(|p| p.eq_ignore_ascii_case(property))
}

pub(crate) fn is_link(attr: &Attribute) -> bool {
    attr.kind == AttributeType::Relation && LINK_RELATIONS.contains(&attr.name.as_str())
}

fn count_relations<'a>(attrs: impl IntoIterator<Item = &'a Attribute>, include_links: bool) -> usize {
    attrs
        .into_iter()
        .filter(|a| a.is_relation() && (include_links || !is_link(a)))
        .count()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_lowercase())
}

/// Lowercased value of a note property. `None` for unknown properties and
/// for values the note does not have (unset dates, missing statistics).
pub fn property_value(
    graph: &NoteGraph,
    note: &Note,
    property: &str,
    stats: Option<&NoteSizeStats>,
) -> Option<String> {
    let id = note.note_id.as_str();
    let sizes = || stats.and_then(|s| s.get(id));

    let value = match property_name(property)? {
        "noteId" => note.note_id.to_lowercase(),
        "title" => note.title.to_lowercase(),
        "type" => note.note_type.as_str().to_lowercase(),
        "mime" => note.mime.to_lowercase(),
        "isProtected" => note.is_protected.to_string(),
        "isArchived" => graph.is_archived(id).to_string(),
        "dateCreated" => return non_empty(&note.date_created),
        "dateModified" => return non_empty(&note.date_modified),
        "utcDateCreated" => return non_empty(&note.utc_date_created),
        "utcDateModified" => return non_empty(&note.utc_date_modified),
        "parentCount" => graph.parent_branches(id).len().to_string(),
        "childrenCount" => graph.child_notes(id).len().to_string(),
        "attributeCount" => graph.attributes(id).len().to_string(),
        "labelCount" => graph.labels(id).len().to_string(),
        "ownedLabelCount" => graph
            .owned_attributes(id)
            .iter()
            .filter(|a| a.is_label())
            .count()
            .to_string(),
        "relationCount" => count_relations(graph.attributes(id), false).to_string(),
        "relationCountIncludingLinks" => count_relations(graph.attributes(id), true).to_string(),
        "ownedRelationCount" => count_relations(graph.owned_attributes(id), false).to_string(),
        "ownedRelationCountIncludingLinks" => {
            count_relations(graph.owned_attributes(id), true).to_string()
        }
        "ownedAttributeCount" => graph.owned_attributes(id).len().to_string(),
        "targetRelationCount" => count_relations(graph.target_relations(id), false).to_string(),
        "targetRelationCountIncludingLinks" => {
            count_relations(graph.target_relations(id), true).to_string()
        }
        "contentSize" => sizes()?.content_size.to_string(),
        "contentAndAttachmentsSize" => sizes()?.content_and_attachments_size.to_string(),
        "contentAndAttachmentsAndRevisionsSize" => {
            sizes()?.content_and_attachments_and_revisions_size.to_string()
        }
        "revisionCount" => sizes()?.revision_count.to_string(),
        _ => return None,
    };
    Some(value)
}

/// A property path starting at `note`, used by `orderBy`.
///
/// `#name` is shorthand for `note.labels.name`, `~name` for `note.relations.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueExtractor {
    path: Vec<String>,
}

impl ValueExtractor {
    pub fn new(path: &[String]) -> Self {
        let path: Vec<String> = path.iter().map(|p| p.to_lowercase()).collect();
        let shorthand = path.first().and_then(|first| {
            if let Some(name) = first.strip_prefix('#') {
                Some(("labels", name.to_string()))
            } else {
                first.strip_prefix('~').map(|name| ("relations", name.to_string()))
            }
        });
        let path = match shorthand {
            Some((kind, name)) => ["note".to_string(), kind.to_string(), name]
                .into_iter()
                .chain(path.into_iter().skip(1))
                .collect(),
            None => path,
        };
        Self { path }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Describe what is wrong with the path, if anything.
    pub fn validate(&self) -> Option<String> {
        match self.path.first() {
            Some(first) if first == "note" => {}
            Some(first) => {
                return Some(format!(
                    "property specifier must start with 'note', but starts with '{}'",
                    first
                ));
            }
            None => return Some("property specifier is empty".to_string()),
        }

        let len = self.path.len();
        if len == 1 {
            return Some("property specifier 'note' must be followed by a property".to_string());
        }
        let mut i = 1;
        while i < len {
            let element = self.path[i].as_str();
            match element {
                "labels" => {
                    if i != len - 2 {
                        return Some(format!("{} must be the last but one element", element));
                    }
                    return None;
                }
                "relations" => {
                    if i + 2 >= len {
                        return Some(format!(
                            "{} must be the third to last element or further up",
                            element
                        ));
                    }
                    i += 2;
                }
                "parents" | "children" => {
                    if i == len - 1 {
                        return Some(format!("{} can't be the last element", element));
                    }
                    i += 1;
                }
                _ => {
                    if property_name(element).is_none() {
                        return Some(format!("Unrecognized property '{}'", element));
                    }
                    if i != len - 1 {
                        return Some(format!("{} must be the last element", element));
                    }
                    i += 1;
                }
            }
        }
        None
    }

    /// Whether any step reads blob statistics.
    pub fn needs_db_load(&self) -> bool {
        self.path.last().is_some_and(|p| needs_db_load(p))
    }

    /// Walk the path from `note`. Values are lowercased.
    pub fn extract(
        &self,
        graph: &NoteGraph,
        note: &Note,
        stats: Option<&NoteSizeStats>,
    ) -> Option<String> {
        let mut cursor = note;
        let mut i = 1;
        while i < self.path.len() {
            let element = self.path[i].as_str();
            match element {
                "labels" => {
                    let name = self.path.get(i + 1)?;
                    return graph.label_value(&cursor.note_id, name).map(str::to_lowercase);
                }
                "relations" => {
                    let name = self.path.get(i + 1)?;
                    cursor = graph.relation_target(&cursor.note_id, name)?;
                    i += 2;
                }
                "parents" => {
                    cursor = graph.parent_notes(&cursor.note_id).into_iter().next()?;
                    i += 1;
                }
                "children" => {
                    cursor = graph.child_notes(&cursor.note_id).into_iter().next()?;
                    i += 1;
                }
                _ => return property_value(graph, cursor, element, stats),
            }
        }
        None
    }
}
