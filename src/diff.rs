//! Template comparison
//!
//! Compares a freshly synthesized template against one already on disk, both
//! per resource (added, removed, modified by logical id) and as a colorized
//! unified text diff of the rendered documents.

use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, DiffOp, TextDiff};

use crate::template::Template;

/// Kind of change to a resource or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// Single-character marker used in listings
    pub fn marker(self) -> &'static str {
        match self {
            ChangeKind::Added => "+",
            ChangeKind::Removed => "-",
            ChangeKind::Modified => "~",
        }
    }
}

/// A changed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceChange {
    pub logical_id: String,
    pub resource_type: String,
    pub kind: ChangeKind,
    /// Top-level property names that differ, for modified resources
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_properties: Vec<String>,
}

/// Resource-level differences between two templates
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateDiff {
    pub added: Vec<ResourceChange>,
    pub removed: Vec<ResourceChange>,
    pub modified: Vec<ResourceChange>,
    /// Output logical ids whose presence or value changed
    pub outputs_changed: Vec<String>,
}

impl TemplateDiff {
    /// Compare `old` (existing) against `new` (synthesized).
    ///
    /// A resource is modified when its type, properties or `DependsOn`
    /// differ. Metadata is ignored.
    pub fn compute(old: &Template, new: &Template) -> Self {
        let mut diff = Self::default();

        for (id, resource) in &new.resources {
            match old.resources.get(id) {
                None => diff.added.push(ResourceChange {
                    logical_id: id.clone(),
                    resource_type: resource.resource_type.clone(),
                    kind: ChangeKind::Added,
                    changed_properties: Vec::new(),
                }),
                Some(previous) => {
                    let mut changed: Vec<String> = Vec::new();
                    if previous.resource_type != resource.resource_type {
                        changed.push("Type".to_string());
                    }
                    for (key, value) in &resource.properties {
                        if previous.properties.get(key) != Some(value) {
                            changed.push(key.clone());
                        }
                    }
                    for key in previous.properties.keys() {
                        if !resource.properties.contains_key(key) {
                            changed.push(key.clone());
                        }
                    }
                    if previous.depends_on != resource.depends_on {
                        changed.push("DependsOn".to_string());
                    }
                    if !changed.is_empty() {
                        diff.modified.push(ResourceChange {
                            logical_id: id.clone(),
                            resource_type: resource.resource_type.clone(),
                            kind: ChangeKind::Modified,
                            changed_properties: changed,
                        });
                    }
                }
            }
        }

        for (id, resource) in &old.resources {
            if !new.resources.contains_key(id) {
                diff.removed.push(ResourceChange {
                    logical_id: id.clone(),
                    resource_type: resource.resource_type.clone(),
                    kind: ChangeKind::Removed,
                    changed_properties: Vec::new(),
                });
            }
        }

        for (id, output) in &new.outputs {
            if old.outputs.get(id) != Some(output) {
                diff.outputs_changed.push(id.clone());
            }
        }
        for id in old.outputs.keys() {
            if !new.outputs.contains_key(id) {
                diff.outputs_changed.push(id.clone());
            }
        }

        diff
    }

    /// Check if there are any differences
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || !self.modified.is_empty()
            || !self.outputs_changed.is_empty()
    }

    /// All resource changes: added, then removed, then modified
    pub fn changes(&self) -> impl Iterator<Item = &ResourceChange> {
        self.added
            .iter()
            .chain(self.removed.iter())
            .chain(self.modified.iter())
    }

    /// Format the counts, e.g. `+2, -1, ~3`
    pub fn summary(&self, use_color: bool) -> String {
        let mut parts = Vec::new();

        if !self.added.is_empty() {
            let s = format!("+{}", self.added.len());
            parts.push(if use_color { s.green().to_string() } else { s });
        }

        if !self.removed.is_empty() {
            let s = format!("-{}", self.removed.len());
            parts.push(if use_color { s.red().to_string() } else { s });
        }

        if !self.modified.is_empty() {
            let s = format!("~{}", self.modified.len());
            parts.push(if use_color { s.yellow().to_string() } else { s });
        }

        if parts.is_empty() {
            "no resource changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Text diff display options
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Number of context lines to show
    pub context_lines: usize,
    /// Use colors
    pub use_color: bool,
    /// Label of the existing document
    pub old_name: String,
    /// Label of the synthesized document
    pub new_name: String,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            use_color: true,
            old_name: "existing".to_string(),
            new_name: "synthesized".to_string(),
        }
    }
}

/// Hunk ranges as (old_start, old_len, new_start, new_len), 1-based
fn hunk_ranges(ops: &[DiffOp]) -> (usize, usize, usize, usize) {
    let (Some(first), Some(last)) = (ops.first(), ops.last()) else {
        return (1, 0, 1, 0);
    };
    let old_start = first.old_range().start;
    let new_start = first.new_range().start;
    let old_len = last.old_range().end.saturating_sub(old_start);
    let new_len = last.new_range().end.saturating_sub(new_start);
    (old_start + 1, old_len, new_start + 1, new_len)
}

/// Unified line diff between two rendered documents.
///
/// Returns an empty string when the documents are identical.
pub fn render_text_diff(old: &str, new: &str, options: &DiffOptions) -> String {
    if old == new {
        return String::new();
    }
    let diff = TextDiff::from_lines(old, new);

    let paint = |text: String, tag: Option<ChangeTag>| -> String {
        if !options.use_color {
            return text;
        }
        match tag {
            Some(ChangeTag::Delete) => text.red().to_string(),
            Some(ChangeTag::Insert) => text.green().to_string(),
            Some(ChangeTag::Equal) => text.dimmed().to_string(),
            None => text.cyan().to_string(),
        }
    };

    let mut output = String::new();
    output.push_str(&paint(
        format!("--- {}", options.old_name),
        Some(ChangeTag::Delete),
    ));
    output.push('\n');
    output.push_str(&paint(
        format!("+++ {}", options.new_name),
        Some(ChangeTag::Insert),
    ));
    output.push('\n');

    for hunk in diff
        .unified_diff()
        .context_radius(options.context_lines)
        .iter_hunks()
    {
        let (old_start, old_len, new_start, new_len) = hunk_ranges(hunk.ops());
        output.push_str(&paint(
            format!("@@ -{},{} +{},{} @@", old_start, old_len, new_start, new_len),
            None,
        ));
        output.push('\n');

        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            let line = change.value().trim_end_matches('\n');
            output.push_str(&paint(format!("{sign}{line}"), Some(change.tag())));
            output.push('\n');
            if change.missing_newline() {
                output.push_str("\\ No newline at end of file\n");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Resource;
    use pretty_assertions::assert_eq;

    fn template(entries: &[(&str, &str)]) -> Template {
        let mut template = Template::new(None);
        for (name, cidr) in entries {
            template
                .add_resource(name, Resource::new("AWS::EC2::Subnet").property("CidrBlock", *cidr))
                .unwrap();
        }
        template
    }

    #[test]
    fn test_identical_templates() {
        let a = template(&[("a", "10.0.1.0/24")]);
        let diff = TemplateDiff::compute(&a, &a.clone());
        assert!(!diff.has_changes());
        assert_eq!(diff.summary(false), "no resource changes");
    }

    #[test]
    fn test_added_removed_modified() {
        let old = template(&[("a", "10.0.1.0/24"), ("b", "10.0.2.0/24")]);
        let new = template(&[("a", "10.0.9.0/24"), ("c", "10.0.3.0/24")]);
        let diff = TemplateDiff::compute(&old, &new);

        assert!(diff.has_changes());
        assert_eq!(diff.added[0].logical_id, "C");
        assert_eq!(diff.removed[0].logical_id, "B");
        assert_eq!(diff.modified[0].logical_id, "A");
        assert_eq!(diff.modified[0].changed_properties, vec!["CidrBlock"]);
        assert_eq!(diff.summary(false), "+1, -1, ~1");
        assert_eq!(
            diff.changes().map(|c| c.kind.marker()).collect::<Vec<_>>(),
            vec!["+", "-", "~"]
        );
    }

    #[test]
    fn test_metadata_is_ignored() {
        let old = template(&[("a", "10.0.1.0/24")]);
        let mut new = old.clone();
        if let Some(resource) = new.resources.get_mut("A") {
            resource.metadata.insert("note".into(), "x".into());
        }
        assert!(!TemplateDiff::compute(&old, &new).has_changes());
    }

    #[test]
    fn test_render_text_diff_plain() {
        let options = DiffOptions {
            use_color: false,
            ..DiffOptions::default()
        };
        let out = render_text_diff("a\nb\nc\n", "a\nx\nc\n", &options);
        assert!(out.starts_with("--- existing\n+++ synthesized\n"));
        assert!(out.contains("@@ -1,3 +1,3 @@"));
        assert!(out.contains("-b\n"));
        assert!(out.contains("+x\n"));
        assert!(out.contains(" a\n"));
    }

    #[test]
    fn test_render_text_diff_identical_is_empty() {
        assert!(render_text_diff("same\n", "same\n", &DiffOptions::default()).is_empty());
    }
}
