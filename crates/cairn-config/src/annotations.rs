//! Doc comments for generated TOML files.
//!
//! `config.toml` and `hooks.toml` are written with the documentation of the structs
//! they hold placed above the matching tables and keys.

use documented::{Documented, DocumentedFields};
use toml_edit::{ArrayOfTables, Decor, Item, RawString, Table};
use tracing::trace;

fn comment_lines(docs: &str) -> String {
    docs.lines()
        .map(|line| {
            match line.trim_end() {
                "" => "#\n".to_string(),
                line => format!("# {line}\n"),
            }
        })
        .collect()
}

/// Adds `docs` as comment lines above whatever `decor` belongs to.
///
/// A comment already present stays first, separated by a bare `#` line.
fn add_comment(decor: &mut Decor, docs: &str) {
    let comments = comment_lines(docs);

    let prefix = match decor.prefix().and_then(RawString::as_str) {
        Some(existing)
            if existing
                .lines()
                .last()
                .is_some_and(|line| !line.trim().is_empty()) =>
        {
            format!("{existing}#\n{comments}")
        }
        Some(existing) => format!("{existing}{comments}"),
        None => comments,
    };
    decor.set_prefix(prefix);
}

/// Docs of the field serialized as `key`.
///
/// Falls back to a case-insensitive match so `rename_all = "PascalCase"` keys still find
/// their field.
fn field_docs<T: DocumentedFields>(key: &str) -> Option<&'static str> {
    T::get_field_docs(key).ok().or_else(|| {
        T::FIELD_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(key))
            .and_then(|index| T::FIELD_DOCS.get(index).copied())
    })
}

/// Comments every key of `table` with the docs of the matching field of `T`.
///
/// Sub-tables get the comment on their header; arrays of tables on their first entry.
pub fn annotate_fields<T: DocumentedFields>(table: &mut Table) {
    for (mut key, item) in table.iter_mut() {
        let Some(docs) = field_docs::<T>(key.get()) else {
            trace!(key = key.get(), "no docs for key");
            continue;
        };

        match item {
            Item::Value(_) => add_comment(key.leaf_decor_mut(), docs),
            Item::Table(sub_table) => add_comment(sub_table.decor_mut(), docs),
            Item::ArrayOfTables(array) => {
                if let Some(first) = array.iter_mut().next() {
                    add_comment(first.decor_mut(), docs);
                }
            }
            Item::None => {}
        }
    }
}

/// Comments a table holding one `T`: the type's docs on the header, field docs on the
/// keys.
pub fn annotate_entry<T: Documented + DocumentedFields>(table: &mut Table) {
    add_comment(table.decor_mut(), T::DOCS);
    annotate_fields::<T>(table);
}

/// Annotates the first entry of `array`. Later entries share its layout and stay bare.
pub fn annotate_first_entry<T: Documented + DocumentedFields>(array: &mut ArrayOfTables) {
    if let Some(first) = array.iter_mut().next() {
        annotate_entry::<T>(first);
    }
}

#[cfg(test)]
mod tests {
    use toml_edit::{value, DocumentMut};

    use super::*;
    use crate::{config::Config, remote::RemoteSource, settings::HookSettings};

    fn prefix(decor: &Decor) -> &str {
        decor.prefix().and_then(RawString::as_str).unwrap()
    }

    #[test]
    fn test_comment_lines_keeps_paragraphs() {
        assert_eq!(comment_lines("One\n\nTwo"), "# One\n#\n# Two\n");
    }

    #[test]
    fn test_add_comment_after_existing_comment() {
        let mut decor = Decor::new("# kept\n", "");
        add_comment(&mut decor, "Added");
        assert_eq!(prefix(&decor), "# kept\n#\n# Added\n");
    }

    #[test]
    fn test_add_comment_after_blank_line() {
        let mut decor = Decor::new("\n", "");
        add_comment(&mut decor, "Added");
        assert_eq!(prefix(&decor), "\n# Added\n");
    }

    #[test]
    fn test_pascal_case_keys_find_their_field() {
        assert!(field_docs::<HookSettings>("Target").is_some());
        assert_eq!(
            field_docs::<HookSettings>("Target"),
            field_docs::<HookSettings>("target")
        );
        assert!(field_docs::<HookSettings>("Unknown").is_none());
    }

    #[test]
    fn test_annotate_entry_hook_record() {
        let mut table = Table::new();
        table.insert("Active", value("true"));
        table.insert("Target", value("game.exe"));
        table.insert("Extra", value("x"));

        annotate_entry::<HookSettings>(&mut table);

        assert!(prefix(table.decor()).starts_with("# A hook settings record."));
        let mut doc = DocumentMut::new();
        doc.insert("hook", Item::Table(table));
        let rendered = doc.to_string();
        assert!(rendered.contains("# Whether the hook is applied"));
        assert!(rendered.contains("\nExtra = \"x\""));
    }

    #[test]
    fn test_config_document_is_commented() {
        let config = Config::default_config(&["https://example.org/remote.xml"]);
        let doc = config.to_annotated_document().unwrap().to_string();

        assert!(doc.contains("# How long a single fetch may take"));
        assert!(doc.contains("# Defines a remote source that publishes a remote manifest."));
        assert!(doc.contains("# URI of the remote manifest"));
    }

    #[test]
    fn test_annotate_first_entry_only() {
        let mut array = ArrayOfTables::new();
        annotate_first_entry::<RemoteSource>(&mut array);
        assert!(array.is_empty());

        for uri in ["https://a/r.xml", "https://b/r.xml"] {
            let mut table = Table::new();
            table.insert("uri", value(uri));
            array.push(table);
        }
        annotate_first_entry::<RemoteSource>(&mut array);

        let mut entries = array.iter();
        assert!(entries.next().unwrap().decor().prefix().is_some());
        assert!(entries.next().unwrap().decor().prefix().is_none());
    }
}
