//! Descriptor document walk.
//!
//! Custom SQL lives in two places in a `.tds` document:
//! - `<relation type="text">` elements below a `<connection>` carry query text
//! - `<named-connection>` elements wrap a `<connection>` whose `one-time-sql`
//!   attribute holds initial SQL run once per session
//!
//! Element names are matched on their local name; the document has no
//! default namespace.

use roxmltree::{Document, Node};
use tracing::debug;

use crate::extract::error::ExtractError;

const CONNECTION: &str = "connection";
const RELATION: &str = "relation";
const NAMED_CONNECTION: &str = "named-connection";

const CLASS_ATTR: &str = "class";
const TYPE_ATTR: &str = "type";
const NAME_ATTR: &str = "name";
const ONE_TIME_SQL_ATTR: &str = "one-time-sql";

const CUSTOM_SQL_TYPE: &str = "text";
const UNNAMED: &str = "unnamed";

/// Where a piece of SQL was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlKind {
    /// Text of a `type="text"` relation
    CustomSql,
    /// `one-time-sql` attribute of a named connection
    InitialSql,
}

/// SQL located in one document, labelled but not yet deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundSql {
    pub label: String,
    pub sql: String,
    pub kind: SqlKind,
}

/// Parses `text` as XML and returns every SQL query it carries, in order.
///
/// # Errors
///
/// Returns [`ExtractError::MalformedDocument`] if `text` is not well-formed XML.
pub fn parse_descriptor(
    source_name: &str,
    document_name: &str,
    text: &str,
) -> Result<Vec<FoundSql>, ExtractError> {
    let doc = Document::parse(text)
        .map_err(|e| ExtractError::malformed(source_name, document_name, e))?;
    Ok(scan_document(&doc))
}

/// Walks a parsed descriptor.
///
/// Custom SQL from all connections comes first (in connection order),
/// followed by initial SQL from all named connections.
pub fn scan_document(doc: &Document<'_>) -> Vec<FoundSql> {
    let root = doc.root_element();
    let mut found = Vec::new();

    for (index, connection) in descendants_named(root, CONNECTION).enumerate() {
        let display_name = connection_display_name(connection, index + 1);
        collect_custom_sql(connection, &display_name, &mut found);
    }

    found.extend(descendants_named(root, NAMED_CONNECTION).filter_map(initial_sql));
    found
}

/// Strict descendants of `node` with the given local name, in document order.
fn descendants_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .filter(move |candidate| candidate.has_tag_name(tag))
}

/// `class` attribute, or `connection_<position>` when missing or empty.
fn connection_display_name(connection: Node<'_, '_>, position: usize) -> String {
    match connection.attribute(CLASS_ATTR) {
        Some(class) if !class.is_empty() => class.to_string(),
        _ => format!("connection_{position}"),
    }
}

fn collect_custom_sql(connection: Node<'_, '_>, display_name: &str, found: &mut Vec<FoundSql>) {
    let queries: Vec<&str> = descendants_named(connection, RELATION)
        .filter(|relation| relation.attribute(TYPE_ATTR) == Some(CUSTOM_SQL_TYPE))
        .filter_map(|relation| {
            let sql = relation.text().map(str::trim).unwrap_or_default();
            if sql.is_empty() {
                debug!(
                    connection = display_name,
                    relation = relation.attribute(NAME_ATTR).unwrap_or_default(),
                    "Skipping empty custom SQL relation"
                );
                None
            } else {
                Some(sql)
            }
        })
        .collect();

    if let [sql] = queries.as_slice() {
        found.push(FoundSql {
            label: display_name.to_string(),
            sql: sql.to_string(),
            kind: SqlKind::CustomSql,
        });
        return;
    }

    found.extend(queries.iter().enumerate().map(|(index, sql)| FoundSql {
        label: format!("{display_name}_query_{}", index + 1),
        sql: sql.to_string(),
        kind: SqlKind::CustomSql,
    }));
}

fn initial_sql(named: Node<'_, '_>) -> Option<FoundSql> {
    let name = named.attribute(NAME_ATTR).unwrap_or(UNNAMED);
    let connection = descendants_named(named, CONNECTION).next()?;
    let sql = connection.attribute(ONE_TIME_SQL_ATTR)?.trim();

    if sql.is_empty() {
        return None;
    }

    Some(FoundSql {
        label: format!("{name}_initial_sql"),
        sql: sql.to_string(),
        kind: SqlKind::InitialSql,
    })
}
