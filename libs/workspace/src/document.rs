//! Line-oriented asset documents
//!
//! ```text
//! // comment
//! GUID 8e5d2f0c4a1b4c3d9e8f7a6b5c4d3e2f
//! Type ItemAsset
//! ID 42
//! Health 75
//! Uniform_Scale
//! Name "Military Rifle"
//! Blueprints
//! [
//!     {
//!         Type Supply
//!         Amount 2
//!     }
//! ]
//! ```
//!
//! Each line is a `Key Value` pair, or a bare key (a flag). A key followed by
//! `{` or `[`, on the same line or the next, opens a dictionary or a list.
//! Localized text lives in a sibling `English.dat` with the same syntax.

use std::fs;
use std::path::Path;

use assetlsp_values::{Breadcrumbs, NodeValue, PropertyContext, PropertyNode, SourceFile};
use uuid::Uuid;

use crate::error::{Error, Result};

/// File holding the localized properties of the asset next to it.
pub const LOCALIZATION_FILE: &str = "English.dat";

/// Extension of asset documents.
pub const ASSET_EXTENSION: &str = "dat";

#[derive(Debug, Clone, Copy)]
struct Line<'t> {
    number: usize,
    text: &'t str,
}

struct Reader<'t> {
    lines: Vec<Line<'t>>,
    pos: usize,
}

impl<'t> Reader<'t> {
    fn new(text: &'t str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, text)| Line {
                number: i + 1,
                text: text.trim(),
            })
            .filter(|line| !line.text.is_empty() && !line.text.starts_with("//"))
            .collect();
        Self { lines, pos: 0 }
    }

    fn next(&mut self) -> Option<Line<'t>> {
        let line = self.lines.get(self.pos).copied();
        self.pos += 1;
        line
    }

    fn peek(&self) -> Option<&'t str> {
        self.lines.get(self.pos).map(|line| line.text)
    }

    /// Read properties until the `}` closing the brace opened at line `open`,
    /// or until the end of input at the root.
    fn dictionary(&mut self, open: Option<usize>) -> Result<Vec<PropertyNode>> {
        let mut nodes = Vec::new();
        loop {
            let Some(line) = self.next() else {
                return match open {
                    Some(open) => Err(Error::document(open, "'{' is never closed")),
                    None => Ok(nodes),
                };
            };
            match line.text {
                "}" if open.is_some() => return Ok(nodes),
                "{" | "}" | "[" | "]" => {
                    return Err(Error::document(
                        line.number,
                        format!("unexpected '{}'", line.text),
                    ))
                }
                _ => {
                    let (key, rest) = split_key(line.text);
                    let value = match rest {
                        Some(rest) => Some(self.value(rest, line.number)?),
                        None => match self.peek() {
                            Some(open @ ("{" | "[")) => {
                                let line = self.next().map_or(line.number, |l| l.number);
                                Some(self.value(open, line)?)
                            }
                            _ => None,
                        },
                    };
                    nodes.push(PropertyNode::new(key, value));
                }
            }
        }
    }

    /// Read list items until the `]` closing the bracket opened at line `open`.
    fn list(&mut self, open: usize) -> Result<Vec<NodeValue>> {
        let mut items = Vec::new();
        loop {
            let line = self
                .next()
                .ok_or_else(|| Error::document(open, "'[' is never closed"))?;
            match line.text {
                "]" => return Ok(items),
                "}" => return Err(Error::document(line.number, "unexpected '}'")),
                text => items.push(self.value(text, line.number)?),
            }
        }
    }

    fn value(&mut self, text: &str, line: usize) -> Result<NodeValue> {
        Ok(match text {
            "{" => NodeValue::Dictionary(self.dictionary(Some(line))?),
            "[" => NodeValue::List(self.list(line)?),
            text => literal(text),
        })
    }
}

/// Split a line into its key and the trimmed rest, if any.
fn split_key(text: &str) -> (&str, Option<&str>) {
    let (key, rest) = match text.strip_prefix('"').and_then(|t| t.split_once('"')) {
        Some((key, rest)) => (key, rest),
        None => text
            .split_once(char::is_whitespace)
            .unwrap_or((text, "")),
    };
    let rest = rest.trim();
    (key, (!rest.is_empty()).then_some(rest))
}

fn literal(text: &str) -> NodeValue {
    match text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
    {
        Some(inner) => NodeValue::Value {
            text: inner.into(),
            quoted: true,
        },
        None => NodeValue::text(text),
    }
}

/// Parse the properties of one document.
pub fn parse_nodes(text: &str) -> Result<Vec<PropertyNode>> {
    Reader::new(text).dictionary(None)
}

/// A parsed asset file and its localization.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDocument {
    asset_name: String,
    nodes: Vec<PropertyNode>,
    localization: Vec<PropertyNode>,
}

impl AssetDocument {
    pub fn parse(asset_name: impl Into<String>, text: &str) -> Result<Self> {
        Ok(Self {
            asset_name: asset_name.into(),
            nodes: parse_nodes(text)?,
            localization: Vec::new(),
        })
    }

    pub fn with_localization(mut self, text: &str) -> Result<Self> {
        self.localization = parse_nodes(text)?;
        Ok(self)
    }

    /// Read an asset file and the localization file beside it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let document = Self::parse(asset_name_for(path), text.trim_start_matches('\u{feff}'))?;

        let localization = path.with_file_name(LOCALIZATION_FILE);
        if localization.is_file() && localization != path {
            let text = fs::read_to_string(&localization)?;
            tracing::trace!(path = %localization.display(), "Read localization");
            return document.with_localization(text.trim_start_matches('\u{feff}'));
        }
        Ok(document)
    }

    pub fn nodes(&self) -> &[PropertyNode] {
        &self.nodes
    }

    pub fn localization(&self) -> &[PropertyNode] {
        &self.localization
    }

    fn root_text(&self, key: &str) -> Option<&str> {
        match &Breadcrumbs::root().find(&self.nodes, key)?.value {
            Some(NodeValue::Value { text, .. }) => Some(text.as_ref()),
            _ => None,
        }
    }

    pub fn guid(&self) -> Option<Uuid> {
        Uuid::parse_str(self.root_text("GUID")?.trim()).ok()
    }

    /// Legacy numeric id, `0` when absent.
    pub fn id(&self) -> u16 {
        self.root_text("ID")
            .and_then(|id| id.trim().parse().ok())
            .unwrap_or(0)
    }
}

impl SourceFile for AssetDocument {
    fn try_get_property(
        &self,
        key: &str,
        breadcrumbs: &Breadcrumbs,
        context: PropertyContext,
    ) -> Option<&PropertyNode> {
        match context {
            PropertyContext::Localization => breadcrumbs.find(&self.localization, key),
            PropertyContext::Unspecified => breadcrumbs
                .find(&self.nodes, key)
                .or_else(|| breadcrumbs.find(&self.localization, key)),
            PropertyContext::Property | PropertyContext::BundleAsset => {
                breadcrumbs.find(&self.nodes, key)
            }
        }
    }

    fn type_name(&self) -> Option<&str> {
        self.root_text("Type").map(str::trim)
    }

    fn asset_name(&self) -> Option<&str> {
        Some(self.asset_name.as_str())
    }
}

/// Asset name of a file: its stem, or its folder's name for `Asset.dat`.
pub fn asset_name_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.eq_ignore_ascii_case("Asset") {
        if let Some(folder) = path.parent().and_then(Path::file_name) {
            return folder.to_string_lossy().into_owned();
        }
    }
    stem
}
