//! Root TypeScript configuration handling.
//!
//! Reads the workspace `tsconfig.base.json` (or `tsconfig.json`), exposes its
//! `compilerOptions.paths` alias table, and rewrites the entry of a relocated
//! project. The entry is changed with text edits against the original
//! document, so comments, formatting, and every other field are written back
//! byte for byte.

use crate::edit::{TextEdit, apply_changes};
use crate::error::{RelocateError, Result};
use crate::jsonc::{self, Member};
use crate::resolver::AliasPair;
use crate::workspace::Tree;
use serde_json::{Map, Value};
use std::ops::Range;
use std::path::{Component, Path};

/// Candidate root configuration files, in order of preference.
pub const ROOT_TSCONFIG_CANDIDATES: [&str; 2] = ["tsconfig.base.json", "tsconfig.json"];

/// Returns the root TypeScript configuration path, if one exists.
pub fn root_tsconfig_path<T: Tree + ?Sized>(tree: &T) -> Option<&'static str> {
    ROOT_TSCONFIG_CANDIDATES
        .into_iter()
        .find(|candidate| tree.exists(candidate))
}

/// A configuration document: its path, original text, and parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct TsConfigDocument {
    path: String,
    text: String,
    value: Value,
}

impl TsConfigDocument {
    /// Wraps an in-memory value; its text is the pretty-printed value.
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            text: format!("{:#}\n", value),
            value,
        }
    }

    /// Reads and parses `path`, tolerating comments and trailing commas.
    pub fn load<T: Tree + ?Sized>(tree: &T, path: &str) -> Result<Self> {
        let text = tree.read(path)?;
        let body = text.strip_prefix('\u{feff}').unwrap_or(&text);
        let value = serde_json::from_str(&to_strict_json(body)).map_err(|source| {
            RelocateError::Json {
                path: path.to_string(),
                source,
            }
        })?;
        Ok(Self {
            path: path.to_string(),
            text,
            value,
        })
    }

    /// Writes the document text back to its path.
    pub fn save<T: Tree + ?Sized>(&self, tree: &mut T) -> Result<()> {
        tree.write(&self.path, self.text.clone());
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The `compilerOptions.paths` table, if present.
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.value.get("compilerOptions")?.get("paths")?.as_object()
    }

    fn paths_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.value
            .get_mut("compilerOptions")?
            .get_mut("paths")?
            .as_object_mut()
    }

    /// Re-bases the alias entry of a relocated project.
    ///
    /// Every candidate path under `pair.from` is made relative to `old_root`
    /// and joined onto `new_root`. With `rename` the entry moves to
    /// `pair.to` in the position `pair.from` held, `pair.from` is removed,
    /// and any existing `pair.to` entry is dropped; otherwise the entry is
    /// overwritten in place. Fails without modifying the document if the
    /// table or the entry is missing.
    pub fn update_path_mapping(
        &mut self,
        pair: &AliasPair,
        rename: bool,
        old_root: &str,
        new_root: &str,
    ) -> Result<()> {
        let rebased: Vec<Value> = self
            .paths()
            .ok_or_else(|| self.missing_table(pair))?
            .get(&pair.from)
            .and_then(Value::as_array)
            .ok_or_else(|| self.missing_alias(pair))?
            .iter()
            .map(|candidate| match candidate.as_str() {
                Some(path) => Value::String(rebase_path(path, old_root, new_root)),
                None => candidate.clone(),
            })
            .collect();
        let rename = rename && pair.is_rename();

        tracing::debug!(alias = %pair.from, paths = ?rebased, "re-based path mapping");

        let edits = self.mapping_edits(pair, rename, &rebased)?;
        let text = apply_changes(&self.text, &edits)?;

        let missing = self.missing_table(pair);
        let paths = self.paths_mut().ok_or(missing)?;
        if rename {
            let previous = std::mem::take(paths);
            let mut rebased = Some(rebased);
            for (key, value) in previous {
                if key == pair.from {
                    if let Some(list) = rebased.take() {
                        paths.insert(pair.to.clone(), Value::Array(list));
                    }
                } else if key != pair.to {
                    paths.insert(key, value);
                }
            }
        } else {
            paths.insert(pair.from.clone(), Value::Array(rebased));
        }

        self.text = text;
        Ok(())
    }

    /// Text edits that apply the mapping update to the original document.
    fn mapping_edits(
        &self,
        pair: &AliasPair,
        rename: bool,
        rebased: &[Value],
    ) -> Result<Vec<TextEdit>> {
        let unlocated = || {
            RelocateError::InvalidEdit(format!(
                "unable to locate \"{}\" in {}",
                pair.from, self.path
            ))
        };
        let root = jsonc::parse(&self.text).ok_or_else(unlocated)?;
        let members = root
            .get("compilerOptions")
            .and_then(|options| options.get("paths"))
            .ok_or_else(unlocated)?
            .members();
        let entry = members
            .iter()
            .rposition(|m| m.key == pair.from)
            .map(|index| &members[index])
            .ok_or_else(unlocated)?;

        let mut edits = Vec::new();
        for (element, candidate) in entry.value.elements().iter().zip(rebased) {
            let Value::String(candidate) = candidate else {
                continue;
            };
            if !element.is_string(&self.text) {
                continue;
            }
            let literal = self.literal(candidate)?;
            if self.text[element.span.clone()] != literal {
                edits.extend(replace(element.span.clone(), literal));
            }
        }

        if rename {
            edits.extend(replace(entry.key_span.clone(), self.literal(&pair.to)?));
            for (index, member) in members.iter().enumerate() {
                if member.key == pair.to {
                    edits.push(removal(members, index));
                }
            }
        }

        Ok(edits)
    }

    fn literal(&self, value: &str) -> Result<String> {
        serde_json::to_string(value).map_err(|source| RelocateError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn missing_table(&self, pair: &AliasPair) -> RelocateError {
        RelocateError::MissingPathsTable {
            alias: pair.from.clone(),
            config: self.path.clone(),
        }
    }

    fn missing_alias(&self, pair: &AliasPair) -> RelocateError {
        RelocateError::MissingAlias {
            alias: pair.from.clone(),
            config: self.path.clone(),
        }
    }
}

fn replace(span: Range<usize>, text: String) -> [TextEdit; 2] {
    [
        TextEdit::Delete {
            start: span.start,
            length: span.len(),
        },
        TextEdit::Insert {
            index: span.start,
            text,
        },
    ]
}

// Removes a member along with the separator that ties it to its neighbour:
// up to the next key, or back to the previous value for the last member.
fn removal(members: &[Member], index: usize) -> TextEdit {
    let member = &members[index];
    let (start, end) = match (members.get(index + 1), index.checked_sub(1)) {
        (Some(next), _) => (member.key_span.start, next.key_span.start),
        (None, Some(previous)) => (members[previous].value.span.end, member.value.span.end),
        (None, None) => (member.key_span.start, member.value.span.end),
    };
    TextEdit::Delete {
        start,
        length: end - start,
    }
}

/// Moves `candidate` from under `old_root` to under `new_root`.
///
/// `libs/a/src/index.ts` with roots `libs/a` -> `libs/b` becomes
/// `libs/b/src/index.ts`. Candidates outside `old_root` keep their position
/// relative to it.
pub fn rebase_path(candidate: &str, old_root: &str, new_root: &str) -> String {
    let relative = pathdiff::diff_paths(candidate, old_root)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| candidate.to_string());
    join_path_fragments(&[new_root, &relative])
}

/// Joins fragments with `/`, folding `.` and `..` segments lexically.
pub fn join_path_fragments(fragments: &[&str]) -> String {
    let mut segments: Vec<String> = Vec::new();

    for fragment in fragments {
        let normalized = fragment.replace('\\', "/");
        for component in Path::new(&normalized).components() {
            match component {
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    if segments.last().is_some_and(|s| s != "..") {
                        segments.pop();
                    } else {
                        segments.push("..".to_string());
                    }
                }
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            }
        }
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Converts JSON-with-comments into strict JSON.
///
/// Drops `//` and `/* */` comments and trailing commas outside of strings.
/// Newlines inside comments are kept so error positions stay meaningful.
pub fn to_strict_json(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            result.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                result.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        result.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => result.push(ch),
        }
    }

    strip_trailing_commas(&result)
}

fn strip_trailing_commas(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut result = String::with_capacity(content.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(ch);
    }

    result
}
