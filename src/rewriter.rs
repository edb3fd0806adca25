//! Module specifier rewriting.
//!
//! Decides whether a reference site names the old alias (exactly, or as the
//! package part of a deep import) and produces the delete/insert pair that
//! swaps in the new alias. Edits target the interior of the string literal
//! only, so quotes and everything around them stay byte-identical.

use crate::edit::{TextEdit, apply_changes};
use crate::error::Result;
use crate::resolver::AliasPair;
use crate::scanner::{ReferenceSite, Scanner, SiteKind};
use regex::{NoExpand, Regex};
use serde::Serialize;

/// How the alias is substituted inside a matched specifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// Replace only the leading alias span.
    #[default]
    Prefix,
    /// Replace every occurrence of the alias text in the specifier.
    Everywhere,
}

/// One specifier rewritten in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecifierChange {
    pub kind: SiteKind,
    pub before: String,
    pub after: String,
}

/// The result of rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRewrite {
    pub content: String,
    pub changes: Vec<SpecifierChange>,
}

/// Rewrites references to one alias.
#[derive(Debug, Clone)]
pub struct AliasRewriter {
    pair: AliasPair,
    pattern: Regex,
    strategy: ReplaceStrategy,
}

impl AliasRewriter {
    /// Builds a rewriter for `pair`. The alias is escaped before it is
    /// compiled, so regex metacharacters in it match literally.
    pub fn new(pair: AliasPair, strategy: ReplaceStrategy) -> Result<Self> {
        let pattern = Regex::new(&regex::escape(&pair.from))?;
        Ok(Self {
            pair,
            pattern,
            strategy,
        })
    }

    /// Cheap whole-text test run before a file is parsed.
    pub fn mentions_alias(&self, contents: &str) -> bool {
        self.pattern.is_match(contents)
    }

    /// True if `specifier` is the alias itself or a subpath of it.
    ///
    /// `@x/lib` and `@x/lib/deep` match `@x/lib`; `@x/lib-extra` does not.
    pub fn matches(&self, specifier: &str) -> bool {
        let from = self.pair.from.as_str();
        specifier == from
            || specifier
                .strip_prefix(from)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// The specifier with the alias substituted per the configured strategy.
    pub fn rewrite_specifier(&self, specifier: &str) -> String {
        match self.strategy {
            ReplaceStrategy::Prefix => match specifier.strip_prefix(self.pair.from.as_str()) {
                Some(rest) => format!("{}{}", self.pair.to, rest),
                None => specifier.to_string(),
            },
            ReplaceStrategy::Everywhere => self
                .pattern
                .replace_all(specifier, NoExpand(&self.pair.to))
                .into_owned(),
        }
    }

    /// Edits for one site: empty if it does not reference the alias,
    /// otherwise a deletion of the literal interior and an insertion of
    /// the rewritten text at the same offset.
    pub fn edits_for(&self, site: &ReferenceSite) -> Vec<TextEdit> {
        if !self.matches(&site.specifier_text) {
            return Vec::new();
        }

        vec![
            TextEdit::Delete {
                start: site.specifier_start,
                length: site.specifier_text.len(),
            },
            TextEdit::Insert {
                index: site.specifier_start,
                text: self.rewrite_specifier(&site.specifier_text),
            },
        ]
    }

    /// Scans `source` and rewrites every matching site.
    ///
    /// Returns `None` when nothing matched, in which case the file should be
    /// left alone.
    pub fn rewrite_source(
        &self,
        scanner: &Scanner,
        path: &str,
        source: &str,
    ) -> Result<Option<FileRewrite>> {
        let mut edits = Vec::new();
        let mut changes = Vec::new();

        for site in scanner.scan(path, source) {
            let site_edits = self.edits_for(&site);
            if site_edits.is_empty() {
                continue;
            }
            changes.push(SpecifierChange {
                kind: site.kind,
                after: self.rewrite_specifier(&site.specifier_text),
                before: site.specifier_text,
            });
            edits.extend(site_edits);
        }

        if edits.is_empty() {
            return Ok(None);
        }

        let content = apply_changes(source, &edits)?;
        Ok(Some(FileRewrite { content, changes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(from: &str, to: &str) -> AliasRewriter {
        AliasRewriter::new(AliasPair::new(from, to), ReplaceStrategy::Prefix).unwrap()
    }

    fn rewrite(rewriter: &AliasRewriter, path: &str, source: &str) -> Option<String> {
        rewriter
            .rewrite_source(&Scanner::new(), path, source)
            .unwrap()
            .map(|r| r.content)
    }

    #[test]
    fn matches_exact_and_subpath_but_not_shared_prefix() {
        let r = rewriter("@x/lib", "@x/v2");
        assert!(r.matches("@x/lib"));
        assert!(r.matches("@x/lib/deep/path"));
        assert!(!r.matches("@x/lib-extra"));
        assert!(!r.matches("@x/li"));
        assert!(!r.matches("./@x/lib"));
    }

    #[test]
    fn rewrites_deep_import() {
        let r = rewriter("@x/lib", "@x/v2");
        let out = rewrite(&r, "a.ts", "import { a } from '@x/lib/deep'").unwrap();
        insta::assert_snapshot!(out, @"import { a } from '@x/v2/deep'");
    }

    #[test]
    fn rewrites_all_three_site_kinds_independently() {
        let r = rewriter("old", "new");
        let source = "import x from 'old';\nconst m = import('old/mod');\nconst n = require('old/mod');\n";
        let result = r.rewrite_source(&Scanner::new(), "a.ts", source).unwrap().unwrap();
        assert_eq!(
            result.content,
            "import x from 'new';\nconst m = import('new/mod');\nconst n = require('new/mod');\n"
        );
        let kinds: Vec<_> = result.changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![SiteKind::Import, SiteKind::DynamicImport, SiteKind::Require]
        );
    }

    #[test]
    fn rewrites_file_with_byte_order_mark() {
        let r = rewriter("@proj/my-lib", "@proj/b");
        let out = rewrite(&r, "a.ts", "\u{feff}import { a } from '@proj/my-lib';\n");
        assert_eq!(out.as_deref(), Some("\u{feff}import { a } from '@proj/b';\n"));
    }

    #[test]
    fn produces_one_delete_insert_pair_per_site() {
        let r = rewriter("old", "new");
        let source = "import x from 'old';\nrequire('old/mod');";
        let edits: Vec<_> = Scanner::new()
            .scan("a.js", source)
            .iter()
            .flat_map(|site| r.edits_for(site))
            .collect();
        assert_eq!(
            edits,
            vec![
                TextEdit::Delete { start: 15, length: 3 },
                TextEdit::Insert { index: 15, text: "new".to_string() },
                TextEdit::Delete { start: 30, length: 7 },
                TextEdit::Insert { index: 30, text: "new/mod".to_string() },
            ]
        );
    }

    #[test]
    fn file_without_alias_is_left_alone() {
        let r = rewriter("@x/lib", "@x/v2");
        let source = "import { a } from '@x/lib-extra';\nconst b = require('@y/lib');\n";
        assert_eq!(rewrite(&r, "a.ts", source), None);
    }

    #[test]
    fn leaves_comments_and_strings_untouched() {
        let r = rewriter("@x/lib", "@x/v2");
        let source = "// see '@x/lib' docs\nconst name = '@x/lib';\nimport { a } from \"@x/lib\";\n";
        let out = rewrite(&r, "a.ts", source).unwrap();
        assert_eq!(
            out,
            "// see '@x/lib' docs\nconst name = '@x/lib';\nimport { a } from \"@x/v2\";\n"
        );
    }

    #[test]
    fn prefix_strategy_replaces_only_the_leading_alias() {
        let r = rewriter("foo", "bar");
        assert_eq!(r.rewrite_specifier("foo/sub/foo-helpers"), "bar/sub/foo-helpers");
    }

    #[test]
    fn everywhere_strategy_replaces_every_occurrence() {
        let r = AliasRewriter::new(AliasPair::new("foo", "bar"), ReplaceStrategy::Everywhere).unwrap();
        assert_eq!(r.rewrite_specifier("foo/sub/foo-helpers"), "bar/sub/bar-helpers");

        let out = rewrite(&r, "a.ts", "import h from 'foo/sub/foo-helpers';").unwrap();
        assert_eq!(out, "import h from 'bar/sub/bar-helpers';");
    }

    #[test]
    fn alias_metacharacters_match_literally() {
        let r = rewriter("@x/lib.v1", "@x/lib.v2");
        assert!(r.mentions_alias("import a from '@x/lib.v1';"));
        assert!(!r.mentions_alias("import a from '@x/libXv1';"));

        let r = AliasRewriter::new(AliasPair::new("a+b", "$1c"), ReplaceStrategy::Everywhere).unwrap();
        assert_eq!(r.rewrite_specifier("a+b/x"), "$1c/x");
    }

    #[test]
    fn pre_filter_is_a_plain_text_test() {
        let r = rewriter("@x/lib", "@x/v2");
        assert!(r.mentions_alias("# @x/lib in a README"));
        assert!(!r.mentions_alias("import { a } from '@x/other';"));
    }
}
