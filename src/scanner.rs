//! JavaScript/TypeScript module-reference scanner.
//!
//! Parses a source file with swc and collects every string literal that names
//! a module in one of three positions: the specifier of an `import`
//! declaration, the first argument of a dynamic `import(...)`, and the first
//! argument of a plain `require(...)` call. Anything else (member-expression
//! requires, computed or template-literal specifiers, re-exports) is ignored.

use serde::Serialize;
use std::path::Path;
use swc_common::{BytePos, FileName, SourceMap, sync::Lrc};
use swc_ecma_ast::{CallExpr, Callee, EsVersion, Expr, ImportDecl, Lit, Str};
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax, TsSyntax, lexer::Lexer};
use swc_ecma_visit::{Visit, VisitWith};

/// Syntactic position a module specifier was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteKind {
    Import,
    DynamicImport,
    Require,
}

/// A module specifier string literal located in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSite {
    /// Raw text between the quotes, e.g. `@scope/lib/sub`.
    pub specifier_text: String,
    /// Byte offset of the first character after the opening quote.
    pub specifier_start: usize,
    pub kind: SiteKind,
}

/// Locates module-reference sites in JS/TS sources.
///
/// Holds the parser configuration shared by every file of a run. A fresh
/// swc parser is built for each file; nothing is cached between files.
#[derive(Debug, Clone)]
pub struct Scanner {
    decorators: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self { decorators: true }
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser syntax for `path`, or `None` if the extension is not JS/TS.
    pub fn syntax_for(&self, path: &str) -> Option<Syntax> {
        let ext = Path::new(path).extension()?.to_str()?;
        match ext {
            "ts" | "mts" | "cts" => Some(Syntax::Typescript(TsSyntax {
                decorators: self.decorators,
                ..Default::default()
            })),
            "tsx" => Some(Syntax::Typescript(TsSyntax {
                tsx: true,
                decorators: self.decorators,
                ..Default::default()
            })),
            "js" | "jsx" | "mjs" | "cjs" => Some(Syntax::Es(EsSyntax {
                jsx: true,
                decorators: self.decorators,
                ..Default::default()
            })),
            _ => None,
        }
    }

    /// True if `path` has an extension the scanner knows how to parse.
    pub fn supports(&self, path: &str) -> bool {
        self.syntax_for(path).is_some()
    }

    /// Parses `source` and returns its reference sites in document order.
    ///
    /// Unsupported extensions and files that fail to parse yield no sites;
    /// parse failures are logged and otherwise ignored.
    pub fn scan(&self, path: &str, source: &str) -> Vec<ReferenceSite> {
        let Some(syntax) = self.syntax_for(path) else {
            return Vec::new();
        };

        // swc measures spans past a byte order mark; parse without it and
        // shift offsets back onto the original text.
        let (skipped, source) = match source.strip_prefix('\u{feff}') {
            Some(rest) => ('\u{feff}'.len_utf8(), rest),
            None => (0, source),
        };

        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom(path.to_string())),
            source.to_string(),
        );
        let lexer = Lexer::new(syntax, EsVersion::latest(), StringInput::from(&*fm), None);
        let mut parser = Parser::new_from(lexer);

        let program = match parser.parse_program() {
            Ok(program) => program,
            Err(err) => {
                tracing::warn!(file = path, error = ?err, "skipping file that failed to parse");
                return Vec::new();
            }
        };

        let mut collector = SiteCollector {
            source,
            base: fm.start_pos,
            skipped,
            sites: Vec::new(),
        };
        program.visit_with(&mut collector);
        collector.sites
    }
}

struct SiteCollector<'a> {
    source: &'a str,
    base: BytePos,
    skipped: usize,
    sites: Vec<ReferenceSite>,
}

impl SiteCollector<'_> {
    fn record(&mut self, literal: &Str, kind: SiteKind) {
        let (Some(lo), Some(hi)) = (
            literal.span.lo.0.checked_sub(self.base.0),
            literal.span.hi.0.checked_sub(self.base.0),
        ) else {
            return;
        };
        let (lo, hi) = (lo as usize, hi as usize);

        // The span covers the quotes; keep only the interior.
        let Some(raw) = self.source.get(lo..hi) else {
            return;
        };
        if raw.len() < 2 || !(raw.starts_with('\'') || raw.starts_with('"')) {
            return;
        }

        self.sites.push(ReferenceSite {
            specifier_text: raw[1..raw.len() - 1].to_string(),
            specifier_start: self.skipped + lo + 1,
            kind,
        });
    }
}

fn first_string_arg(call: &CallExpr) -> Option<&Str> {
    match &*call.args.first()?.expr {
        Expr::Lit(Lit::Str(literal)) => Some(literal),
        _ => None,
    }
}

impl Visit for SiteCollector<'_> {
    fn visit_import_decl(&mut self, n: &ImportDecl) {
        self.record(&n.src, SiteKind::Import);
    }

    fn visit_call_expr(&mut self, n: &CallExpr) {
        let kind = match &n.callee {
            Callee::Import(_) => Some(SiteKind::DynamicImport),
            Callee::Expr(callee) => match &**callee {
                Expr::Ident(ident) if &*ident.sym == "require" => Some(SiteKind::Require),
                _ => None,
            },
            _ => None,
        };

        if let Some(kind) = kind
            && let Some(literal) = first_string_arg(n)
        {
            self.record(literal, kind);
        }

        n.visit_children_with(self);
    }
}
