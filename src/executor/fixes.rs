//! Source fix appliers
//!
//! Each applier rewrites source text for one family of rules. Applying a fix
//! to content that already has it is a no-op reported as
//! [`FixOutcome::AlreadyApplied`]. Line-local fixes never change the number
//! of lines; whole-file fixes (import ordering) run after them.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::snapshot::write_atomic;
use crate::types::{Diagnostic, FixError, MendError, PlannedIssue, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Applied,
    AlreadyApplied,
}

/// File content split into lines, remembering how to put it back together
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl SourceFile {
    pub fn parse(content: &str) -> Self {
        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let trailing_newline = content.ends_with('\n');
        let body = content.strip_suffix('\n').unwrap_or(content);
        let lines = if content.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };
        Self {
            lines,
            line_ending,
            trailing_newline,
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.line_ending);
        if self.trailing_newline {
            out.push_str(self.line_ending);
        }
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 1-based line access
    fn line_mut(&mut self, line: u32, d: &Diagnostic) -> Result<&mut String> {
        let index = (line as usize).checked_sub(1);
        index
            .and_then(|i| self.lines.get_mut(i))
            .ok_or_else(|| fail(d, format!("line {} is out of range", line)))
    }
}

/// One diagnostic to fix, with the identifier patterns it must not touch
pub struct FixTarget<'a> {
    pub diagnostic: &'a Diagnostic,
    pub preserve: &'a [Regex],
}

impl FixTarget<'_> {
    fn is_preserved(&self, ident: &str) -> bool {
        self.preserve.iter().any(|p| p.is_match(ident))
    }
}

pub trait FixApplier: Send + Sync {
    fn name(&self) -> &'static str;

    fn handles(&self, rule_id: &str) -> bool;

    /// Whole-file fixes resolve every diagnostic of their rule at once
    fn file_scoped(&self) -> bool {
        false
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome>;
}

fn fail(d: &Diagnostic, message: impl Into<String>) -> MendError {
    MendError::fix(&d.file, &d.rule_id, message)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte offset of a 1-based character column
fn byte_at(line: &str, column: u32) -> Option<usize> {
    let col = (column as usize).checked_sub(1)?;
    line.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()))
        .nth(col)
}

/// Whole-word occurrences of `ident`, excluding property accesses
fn identifier_positions(line: &str, ident: &str) -> Vec<usize> {
    line.match_indices(ident)
        .map(|(i, _)| i)
        .filter(|&i| {
            let before = line[..i].chars().next_back();
            let after = line[i + ident.len()..].chars().next();
            !before.is_some_and(|c| is_ident_char(c) || c == '.')
                && !after.is_some_and(is_ident_char)
        })
        .collect()
}

/// Prefer the occurrence at the reported column
fn locate(line: &str, ident: &str, hint: Option<usize>) -> Option<usize> {
    let positions = identifier_positions(line, ident);
    match hint {
        Some(h) if positions.contains(&h) => Some(h),
        _ => positions.first().copied(),
    }
}

// =============================================================================
// Unused bindings
// =============================================================================

/// Prefix unused bindings with `_`
pub struct UnusedBindingFix;

impl UnusedBindingFix {
    fn in_import_braces(line: &str, pos: usize) -> bool {
        line.trim_start().starts_with("import")
            && line[..pos].contains('{')
            && line[pos..].contains('}')
    }
}

impl FixApplier for UnusedBindingFix {
    fn name(&self) -> &'static str {
        "unused-binding"
    }

    fn handles(&self, rule_id: &str) -> bool {
        matches!(rule_id, "no-unused-vars" | "@typescript-eslint/no-unused-vars")
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let ident = d
            .quoted_identifier()
            .ok_or_else(|| fail(d, "message does not name the binding"))?;
        if ident.starts_with('_') {
            return Ok(FixOutcome::AlreadyApplied);
        }
        if target.is_preserved(ident) {
            return Err(fail(d, format!("preserved identifier '{}'", ident)));
        }

        let line = source.line_mut(d.line, d)?;
        let prefixed = format!("_{}", ident);
        let hint = byte_at(line, d.column);

        if hint.is_some_and(|h| identifier_positions(line, &prefixed).contains(&h)) {
            return Ok(FixOutcome::AlreadyApplied);
        }
        let Some(pos) = locate(line, ident, hint) else {
            return if identifier_positions(line, &prefixed).is_empty() {
                Err(fail(d, format!("'{}' not found on line {}", ident, d.line)))
            } else {
                Ok(FixOutcome::AlreadyApplied)
            };
        };

        if Self::in_import_braces(line, pos) {
            let rest = &line[pos + ident.len()..];
            if let Some(alias) = rest.trim_start().strip_prefix("as ") {
                return if alias.trim_start().starts_with(&prefixed) {
                    Ok(FixOutcome::AlreadyApplied)
                } else {
                    Err(fail(d, format!("'{}' is imported under an alias", ident)))
                };
            }
            // Imported names cannot change; alias them instead
            line.insert_str(pos + ident.len(), &format!(" as {}", prefixed));
        } else {
            line.insert(pos, '_');
        }
        Ok(FixOutcome::Applied)
    }
}

// =============================================================================
// prefer-const
// =============================================================================

pub struct PreferConstFix;

impl FixApplier for PreferConstFix {
    fn name(&self) -> &'static str {
        "prefer-const"
    }

    fn handles(&self, rule_id: &str) -> bool {
        rule_id == "prefer-const"
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let ident = d
            .quoted_identifier()
            .ok_or_else(|| fail(d, "message does not name the binding"))?;
        let line = source.line_mut(d.line, d)?;
        let escaped = regex::escape(ident);

        let declared_const = Regex::new(&format!(r"\bconst\s+{}\b", escaped))?;
        if declared_const.is_match(line) {
            return Ok(FixOutcome::AlreadyApplied);
        }

        let declared_let = Regex::new(&format!(r"\blet(\s+{}\b)", escaped))?;
        let Some(caps) = declared_let.captures(line) else {
            return Err(fail(d, format!("no simple 'let {}' declaration on line", ident)));
        };
        let (Some(whole), Some(tail)) = (caps.get(0), caps.get(1)) else {
            return Err(fail(d, "malformed declaration"));
        };
        let statement = line[whole.end()..].split(';').next().unwrap_or_default();
        if statement.contains(',') {
            return Err(fail(d, "declaration has several declarators"));
        }

        let replacement = format!("const{}", tail.as_str());
        line.replace_range(whole.range(), &replacement);
        Ok(FixOutcome::Applied)
    }
}

// =============================================================================
// Debug statements
// =============================================================================

/// Remove standalone `console.*(...)` and `debugger` statements, leaving
/// an empty line so line numbers stay stable
pub struct DebugStatementFix;

impl DebugStatementFix {
    /// End of a call starting at `start`, skipping string literals
    fn call_end(line: &str, start: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut seen_open = false;
        for (i, c) in line[start..].char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => {
                    depth += 1;
                    seen_open = true;
                }
                ')' => {
                    depth = depth.checked_sub(1)?;
                    if seen_open && depth == 0 {
                        return Some(start + i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn is_standalone(line: &str, start: usize, end: usize) -> bool {
        let after = line[end..].trim_start();
        let after = after.strip_prefix(';').unwrap_or(after).trim();
        line[..start].trim().is_empty() && (after.is_empty() || after.starts_with("//"))
    }
}

impl FixApplier for DebugStatementFix {
    fn name(&self) -> &'static str {
        "debug-statement"
    }

    fn handles(&self, rule_id: &str) -> bool {
        matches!(rule_id, "no-console" | "no-debugger")
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let line = source.line_mut(d.line, d)?;
        let hint = byte_at(line, d.column);

        let (start, end) = if d.rule_id == "no-debugger" {
            let Some(start) = locate(line, "debugger", hint) else {
                return Ok(FixOutcome::AlreadyApplied);
            };
            (start, start + "debugger".len())
        } else {
            let Some(start) = locate(line, "console", hint)
                .filter(|&s| line[s + "console".len()..].starts_with('.'))
            else {
                return Ok(FixOutcome::AlreadyApplied);
            };
            let end = Self::call_end(line, start)
                .ok_or_else(|| fail(d, "console call spans several lines"))?;
            (start, end)
        };

        if !Self::is_standalone(line, start, end) {
            return Err(fail(d, "statement shares its line with other code"));
        }
        line.clear();
        Ok(FixOutcome::Applied)
    }
}

// =============================================================================
// Promise handling
// =============================================================================

/// Drop `await` on values that are not thenables
pub struct AwaitThenableFix;

impl FixApplier for AwaitThenableFix {
    fn name(&self) -> &'static str {
        "await-thenable"
    }

    fn handles(&self, rule_id: &str) -> bool {
        rule_id == "@typescript-eslint/await-thenable"
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let line = source.line_mut(d.line, d)?;
        let Some(start) = byte_at(line, d.column) else {
            return Err(fail(d, "column is out of range"));
        };
        let rest = &line[start..];
        let Some(after) = rest.strip_prefix("await") else {
            return Ok(FixOutcome::AlreadyApplied);
        };
        if !after.starts_with(char::is_whitespace) {
            return Ok(FixOutcome::AlreadyApplied);
        }
        let removed = rest.len() - after.trim_start().len();
        line.replace_range(start..start + removed, "");
        Ok(FixOutcome::Applied)
    }
}

/// Mark intentionally un-awaited promises with `void`
pub struct FloatingPromiseFix;

impl FixApplier for FloatingPromiseFix {
    fn name(&self) -> &'static str {
        "floating-promise"
    }

    fn handles(&self, rule_id: &str) -> bool {
        rule_id == "@typescript-eslint/no-floating-promises"
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let line = source.line_mut(d.line, d)?;
        let Some(start) = byte_at(line, d.column) else {
            return Err(fail(d, "column is out of range"));
        };
        let rest = &line[start..];
        if rest.starts_with("void ") || rest.starts_with("await ") {
            return Ok(FixOutcome::AlreadyApplied);
        }
        if rest.trim().is_empty() {
            return Err(fail(d, "no expression at the reported column"));
        }
        line.insert_str(start, "void ");
        Ok(FixOutcome::Applied)
    }
}

/// Wrap promise-returning timer callbacks: `setTimeout(f, n)` becomes
/// `setTimeout(() => void f(), n)`
pub struct MisusedPromiseFix {
    timer_call: Regex,
    wrapped: Regex,
}

impl MisusedPromiseFix {
    pub fn new() -> Result<Self> {
        Ok(Self {
            timer_call: Regex::new(r"\b(setTimeout|setInterval)\(\s*([A-Za-z_$][\w$.]*)\s*([,)])")?,
            wrapped: Regex::new(r"\b(setTimeout|setInterval)\(\s*\(\)\s*=>\s*void\b")?,
        })
    }
}

impl FixApplier for MisusedPromiseFix {
    fn name(&self) -> &'static str {
        "misused-promise"
    }

    fn handles(&self, rule_id: &str) -> bool {
        rule_id == "@typescript-eslint/no-misused-promises"
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let line = source.line_mut(d.line, d)?;
        if self.wrapped.is_match(line) {
            return Ok(FixOutcome::AlreadyApplied);
        }
        if !self.timer_call.is_match(line) {
            return Err(fail(d, "only timer callbacks passed by name can be wrapped"));
        }
        let fixed = self
            .timer_call
            .replacen(line, 1, "$1(() => void $2()$3")
            .into_owned();
        *line = fixed;
        Ok(FixOutcome::Applied)
    }
}

// =============================================================================
// eqeqeq
// =============================================================================

pub struct StrictEqualityFix;

impl StrictEqualityFix {
    fn loose_operators(line: &str) -> Vec<usize> {
        let bytes = line.as_bytes();
        (0..bytes.len().saturating_sub(1))
            .filter(|&i| {
                (bytes[i] == b'=' || bytes[i] == b'!')
                    && bytes[i + 1] == b'='
                    && bytes.get(i + 2) != Some(&b'=')
                    && (i == 0 || !matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>'))
            })
            .collect()
    }
}

impl FixApplier for StrictEqualityFix {
    fn name(&self) -> &'static str {
        "strict-equality"
    }

    fn handles(&self, rule_id: &str) -> bool {
        rule_id == "eqeqeq"
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let line = source.line_mut(d.line, d)?;
        let hint = byte_at(line, d.column);
        if hint.is_some_and(|h| line[h..].starts_with("===") || line[h..].starts_with("!==")) {
            return Ok(FixOutcome::AlreadyApplied);
        }

        let loose = Self::loose_operators(line);
        let pos = match (hint, loose.as_slice()) {
            (Some(h), _) if loose.contains(&h) => h,
            (_, []) => return Ok(FixOutcome::AlreadyApplied),
            (_, [only]) => *only,
            _ => return Err(fail(d, "several loose comparisons on one line")),
        };
        line.insert(pos + 2, '=');
        Ok(FixOutcome::Applied)
    }
}

// =============================================================================
// Import ordering
// =============================================================================

/// Sort the leading import block: builtins, packages, aliases, parents, siblings
pub struct ImportOrderFix {
    from_clause: Regex,
    side_effect: Regex,
}

impl ImportOrderFix {
    pub fn new() -> Result<Self> {
        Ok(Self {
            from_clause: Regex::new(r#"\bfrom\s+['"]([^'"]+)['"]"#)?,
            side_effect: Regex::new(r#"^\s*import\s+['"]"#)?,
        })
    }

    fn group(specifier: &str) -> u8 {
        if specifier.starts_with("node:") {
            0
        } else if specifier.starts_with("@/") || specifier.starts_with("~/") || specifier.starts_with('#') {
            2
        } else if specifier.starts_with("../") || specifier == ".." {
            3
        } else if specifier.starts_with('.') {
            4
        } else {
            1
        }
    }

    /// Line range of the first import block, blank lines included
    fn block(lines: &[String]) -> Option<(usize, usize)> {
        let start = lines.iter().position(|l| l.trim_start().starts_with("import "))?;
        let mut end = start;
        for (i, l) in lines.iter().enumerate().skip(start) {
            let t = l.trim_start();
            if t.starts_with("import ") {
                end = i + 1;
            } else if !t.is_empty() {
                break;
            }
        }
        Some((start, end))
    }
}

impl FixApplier for ImportOrderFix {
    fn name(&self) -> &'static str {
        "import-order"
    }

    fn handles(&self, rule_id: &str) -> bool {
        matches!(rule_id, "import/order" | "sort-imports" | "simple-import-sort/imports")
    }

    fn file_scoped(&self) -> bool {
        true
    }

    fn apply(&self, source: &mut SourceFile, target: &FixTarget<'_>) -> Result<FixOutcome> {
        let d = target.diagnostic;
        let Some((start, end)) = Self::block(&source.lines) else {
            return Err(fail(d, "no import block found"));
        };

        let region = &source.lines[start..end];
        let had_blank = region.iter().any(|l| l.trim().is_empty());
        let mut imports = Vec::new();
        for line in region.iter().filter(|l| !l.trim().is_empty()) {
            if self.side_effect.is_match(line) {
                return Err(fail(d, "side-effect imports need manual ordering"));
            }
            let specifier = self
                .from_clause
                .captures(line)
                .and_then(|c| c.get(1))
                .ok_or_else(|| fail(d, "multi-line imports need manual ordering"))?;
            let spec = specifier.as_str();
            imports.push((Self::group(spec), spec.to_lowercase(), line.clone()));
        }

        let mut sorted = imports.clone();
        sorted.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let mut rebuilt = Vec::with_capacity(region.len());
        for (i, (group, _, line)) in sorted.iter().enumerate() {
            if had_blank && i > 0 && sorted[i - 1].0 != *group {
                rebuilt.push(String::new());
            }
            rebuilt.push(line.clone());
        }

        if rebuilt.as_slice() == region {
            return Ok(FixOutcome::AlreadyApplied);
        }
        source.lines.splice(start..end, rebuilt);
        Ok(FixOutcome::Applied)
    }
}

// =============================================================================
// Registry and file application
// =============================================================================

pub struct FixRegistry {
    appliers: Vec<Box<dyn FixApplier>>,
}

impl FixRegistry {
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            appliers: vec![
                Box::new(UnusedBindingFix),
                Box::new(PreferConstFix),
                Box::new(DebugStatementFix),
                Box::new(AwaitThenableFix),
                Box::new(FloatingPromiseFix),
                Box::new(MisusedPromiseFix::new()?),
                Box::new(StrictEqualityFix),
                Box::new(ImportOrderFix::new()?),
            ],
        })
    }

    pub fn find(&self, rule_id: &str) -> Option<&dyn FixApplier> {
        self.appliers
            .iter()
            .find(|a| a.handles(rule_id))
            .map(|a| a.as_ref())
    }

    pub fn supports(&self, rule_id: &str) -> bool {
        self.find(rule_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    Fixed,
    Skipped(String),
    Failed(FixError),
}

/// Per-issue results for one file, in application order
#[derive(Debug, Clone)]
pub struct FileFixReport {
    pub file: String,
    pub outcomes: Vec<(Diagnostic, IssueOutcome)>,
    pub changed: bool,
}

impl FileFixReport {
    pub fn fixed(&self) -> usize {
        self.count(|o| matches!(o, IssueOutcome::Fixed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, IssueOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, IssueOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&IssueOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

fn fix_error(d: &Diagnostic, err: &MendError) -> FixError {
    let message = match err {
        MendError::FixApplication { message, .. } => message.clone(),
        other => other.to_string(),
    };
    FixError {
        file: d.file.clone(),
        line: d.line,
        rule_id: d.rule_id.clone(),
        message,
    }
}

fn compile_preserve(issues: &[&PlannedIssue]) -> Result<Vec<Regex>> {
    let mut seen = HashSet::new();
    issues
        .iter()
        .flat_map(|i| i.preserve_patterns.iter())
        .filter(|p| seen.insert(p.as_str()))
        .map(|p| Regex::new(p).map_err(MendError::from))
        .collect()
}

/// Apply every issue of one file, writing it at most once.
///
/// Line-local fixes run in descending (line, column) order, whole-file fixes
/// last. With `write == false` nothing touches the disk.
pub fn apply_file(
    root: &Path,
    file: &str,
    issues: &[&PlannedIssue],
    registry: &FixRegistry,
    write: bool,
) -> Result<FileFixReport> {
    let path = root.join(file);
    let original = fs::read_to_string(&path)?;
    let mut source = SourceFile::parse(&original);
    let preserve = compile_preserve(issues)?;

    let mut ordered: Vec<&PlannedIssue> = issues.to_vec();
    ordered.sort_by(|a, b| {
        let a_file = registry.find(&a.diagnostic.rule_id).is_some_and(|f| f.file_scoped());
        let b_file = registry.find(&b.diagnostic.rule_id).is_some_and(|f| f.file_scoped());
        a_file
            .cmp(&b_file)
            .then(b.diagnostic.line.cmp(&a.diagnostic.line))
            .then(b.diagnostic.column.cmp(&a.diagnostic.column))
    });

    let mut outcomes = Vec::with_capacity(ordered.len());
    // Whole-file appliers that already rewrote this file in this pass
    let mut file_passes: HashSet<&'static str> = HashSet::new();

    for issue in ordered {
        let d = &issue.diagnostic;
        let Some(applier) = registry.find(&d.rule_id) else {
            outcomes.push((d.clone(), IssueOutcome::Skipped("no fix available".to_string())));
            continue;
        };
        let target = FixTarget {
            diagnostic: d,
            preserve: &preserve,
        };
        let outcome = match applier.apply(&mut source, &target) {
            Ok(FixOutcome::Applied) => {
                if applier.file_scoped() {
                    file_passes.insert(applier.name());
                }
                IssueOutcome::Fixed
            }
            Ok(FixOutcome::AlreadyApplied) if file_passes.contains(applier.name()) => {
                IssueOutcome::Fixed
            }
            Ok(FixOutcome::AlreadyApplied) => IssueOutcome::Skipped("already applied".to_string()),
            Err(e) => IssueOutcome::Failed(fix_error(d, &e)),
        };
        outcomes.push((d.clone(), outcome));
    }

    let rendered = source.render();
    let changed = rendered != original;
    if changed && write {
        write_atomic(&path, rendered.as_bytes())?;
    }

    Ok(FileFixReport {
        file: file.to_string(),
        outcomes,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(rule: &str, line: u32, column: u32, message: &str) -> Diagnostic {
        Diagnostic::new("src/a.ts", line, column, rule, message)
    }

    fn run(applier: &dyn FixApplier, content: &str, d: &Diagnostic) -> (String, Result<FixOutcome>) {
        let mut source = SourceFile::parse(content);
        let target = FixTarget {
            diagnostic: d,
            preserve: &[],
        };
        let outcome = applier.apply(&mut source, &target);
        (source.render(), outcome)
    }

    /// Apply twice: the second pass must change nothing
    fn assert_idempotent(applier: &dyn FixApplier, content: &str, d: &Diagnostic, expected: &str) {
        let (once, outcome) = run(applier, content, d);
        assert_eq!(outcome.unwrap(), FixOutcome::Applied);
        assert_eq!(once, expected);
        let (twice, outcome) = run(applier, &once, d);
        assert_eq!(outcome.unwrap(), FixOutcome::AlreadyApplied);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_source_file_preserves_line_endings() {
        for content in ["a\nb\n", "a\r\nb\r\n", "a\nb", ""] {
            assert_eq!(SourceFile::parse(content).render(), content);
        }
    }

    #[test]
    fn test_unused_binding_prefix() {
        let d = diag("@typescript-eslint/no-unused-vars", 1, 7, "'total' is assigned a value but never used.");
        assert_idempotent(&UnusedBindingFix, "const total = 1;\n", &d, "const _total = 1;\n");
    }

    #[test]
    fn test_unused_binding_skips_property_access() {
        let d = diag("no-unused-vars", 1, 21, "'value' is defined but never used.");
        let content = "const x = obj.value; const value = 2;\n";
        let (out, outcome) = run(&UnusedBindingFix, content, &d);
        assert_eq!(outcome.unwrap(), FixOutcome::Applied);
        assert_eq!(out, "const x = obj.value; const _value = 2;\n");
    }

    #[test]
    fn test_unused_import_specifier_is_aliased() {
        let d = diag("no-unused-vars", 1, 10, "'useMemo' is defined but never used.");
        assert_idempotent(
            &UnusedBindingFix,
            "import { useMemo } from 'react';\n",
            &d,
            "import { useMemo as _useMemo } from 'react';\n",
        );
    }

    #[test]
    fn test_preserved_identifier_is_refused() {
        let d = diag("no-unused-vars", 1, 7, "'taxRate' is defined but never used.");
        let mut source = SourceFile::parse("const taxRate = 0.2;\n");
        let preserve = vec![Regex::new("(?i)tax").unwrap()];
        let target = FixTarget {
            diagnostic: &d,
            preserve: &preserve,
        };
        let err = UnusedBindingFix.apply(&mut source, &target).unwrap_err();
        assert!(err.to_string().contains("preserved identifier"));
        assert_eq!(source.render(), "const taxRate = 0.2;\n");
    }

    #[test]
    fn test_prefer_const() {
        let d = diag("prefer-const", 1, 5, "'count' is never reassigned. Use 'const' instead.");
        assert_idempotent(&PreferConstFix, "let count = 0;\n", &d, "const count = 0;\n");

        let multi = diag("prefer-const", 1, 5, "'a' is never reassigned. Use 'const' instead.");
        let (_, outcome) = run(&PreferConstFix, "let a = 1, b = 2;\n", &multi);
        assert!(outcome.is_err());
    }

    #[test]
    fn test_console_removal_keeps_line_count() {
        let d = diag("no-console", 2, 3, "Unexpected console statement.");
        let content = "function f() {\n  console.log(\"a)\", x);\n  return 1;\n}\n";
        assert_idempotent(&DebugStatementFix, content, &d, "function f() {\n\n  return 1;\n}\n");
    }

    #[test]
    fn test_console_inside_expression_is_refused() {
        let d = diag("no-console", 1, 8, "Unexpected console statement.");
        let (out, outcome) = run(&DebugStatementFix, "if (x) console.log(x);\n", &d);
        assert!(outcome.is_err());
        assert_eq!(out, "if (x) console.log(x);\n");
    }

    #[test]
    fn test_debugger_removal() {
        let d = diag("no-debugger", 1, 3, "Unexpected 'debugger' statement.");
        assert_idempotent(&DebugStatementFix, "  debugger;\n", &d, "\n");
    }

    #[test]
    fn test_await_thenable() {
        let d = diag("@typescript-eslint/await-thenable", 1, 11, "Unexpected `await` of a non-Promise value.");
        assert_idempotent(&AwaitThenableFix, "const v = await compute();\n", &d, "const v = compute();\n");
    }

    #[test]
    fn test_floating_promise() {
        let d = diag("@typescript-eslint/no-floating-promises", 1, 3, "Promises must be awaited.");
        assert_idempotent(&FloatingPromiseFix, "  save();\n", &d, "  void save();\n");
    }

    #[test]
    fn test_misused_promise_timer() {
        let fix = MisusedPromiseFix::new().unwrap();
        let d = diag("@typescript-eslint/no-misused-promises", 1, 12, "Promise returned in function argument.");
        assert_idempotent(&fix, "setTimeout(refresh, 500);\n", &d, "setTimeout(() => void refresh(), 500);\n");
    }

    #[test]
    fn test_eqeqeq() {
        let d = diag("eqeqeq", 1, 7, "Expected '===' and instead saw '=='.");
        assert_idempotent(&StrictEqualityFix, "if (a == b) {}\n", &d, "if (a === b) {}\n");

        let ne = diag("eqeqeq", 1, 7, "Expected '!==' and instead saw '!='.");
        assert_idempotent(&StrictEqualityFix, "if (a != b) {}\n", &ne, "if (a !== b) {}\n");
    }

    #[test]
    fn test_import_order() {
        let fix = ImportOrderFix::new().unwrap();
        let d = diag("import/order", 1, 1, "`./util` import should occur after import of `react`");
        let content = "import { helper } from './util';\nimport React from 'react';\nimport fs from 'node:fs';\n\nconst x = 1;\n";
        let expected = "import fs from 'node:fs';\nimport React from 'react';\nimport { helper } from './util';\n\nconst x = 1;\n";
        assert_idempotent(&fix, content, &d, expected);
    }

    #[test]
    fn test_import_order_refuses_side_effects() {
        let fix = ImportOrderFix::new().unwrap();
        let d = diag("import/order", 1, 1, "order");
        let (_, outcome) = run(&fix, "import './polyfill';\nimport a from 'a';\n", &d);
        assert!(outcome.is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = FixRegistry::builtin().unwrap();
        assert!(registry.supports("import/order"));
        assert!(registry.supports("@typescript-eslint/no-unused-vars"));
        assert!(!registry.supports("@typescript-eslint/no-explicit-any"));
        assert_eq!(registry.find("eqeqeq").unwrap().name(), "strict-equality");
    }

    #[test]
    fn test_line_local_before_file_scoped() {
        use crate::types::{DomainType, ResolutionStrategy, RiskLevel, StrategyType};
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(
            temp.path().join("src/a.ts"),
            "import { b } from './b';\nimport { a } from 'a';\n",
        )
        .unwrap();

        let classification = crate::classifier::Classifier::default()
            .classify("import/order", "", "src/a.ts", true);
        let planned = |d: Diagnostic| PlannedIssue {
            diagnostic: d,
            classification: classification.clone(),
            strategy: ResolutionStrategy {
                strategy_type: StrategyType::AutoFix,
                estimated_minutes: 0.1,
                risk: RiskLevel::Low,
                rationale: String::new(),
                steps: Vec::new(),
            },
            domain: DomainType::Utility,
            preserve_patterns: Vec::new(),
        };
        let order = planned(diag("import/order", 2, 1, "order"));
        let unused = planned(diag("no-unused-vars", 1, 10, "'b' is defined but never used."));

        let registry = FixRegistry::builtin().unwrap();
        let report = apply_file(temp.path(), "src/a.ts", &[&order, &unused], &registry, true).unwrap();
        assert_eq!(report.fixed(), 2);
        assert!(report.changed);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("src/a.ts")).unwrap(),
            "import { a } from 'a';\nimport { b as _b } from './b';\n"
        );
    }

    #[test]
    fn test_dry_run_does_not_write() {
        use crate::types::{DomainType, ResolutionStrategy, RiskLevel, StrategyType};
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/a.ts"), "let x = 1;\n").unwrap();
        let classification = crate::classifier::Classifier::default()
            .classify("prefer-const", "", "src/a.ts", true);
        let issue = PlannedIssue {
            diagnostic: diag("prefer-const", 1, 5, "'x' is never reassigned. Use 'const' instead."),
            classification,
            strategy: ResolutionStrategy {
                strategy_type: StrategyType::AutoFix,
                estimated_minutes: 0.1,
                risk: RiskLevel::Low,
                rationale: String::new(),
                steps: Vec::new(),
            },
            domain: DomainType::Utility,
            preserve_patterns: Vec::new(),
        };
        let registry = FixRegistry::builtin().unwrap();
        let report = apply_file(temp.path(), "src/a.ts", &[&issue], &registry, false).unwrap();
        assert_eq!(report.fixed(), 1);
        assert!(report.changed);
        assert_eq!(std::fs::read_to_string(temp.path().join("src/a.ts")).unwrap(), "let x = 1;\n");
    }
}
