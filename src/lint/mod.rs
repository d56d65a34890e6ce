//! Changelog-driven field linting
//!
//! The [`FieldLinter`] answers one question for every field a decoder visits:
//! does this field path, in a document declaring this version, use a field
//! outside the range of versions in which it is valid? If so the matching
//! [`Change`] is turned into a positioned [`Warning`].
//!
//! ## Lints
//! 1. **Deprecated fields**: a field deprecated at or before the declared
//!    version is still present
//! 2. **Early use**: a field introduced after the declared version is already
//!    present

use semver::Version;

use crate::changelog::{Change, Changelog, ExpandedChangelog, FieldTree};
use crate::warning::{Mark, Position, Warning, Warnings};

/// Linter over an expanded changelog
///
/// Expansion happens once at construction, lookups afterwards only walk the
/// field tree of the requested version.
#[derive(Debug, Clone, Default)]
pub struct FieldLinter {
    expanded: ExpandedChangelog,
}

impl FieldLinter {
    pub fn new(changelog: &Changelog) -> Self {
        Self::from_expanded(changelog.expand())
    }

    pub fn from_expanded(expanded: ExpandedChangelog) -> Self {
        Self { expanded }
    }

    pub fn expanded(&self) -> &ExpandedChangelog {
        &self.expanded
    }

    /// The field tree governing `version`, if any
    pub fn changelog_for_version(&self, version: &Version) -> Option<&FieldTree> {
        self.expanded.tree_for(version)
    }

    /// Find the change applying to `path` in a document declaring `version`
    pub fn find_change<S: AsRef<str>>(&self, version: &Version, path: &[S]) -> Option<&Change> {
        self.changelog_for_version(version)?.find(path)
    }

    /// Lint a single field, returning a warning positioned at `mark`
    pub fn lint<S: AsRef<str>>(
        &self,
        version: &Version,
        path: &[S],
        mark: Mark,
        value: &str,
    ) -> Option<Warning> {
        let change = self.find_change(version, path)?;
        Some(new_warning(path, mark, value, change))
    }

    /// Start linting one document declaring `version`
    pub fn session(&self, version: &Version) -> LintSession<'_> {
        LintSession {
            tree: self.changelog_for_version(version),
            flagged: None,
            warnings: Warnings::new(),
        }
    }
}

/// Lint state for a single document walk
///
/// Fields must be inspected in pre-order. Once a field is flagged its
/// descendants are governed by the same change and are not reported again.
#[derive(Debug)]
pub struct LintSession<'a> {
    tree: Option<&'a FieldTree>,
    flagged: Option<Vec<String>>,
    warnings: Warnings,
}

impl LintSession<'_> {
    pub fn inspect(&mut self, path: &[String], mark: Mark, value: &str) {
        let Some(tree) = self.tree else {
            return;
        };
        if let Some(flagged) = &self.flagged {
            if path.starts_with(flagged) {
                return;
            }
        }
        if let Some(change) = tree.find(path) {
            self.warnings.push(new_warning(path, mark, value, change));
            self.flagged = Some(path.to_vec());
        }
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn finish(self) -> Warnings {
        self.warnings
    }
}

fn new_warning<S: AsRef<str>>(path: &[S], mark: Mark, value: &str, change: &Change) -> Warning {
    let field: &str = path.last().map(|s| s.as_ref()).unwrap_or("");
    Warning::new(Position::new(field, mark, value), change.message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    const DEPRECATED: &str = "the order of processors is non-deterministic";
    const INTRODUCED: &str = "field dead-letter-queue was introduced in version 1.1";

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    fn linter() -> FieldLinter {
        let changelog = Changelog::new()
            .with_version("1.0", vec![Change::deprecated("pipelines.*.processors", DEPRECATED)])
            .unwrap()
            .with_version(
                "1.1",
                vec![Change::introduced("pipelines.*.dead-letter-queue", INTRODUCED)],
            )
            .unwrap();
        FieldLinter::new(&changelog)
    }

    #[test]
    fn test_lint_builds_positioned_warning() {
        let warning = linter()
            .lint(&v("1.0"), &path("pipelines.p1.processors"), Mark::new(17, 9), "")
            .unwrap();
        assert_eq!(warning.message, DEPRECATED);
        assert_eq!(warning.position.field, "processors");
        assert_eq!(warning.position.line, 17);
        assert_eq!(warning.position.column, 9);
    }

    #[test]
    fn test_introduced_field_flagged_only_before_introduction() {
        let linter = linter();
        let dlq = path("pipelines.p1.dead-letter-queue");
        assert!(linter.find_change(&v("1.0"), &dlq).is_some());
        assert!(linter.find_change(&v("1.1"), &dlq).is_none());
        assert!(linter.find_change(&v("1.12"), &dlq).is_none());
    }

    #[test]
    fn test_version_before_changelog_has_no_warnings() {
        let linter = linter();
        assert!(linter.changelog_for_version(&v("0.9")).is_none());
        assert!(linter
            .lint(&v("0.9"), &path("pipelines.p1.processors"), Mark::default(), "")
            .is_none());
    }

    #[test]
    fn test_descendant_lookup_returns_governing_change() {
        let change = linter()
            .find_change(&v("1.0"), &path("pipelines.p1.processors.proc1.type"))
            .cloned();
        assert_eq!(change.map(|c| c.message), Some(DEPRECATED.to_string()));
    }

    #[test]
    fn test_session_reports_subtree_once() {
        let linter = linter();
        let mut session = linter.session(&v("1.0"));
        session.inspect(&path("pipelines"), Mark::new(2, 1), "");
        session.inspect(&path("pipelines.p1"), Mark::new(3, 3), "");
        session.inspect(&path("pipelines.p1.processors"), Mark::new(4, 5), "");
        session.inspect(&path("pipelines.p1.processors.proc1"), Mark::new(5, 7), "");
        session.inspect(&path("pipelines.p1.processors.proc1.type"), Mark::new(6, 9), "js");
        session.inspect(&path("pipelines.p2.processors"), Mark::new(9, 5), "");

        let lines: Vec<usize> = session.finish().iter().map(|w| w.position.line).collect();
        assert_eq!(lines, vec![4, 9]);
    }
}
