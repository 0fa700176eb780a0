//! Flat field names and reference resolution.
//!
//! Field names are flat strings built from the composite/repeater path with a
//! configurable separator (`.` by default): `ldap.servers.2.host`. References
//! inside checkers and disable conditions use `/` between segments, `..` to
//! climb one segment, and a leading `/` to start from the form root.

use smol_str::SmolStr;

/// Builds and resolves flat field names for one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    separator: SmolStr,
    root: SmolStr,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(".", "")
    }
}

impl PathResolver {
    /// `root` is the form-wide field name prefix; it should end with the
    /// separator when non-empty.
    #[must_use]
    pub fn new(separator: impl Into<SmolStr>, root: impl Into<SmolStr>) -> Self {
        Self {
            separator: separator.into(),
            root: root.into(),
        }
    }

    /// Segment separator of flat names.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Form-wide name prefix.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Prefix for the children of composite `name` declared under `prefix`.
    #[must_use]
    pub fn child_prefix(&self, prefix: &str, name: &str) -> SmolStr {
        SmolStr::new(format!("{prefix}{name}{}", self.separator))
    }

    /// Prefix for the fields of entry `position` (1-based) of a repeater.
    #[must_use]
    pub fn entry_prefix(&self, prefix: &str, name: &str, position: usize) -> SmolStr {
        let sep = &self.separator;
        SmolStr::new(format!("{prefix}{name}{sep}{position}{sep}"))
    }

    /// Resolves `reference` against `base`, a prefix ending with the
    /// separator (or empty). Extra `..` segments stop at the form root.
    #[must_use]
    pub fn resolve(&self, base: &str, reference: &str) -> SmolStr {
        let (mut segments, rest) = match reference.strip_prefix('/') {
            Some(rest) => (self.segments(&self.root), rest),
            None => (self.segments(base), reference),
        };
        for part in rest.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        SmolStr::new(segments.join(self.separator.as_str()))
    }

    /// Converts a `/`-separated payload path into a flat name under the root.
    #[must_use]
    pub fn from_slash_path(&self, path: &str) -> SmolStr {
        let joined = path
            .split('/')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(self.separator.as_str());
        SmolStr::new(format!("{}{joined}", self.root))
    }

    /// Prepends the form root to a flat name relative to it.
    #[must_use]
    pub fn absolute(&self, relative: &str) -> SmolStr {
        SmolStr::new(format!("{}{relative}", self.root))
    }

    /// Strips the form root from a flat name, when present.
    #[must_use]
    pub fn relative<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.root.as_str()).unwrap_or(name)
    }

    fn segments<'a>(&self, prefix: &'a str) -> Vec<&'a str> {
        prefix
            .split(self.separator.as_str())
            .filter(|part| !part.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_reference_appends_to_base() {
        let paths = PathResolver::default();
        assert_eq!(paths.resolve("ldap.", "host"), "ldap.host");
    }

    #[test]
    fn parent_segments_climb_the_base() {
        let paths = PathResolver::default();
        assert_eq!(paths.resolve("ldap.servers.2.", "../../port"), "ldap.port");
        assert_eq!(paths.resolve("a.", "../../../b"), "b");
    }

    #[test]
    fn absolute_reference_starts_from_root() {
        let paths = PathResolver::new(".", "cfg.");
        assert_eq!(paths.resolve("cfg.ldap.", "/smtp/host"), "cfg.smtp.host");
    }

    #[test]
    fn custom_separator_is_used_everywhere() {
        let paths = PathResolver::new(":", "");
        assert_eq!(paths.entry_prefix("a:", "rep", 3), "a:rep:3:");
        assert_eq!(paths.resolve("a:rep:3:", "../x"), "a:rep:x");
        assert_eq!(paths.from_slash_path("a/rep/3/x"), "a:rep:3:x");
    }
}
