/*!
The glob module implements the `-g` include/exclude filter. Patterns with a
leading `!` exclude; everything else includes. All includes compile into
one `globset::GlobSet` and all excludes into another, so the per-file cost
is two set lookups regardless of how many globs were given.

Semantics: an exclude match always wins; when at least one include pattern
exists, files must match some include. Directories are only subject to
excludes, so `-g '*.rs'` does not stop the walker from descending into
`src/`.
*/

use std::path::Path;

use globset::{Error, GlobBuilder, GlobSet, GlobSetBuilder};

#[derive(Clone, Debug)]
pub struct Overrides {
    includes: GlobSet,
    excludes: GlobSet,
    num_includes: usize,
}

impl Overrides {
    /// Returns true if the path survives the filter.
    pub fn matched<P: AsRef<Path>>(&self, path: P, is_dir: bool) -> bool {
        let path = path.as_ref();
        if self.excludes.is_match(path) {
            return false;
        }
        if is_dir || self.num_includes == 0 {
            return true;
        }
        self.includes.is_match(path)
    }

    /// True when no globs were given at all.
    pub fn is_empty(&self) -> bool {
        self.num_includes == 0 && self.excludes.is_empty()
    }
}

pub struct OverridesBuilder {
    includes: GlobSetBuilder,
    excludes: GlobSetBuilder,
    num_includes: usize,
}

impl OverridesBuilder {
    pub fn new() -> OverridesBuilder {
        OverridesBuilder {
            includes: GlobSetBuilder::new(),
            excludes: GlobSetBuilder::new(),
            num_includes: 0,
        }
    }

    /// Adds one glob; a leading `!` marks an exclusion. Brace alternation
    /// (`{a,b}`) is enabled.
    pub fn add(&mut self, glob: &str) -> Result<&mut OverridesBuilder, Error> {
        let (negated, glob) = match glob.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, glob),
        };
        let parsed = GlobBuilder::new(glob)
            .literal_separator(false)
            .build()?;
        if negated {
            self.excludes.add(parsed);
        } else {
            self.includes.add(parsed);
            self.num_includes += 1;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Overrides, Error> {
        Ok(Overrides {
            includes: self.includes.build()?,
            excludes: self.excludes.build()?,
            num_includes: self.num_includes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(globs: &[&str]) -> Overrides {
        let mut b = OverridesBuilder::new();
        for g in globs {
            b.add(g).unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn empty_allows_everything() {
        let o = overrides(&[]);
        assert!(o.is_empty());
        assert!(o.matched("anything.bin", false));
    }

    #[test]
    fn includes_restrict_files() {
        let o = overrides(&["*.rs"]);
        assert!(o.matched("main.rs", false));
        assert!(o.matched("src/deep/lib.rs", false));
        assert!(!o.matched("notes.txt", false));
    }

    #[test]
    fn excludes_always_win() {
        let o = overrides(&["*.rs", "!generated.rs"]);
        assert!(o.matched("main.rs", false));
        assert!(!o.matched("generated.rs", false));
    }

    #[test]
    fn excludes_only() {
        let o = overrides(&["!*.min.js"]);
        assert!(o.matched("app.js", false));
        assert!(!o.matched("app.min.js", false));
    }

    #[test]
    fn directories_ignore_includes() {
        let o = overrides(&["*.rs"]);
        assert!(o.matched("src", true));
        let o = overrides(&["!target"]);
        assert!(!o.matched("target", true));
    }

    #[test]
    fn brace_alternation() {
        let o = overrides(&["*.{rs,toml}"]);
        assert!(o.matched("Cargo.toml", false));
        assert!(o.matched("main.rs", false));
        assert!(!o.matched("README.md", false));
    }

    #[test]
    fn bad_glob_is_an_error() {
        assert!(OverridesBuilder::new().add("a[").is_err());
    }
}
