//! Include/exclude glob matching for watched paths (spec §4.15).

use std::path::Path;

use glob::Pattern;

#[derive(Clone, Default)]
pub struct GlobFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl GlobFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self, glob::PatternError> {
        Ok(GlobFilter {
            includes: includes.iter().map(|p| Pattern::new(p)).collect::<Result<_, _>>()?,
            excludes: excludes.iter().map(|p| Pattern::new(p)).collect::<Result<_, _>>()?,
        })
    }

    /// Empty include list means "everything matches" unless excluded.
    pub fn matches(&self, path: &Path) -> bool {
        let included = self.includes.is_empty() || self.includes.iter().any(|p| p.matches_path(path));
        let excluded = self.excludes.iter().any(|p| p.matches_path(path));
        included && !excluded
    }
}
