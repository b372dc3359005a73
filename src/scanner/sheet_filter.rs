use crate::config::SheetConfig;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotIncluded,
    Excluded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotIncluded => write!(f, "not in include list"),
            SkipReason::Excluded => write!(f, "in exclude list"),
        }
    }
}

/// Outcome of filtering a workbook's sheet list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSelection {
    /// Selected sheets, in workbook order
    pub selected: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Case-insensitive include/exclude filter on exact sheet names.
///
/// An empty include list keeps every sheet. Exclude is applied after include,
/// and names that match no sheet are ignored.
#[derive(Debug, Clone, Default)]
pub struct SheetFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl SheetFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Self {
        Self {
            include: fold_all(include),
            exclude: fold_all(exclude),
        }
    }

    pub fn from_config(config: &SheetConfig) -> Self {
        Self::new(&config.include, &config.exclude)
    }

    pub fn check(&self, name: &str) -> Option<SkipReason> {
        let folded = name.to_lowercase();

        if !self.include.is_empty() && !self.include.contains(&folded) {
            return Some(SkipReason::NotIncluded);
        }

        if self.exclude.contains(&folded) {
            return Some(SkipReason::Excluded);
        }

        None
    }

    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> SheetSelection {
        let mut selection = SheetSelection::default();

        for name in names {
            let name = name.as_ref();
            match self.check(name) {
                None => selection.selected.push(name.to_string()),
                Some(reason) => selection.skipped.push((name.to_string(), reason)),
            }
        }

        selection
    }
}

fn fold_all<S: AsRef<str>>(names: &[S]) -> HashSet<String> {
    names.iter().map(|n| n.as_ref().to_lowercase()).collect()
}

/// Selected sheet names for `all` under the given include/exclude lists.
pub fn filter_sheets<S: AsRef<str>>(all: &[S], include: &[S], exclude: &[S]) -> Vec<String> {
    SheetFilter::new(include, exclude).select(all).selected
}
