use crate::error::{ExportToolError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};

const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces characters that are not allowed in file names with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Workbook file name without its extension, sanitized.
pub fn workbook_base_name(workbook: &Path) -> String {
    let stem = workbook
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_name(&stem)
}

/// What to do when a job's output folder already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `_2`, `_3`, ... until the name is free
    Suffix,
    /// Write into the existing folder
    Reuse,
}

/// Timestamp pattern for folder names.
///
/// Accepts .NET style patterns such as `dd-MM-yyyy_HHmm` and, when the
/// pattern contains a `%`, chrono strftime patterns such as `%d-%m-%Y_%H%M`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    strftime: String,
}

impl DatePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(ExportToolError::Config {
                message: "Date format cannot be empty".to_string(),
            });
        }

        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            dotnet_to_strftime(pattern)?
        };

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(ExportToolError::Config {
                message: format!("Invalid date format: {}", pattern),
            });
        }

        // timezone items parse fine but cannot render from a local naive time
        render(&strftime, &NaiveDateTime::default()).map_err(|_| ExportToolError::Config {
            message: format!("Date format cannot use timezone fields: {}", pattern),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            strftime,
        })
    }

    /// Infallible once `parse` has accepted the pattern.
    pub fn format(&self, at: &NaiveDateTime) -> String {
        render(&self.strftime, at).unwrap_or_default()
    }

    pub fn as_strftime(&self) -> &str {
        &self.strftime
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn render(strftime: &str, at: &NaiveDateTime) -> std::result::Result<String, fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", at.format(strftime))?;
    Ok(out)
}

fn dotnet_to_strftime(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            let close = chars[i + 1..]
                .iter()
                .position(|&q| q == c)
                .ok_or_else(|| ExportToolError::Config {
                    message: format!("Unterminated quoted literal in date format: {}", pattern),
                })?;
            for &lit in &chars[i + 1..i + 1 + close] {
                push_literal(&mut out, lit);
            }
            i += close + 2;
            continue;
        }

        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                push_literal(&mut out, next);
            }
            i += 2;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let directive = match (c, run) {
            ('y', 1..=2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', 2) => Some("%d"),
            ('d', 3) => Some("%a"),
            ('d', _) => Some("%A"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            ('f', 1..=3) => Some("%3f"),
            ('f', 4..=6) => Some("%6f"),
            ('f', _) => Some("%9f"),
            ('t', _) => Some("%p"),
            _ => None,
        };

        match directive {
            Some(directive) => {
                out.push_str(directive);
                i += run;
            }
            None => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Derives `<safeBase>_<timestamp>` folders under a destination root.
#[derive(Debug, Clone)]
pub struct OutputFolderNamer {
    root: PathBuf,
    pattern: DatePattern,
    policy: CollisionPolicy,
}

impl OutputFolderNamer {
    pub fn new(root: PathBuf, pattern: DatePattern, policy: CollisionPolicy) -> Self {
        Self {
            root,
            pattern,
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_name(&self, workbook: &Path, at: &NaiveDateTime) -> String {
        // the timestamp is sanitized too so patterns like yyyy/MM/dd stay one folder
        format!(
            "{}_{}",
            workbook_base_name(workbook),
            sanitize_name(&self.pattern.format(at))
        )
    }

    /// Folder the job would use, without touching the filesystem.
    pub fn folder_path(&self, workbook: &Path, at: &NaiveDateTime) -> PathBuf {
        self.root.join(self.folder_name(workbook, at))
    }

    /// Resolves the collision policy and creates the folder with its parents.
    pub fn create(&self, workbook: &Path, at: &NaiveDateTime) -> Result<PathBuf> {
        let folder = self.resolve(workbook, at, |candidate| candidate.exists());
        fs::create_dir_all(&folder)?;
        Ok(folder)
    }

    /// The folder `create` would pick, given the folders already `reserved`
    /// by earlier planned jobs. Creates nothing.
    pub fn preview(
        &self,
        workbook: &Path,
        at: &NaiveDateTime,
        reserved: &mut HashSet<PathBuf>,
    ) -> PathBuf {
        let folder = self.resolve(workbook, at, |candidate| {
            candidate.exists() || reserved.contains(candidate)
        });
        reserved.insert(folder.clone());
        folder
    }

    fn resolve<F>(&self, workbook: &Path, at: &NaiveDateTime, taken: F) -> PathBuf
    where
        F: Fn(&Path) -> bool,
    {
        let base = self.folder_name(workbook, at);
        let mut folder = self.root.join(&base);

        if self.policy == CollisionPolicy::Suffix {
            let mut n = 2;
            while taken(&folder) {
                folder = self.root.join(format!("{}_{}", base, n));
                n += 1;
            }
        }

        folder
    }
}
