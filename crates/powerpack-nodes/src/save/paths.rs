//! Output path templates
//!
//! Templates are relative to the output root. `[time(FORMAT)]` tokens expand
//! to the local time; anything that would leave the root is rejected.

use std::path::{Component, Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{PowerpackError, Result};

static TIME_TOKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\[time\((.*?)\)\]").ok());

/// `now` formatted with a strftime pattern, or `None` if the pattern is invalid.
fn strftime(now: &DateTime<Local>, pattern: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    Some(now.format_with_items(items.into_iter()).to_string())
}

/// Replace every `[time(FORMAT)]` token. Invalid formats leave the token as is.
pub fn expand_time_tokens(text: &str, now: &DateTime<Local>) -> String {
    match TIME_TOKEN.as_ref() {
        Some(re) => re
            .replace_all(text, |caps: &Captures<'_>| {
                strftime(now, &caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned(),
        None => text.to_string(),
    }
}

/// Confines output directories to one root
#[derive(Debug, Clone)]
pub struct OutputSandbox {
    root: PathBuf,
}

impl OutputSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a template points at, without touching the filesystem.
    pub fn check(&self, template: &str, now: &DateTime<Local>) -> Result<PathBuf> {
        let root = std::path::absolute(&self.root)?;
        let expanded = expand_time_tokens(template.trim(), now).replace('\\', "/");
        let relative = expanded.trim_start_matches('/');
        if relative.is_empty() {
            return Ok(root);
        }

        let rejected = || PowerpackError::PathSecurity {
            path: template.to_string(),
        };

        let mut target = root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => target.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(rejected())
                }
            }
        }

        if !target.starts_with(&root) {
            return Err(rejected());
        }
        Ok(target)
    }

    /// Checked directory for a template, created if missing.
    pub fn resolve(&self, template: &str, now: &DateTime<Local>) -> Result<PathBuf> {
        let dir = self.check(template, now)?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_time_tokens() {
        let now = fixed_now();
        assert_eq!(
            expand_time_tokens("shots/[time(%Y-%m-%d)]/[time(%H)]", &now),
            "shots/2025-03-09/14"
        );
        assert_eq!(expand_time_tokens("[time(%Q)]/x", &now), "[time(%Q)]/x");
        assert_eq!(expand_time_tokens("plain", &now), "plain");
    }

    #[test]
    fn test_nested_dir_created() {
        let dir = tempdir().unwrap();
        let sandbox = OutputSandbox::new(dir.path());
        let resolved = sandbox.resolve("2025/shoot1", &fixed_now()).unwrap();

        assert_eq!(resolved, std::path::absolute(dir.path().join("2025/shoot1")).unwrap());
        assert!(resolved.is_dir());
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = tempdir().unwrap();
        let sandbox = OutputSandbox::new(dir.path().join("out"));
        for template in ["../../etc", "a/../../b", "ok/..", "..\\secrets"] {
            let err = sandbox.resolve(template, &fixed_now()).unwrap_err();
            assert!(
                matches!(err, PowerpackError::PathSecurity { .. }),
                "{template} was not rejected"
            );
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_leading_slashes_backslashes_and_empty() {
        let dir = tempdir().unwrap();
        let sandbox = OutputSandbox::new(dir.path());
        let root = std::path::absolute(dir.path()).unwrap();
        let now = fixed_now();

        assert_eq!(sandbox.check("//abs/path", &now).unwrap(), root.join("abs/path"));
        assert_eq!(sandbox.check("sub\\dir", &now).unwrap(), root.join("sub/dir"));
        assert_eq!(sandbox.check("   ", &now).unwrap(), root);
        assert_eq!(sandbox.check("./a/./b", &now).unwrap(), root.join("a/b"));
        assert_eq!(
            sandbox.check("[time(%Y)]/x", &now).unwrap(),
            root.join("2025/x")
        );
    }
}
