// src/transform/perms.rs

//! File-mode fixups applied to items before they are written out.

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::Result;
use crate::item::Item;

/// Regular file with the executable bit set (octal 100755).
pub const EXECUTABLE_FILE_MODE: u32 = 0o100_755;

/// Directory mode forced on Windows outputs (octal 40755), where the
/// packaging step otherwise produces unreadable directories.
pub const WIN32_DIRECTORY_MODE: u32 = 0o040_755;

/// Sets the executable bit on matching items.
///
/// With no pattern, every file item gets the bit; with a glob pattern, only
/// items whose relative path matches it are touched and the rest pass
/// through unchanged.
#[derive(Debug)]
pub struct ExecutableBit {
    pattern: Option<GlobSet>,
}

impl ExecutableBit {
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let pattern = match pattern {
            None => None,
            Some(pat) => {
                let glob =
                    Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
                let mut builder = GlobSetBuilder::new();
                builder.add(glob);
                Some(builder.build().map_err(anyhow::Error::from)?)
            }
        };
        Ok(Self { pattern })
    }

    pub fn apply(&self, item: &mut Item) {
        if item.is_dir {
            return;
        }
        let matches = match &self.pattern {
            None => true,
            Some(set) => set.is_match(item.relative_str()),
        };
        if matches {
            item.mode = Some(EXECUTABLE_FILE_MODE);
        }
    }
}

/// Force a sane mode on directory items when building on Windows; a no-op on
/// every other platform.
pub fn fix_win32_directory_permissions(item: &mut Item) {
    if !cfg!(windows) {
        return;
    }
    if item.is_dir {
        item.mode = Some(WIN32_DIRECTORY_MODE);
    }
}
