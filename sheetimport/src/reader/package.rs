//! Archive access: the zip package extracted under a scratch directory

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use zip::ZipArchive;

use super::xml_tree::{self, XmlDocument};
use crate::error::{ImportError, Result};

/// An opened xlsx package. The scratch directory lives as long as the
/// package and is removed when it is dropped, on success or failure.
#[derive(Debug)]
pub struct Package {
    source: PathBuf,
    scratch: TempDir,
    members: Vec<String>,
}

impl Package {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = path.as_ref().to_path_buf();
        let file = File::open(&source).map_err(|e| {
            ImportError::archive(format!("failed to open {}: {}", source.display(), e))
        })?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            ImportError::archive(format!("{} is not a zip archive: {}", source.display(), e))
        })?;

        let scratch = tempfile::Builder::new().prefix("sheetimport-").tempdir()?;
        let mut members = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let relative = entry.enclosed_name().ok_or_else(|| {
                ImportError::archive(format!("member '{}' escapes the package root", name))
            })?;
            let dest = scratch.path().join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest)?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)?;
            io::copy(&mut entry, &mut out)?;
            members.push(name);
        }

        debug!(
            path = %source.display(),
            members = members.len(),
            scratch = %scratch.path().display(),
            "extracted package"
        );

        Ok(Self {
            source,
            scratch,
            members,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn member_names(&self) -> &[String] {
        &self.members
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Members directly inside `dir` (e.g. "xl/worksheets") with the given extension
    pub fn members_in(&self, dir: &str, extension: &str) -> Vec<&str> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.members
            .iter()
            .filter_map(|m| m.strip_prefix(&prefix).map(|rest| (m, rest)))
            .filter(|(_, rest)| !rest.contains('/') && rest.ends_with(extension))
            .map(|(m, _)| m.as_str())
            .collect()
    }

    /// Parse a member as XML, validating the root element name
    pub fn read_xml(&self, name: &str, root: &str) -> Result<XmlDocument> {
        if !self.has_member(name) {
            return Err(ImportError::archive(format!(
                "{} has no member '{}'",
                self.source.display(),
                name
            )));
        }
        let file = File::open(self.scratch.path().join(name))?;
        xml_tree::parse(BufReader::new(file), root).map_err(|e| match e {
            ImportError::Archive(msg) => ImportError::archive(format!("{}: {}", name, msg)),
            ImportError::Xml(err) => ImportError::archive(format!("malformed XML in {}: {}", name, err)),
            other => other,
        })
    }
}
