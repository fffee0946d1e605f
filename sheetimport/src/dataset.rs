//! Rectangular dataset: named numeric series over observations
//!
//! Slot 0 always holds the constant series named [`Dataset::CONST_NAME`];
//! imported variables start at index 1. Missing values are `None`.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::error::{ImportError, Result};

static VARNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

/// Sampling frequency inferred from serial-date labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Annual,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarterly => "quarterly",
            Frequency::Monthly => "monthly",
            Frequency::Weekly => "weekly",
            Frequency::Daily => "daily",
        }
    }
}

/// Where an imported dataset came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source: PathBuf,
    pub format: String,
    pub sheet: String,
}

/// How an import combines with a caller's existing dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Add new variables/observations, overwrite same-named variables
    #[default]
    Append,
    /// Discard the existing dataset
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    varnames: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
    labels: Option<Vec<String>>,
    nobs: usize,
    frequency: Option<Frequency>,
    provenance: Option<Provenance>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::empty()
    }
}

impl Dataset {
    pub const CONST_NAME: &'static str = "const";
    /// Longest accepted variable name, in characters
    pub const MAX_NAME_LEN: usize = 31;
    /// Observation labels are truncated to this many characters
    pub const MAX_LABEL_LEN: usize = 15;

    /// A dataset with no variables and no observations
    pub fn empty() -> Self {
        Self {
            varnames: vec![Self::CONST_NAME.to_string()],
            columns: vec![Vec::new()],
            labels: None,
            nobs: 0,
            frequency: None,
            provenance: None,
        }
    }

    /// Allocate `nvars` blank variables (plus the constant) over `nobs`
    /// observations, with an observation-label column if `with_labels`
    pub fn allocate(nvars: usize, nobs: usize, with_labels: bool) -> Result<Self> {
        let mut varnames = Vec::new();
        varnames.try_reserve_exact(nvars + 1)?;
        varnames.push(Self::CONST_NAME.to_string());
        varnames.resize(nvars + 1, String::new());

        let mut columns = Vec::new();
        columns.try_reserve_exact(nvars + 1)?;
        columns.push(filled(nobs, Some(1.0))?);
        for _ in 0..nvars {
            columns.push(filled(nobs, None)?);
        }

        let labels = if with_labels {
            let mut labels = Vec::new();
            labels.try_reserve_exact(nobs)?;
            labels.resize(nobs, String::new());
            Some(labels)
        } else {
            None
        };

        Ok(Self {
            varnames,
            columns,
            labels,
            nobs,
            frequency: None,
            provenance: None,
        })
    }

    /// Number of variables, not counting the constant
    pub fn nvars(&self) -> usize {
        self.varnames.len() - 1
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn is_empty(&self) -> bool {
        self.nvars() == 0 && self.nobs == 0
    }

    pub fn varname(&self, i: usize) -> Option<&str> {
        self.varnames.get(i).map(String::as_str)
    }

    /// Names of the imported variables, in slot order
    pub fn varnames(&self) -> &[String] {
        &self.varnames[1..]
    }

    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.varnames.iter().skip(1).position(|n| n == name).map(|p| p + 1)
    }

    pub fn set_varname(&mut self, i: usize, name: String) -> Result<()> {
        if i == 0 || i >= self.varnames.len() {
            return Err(ImportError::data(format!(
                "variable index {} outside 1..={}",
                i,
                self.nvars()
            )));
        }
        self.varnames[i] = name;
        Ok(())
    }

    /// Name every variable `v1`..`vN`
    pub fn synthesize_names(&mut self) {
        for (i, name) in self.varnames.iter_mut().enumerate().skip(1) {
            *name = format!("v{}", i);
        }
    }

    pub fn column(&self, i: usize) -> Option<&[Option<f64>]> {
        self.columns.get(i).map(Vec::as_slice)
    }

    pub fn value(&self, i: usize, t: usize) -> Option<f64> {
        self.columns.get(i).and_then(|c| c.get(t)).copied().flatten()
    }

    pub fn set_value(&mut self, i: usize, t: usize, value: Option<f64>) -> Result<()> {
        let (nvars, nobs) = (self.nvars(), self.nobs);
        match self.columns.get_mut(i).and_then(|c| c.get_mut(t)) {
            Some(slot) if i > 0 => {
                *slot = value;
                Ok(())
            }
            _ => Err(ImportError::data(format!(
                "value position (variable {}, observation {}) outside {}x{} dataset",
                i,
                t + 1,
                nvars,
                nobs
            ))),
        }
    }

    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn label(&self, t: usize) -> Option<&str> {
        self.labels.as_ref().and_then(|l| l.get(t)).map(String::as_str)
    }

    /// Store an observation label, truncated to [`Self::MAX_LABEL_LEN`]
    pub fn set_label(&mut self, t: usize, label: &str) -> Result<()> {
        let nobs = self.nobs;
        let slot = self
            .labels
            .as_mut()
            .ok_or_else(|| ImportError::data("dataset has no observation labels"))?
            .get_mut(t)
            .ok_or_else(|| {
                ImportError::data(format!("observation {} outside 1..={}", t + 1, nobs))
            })?;
        *slot = label.chars().take(Self::MAX_LABEL_LEN).collect();
        Ok(())
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: Option<Frequency>) {
        self.frequency = frequency;
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    pub fn set_provenance(&mut self, provenance: Provenance) {
        self.provenance = Some(provenance);
    }

    /// Drop variables holding no value at all; returns their names
    pub fn prune_empty(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        let mut i = 1;
        while i < self.columns.len() {
            if self.columns[i].iter().all(Option::is_none) {
                self.columns.remove(i);
                dropped.push(self.varnames.remove(i));
            } else {
                i += 1;
            }
        }
        dropped
    }

    /// Every variable must carry a name
    pub fn validate_names(&self) -> Result<()> {
        match self.varnames.iter().skip(1).position(|n| n.is_empty()) {
            Some(p) => Err(ImportError::data(format!(
                "variable {} has no name",
                p + 1
            ))),
            None => Ok(()),
        }
    }

    /// Combine `incoming` into this dataset.
    ///
    /// Nothing is modified unless every allocation succeeds.
    pub fn merge(&mut self, incoming: Dataset, mode: MergeMode) -> Result<()> {
        if mode == MergeMode::Replace || self.is_empty() {
            *self = incoming;
            return Ok(());
        }

        let (rows, new_nobs, new_labels) = self.align_rows(&incoming);
        let added = new_nobs - self.nobs;

        // Reserve everything before touching the target
        for column in &mut self.columns {
            column.try_reserve_exact(added)?;
        }
        if let Some(labels) = &mut self.labels {
            labels.try_reserve_exact(added)?;
        }
        let mut fresh: Vec<(String, Vec<Option<f64>>)> = Vec::new();
        for name in incoming.varnames() {
            if self.var_index(name).is_none() {
                fresh.try_reserve(1)?;
                fresh.push((name.clone(), filled(new_nobs, None)?));
            }
        }
        self.varnames.try_reserve(fresh.len())?;
        self.columns.try_reserve(fresh.len())?;

        self.columns[0].resize(new_nobs, Some(1.0));
        for column in self.columns.iter_mut().skip(1) {
            column.resize(new_nobs, None);
        }
        if let Some(labels) = &mut self.labels {
            labels.extend(new_labels);
        } else if incoming.labels.is_some() && incoming.nobs == self.nobs {
            self.labels = incoming.labels.clone();
        }
        for (name, column) in fresh {
            self.varnames.push(name);
            self.columns.push(column);
        }
        self.nobs = new_nobs;

        for (j, name) in incoming.varnames().iter().enumerate() {
            let Some(i) = self.var_index(name) else {
                continue;
            };
            for (t, value) in incoming.columns[j + 1].iter().enumerate() {
                self.columns[i][rows[t]] = *value;
            }
        }

        if self.frequency.is_none() {
            self.frequency = incoming.frequency;
        }
        Ok(())
    }

    /// Target row for each incoming observation, the merged row count and
    /// the labels of appended rows. Rows are matched by label only when
    /// both sides carry non-blank, unique labels; otherwise by position.
    fn align_rows(&self, incoming: &Dataset) -> (Vec<usize>, usize, Vec<String>) {
        match (&self.labels, &incoming.labels) {
            (Some(own), Some(theirs)) if usable_as_keys(own) && usable_as_keys(theirs) => {
                let mut index: HashMap<&str, usize> = HashMap::new();
                for (t, label) in own.iter().enumerate() {
                    index.entry(label.as_str()).or_insert(t);
                }
                let mut appended = Vec::new();
                let rows = theirs
                    .iter()
                    .map(|label| match index.get(label.as_str()) {
                        Some(&t) => t,
                        None => {
                            let t = self.nobs + appended.len();
                            index.insert(label.as_str(), t);
                            appended.push(label.clone());
                            t
                        }
                    })
                    .collect();
                (rows, self.nobs + appended.len(), appended)
            }
            _ => {
                let new_nobs = self.nobs.max(incoming.nobs);
                let rows = (0..incoming.nobs).collect();
                let appended = match &incoming.labels {
                    Some(theirs) => theirs[self.nobs.min(theirs.len())..].to_vec(),
                    None => vec![String::new(); new_nobs - self.nobs],
                };
                (rows, new_nobs, appended)
            }
        }
    }
}

fn usable_as_keys(labels: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(labels.len());
    labels
        .iter()
        .all(|label| !label.trim().is_empty() && seen.insert(label.as_str()))
}

fn filled(n: usize, value: Option<f64>) -> Result<Vec<Option<f64>>> {
    let mut column = Vec::new();
    column.try_reserve_exact(n)?;
    column.resize(n, value);
    Ok(column)
}

/// Turn a header cell into a variable name: spaces become underscores,
/// then the result must be an identifier no longer than
/// [`Dataset::MAX_NAME_LEN`] and must not shadow the constant.
pub fn check_varname(raw: &str) -> Result<String> {
    let name = raw.trim().replace(' ', "_");
    if name.is_empty() {
        return Err(ImportError::data("empty variable name"));
    }
    if name.chars().count() > Dataset::MAX_NAME_LEN {
        return Err(ImportError::data(format!(
            "variable name '{}' is longer than {} characters",
            name,
            Dataset::MAX_NAME_LEN
        )));
    }
    if !VARNAME_RE.is_match(&name) {
        return Err(ImportError::data(format!(
            "'{}' is not a valid variable name: use letters, digits and '_', starting with a letter",
            name
        )));
    }
    if name == Dataset::CONST_NAME {
        return Err(ImportError::data(format!(
            "'{}' is reserved for the constant",
            name
        )));
    }
    Ok(name)
}
