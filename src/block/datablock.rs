//! Section/key value store for one evaluation.
//!
//! A fresh block is created for every evaluation, filled by the bridge,
//! mutated by the pipeline engine, read once for the result and dropped.
//! Section and key names are case-insensitive (stored lowercased), matching
//! the pipeline engine's own store.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

use nalgebra::DMatrix;

use crate::block::names::{ValueShape, expected_shape};
use crate::error::{BridgeError, Result};

/// Values sampled on a 2-D grid; `values[(i, j)]` belongs to `(x[i], y[j])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub x_name: String,
    pub x: Vec<f64>,
    pub y_name: String,
    pub y: Vec<f64>,
    pub values: DMatrix<f64>,
}

impl Grid {
    /// Value at `(x[i], y[j])`.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Grid(Grid),
}

impl BlockValue {
    pub fn shape(&self) -> ValueShape {
        match self {
            BlockValue::Scalar(_) => ValueShape::Scalar,
            BlockValue::Vector(_) => ValueShape::Vector,
            BlockValue::Grid(_) => ValueShape::Grid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBlock {
    entries: BTreeMap<(String, String), BlockValue>,
}

impl DataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one at the same location.
    pub fn put(&mut self, section: &str, key: &str, value: BlockValue) -> Result<()> {
        let (section, key) = (section.to_lowercase(), key.to_lowercase());
        if let Some(expected) = expected_shape(&section, &key) {
            if expected != value.shape() {
                return Err(BridgeError::ShapeMismatch {
                    section,
                    key,
                    expected: expected.label(),
                    found: value.shape().label(),
                });
            }
        }
        self.entries.insert((section, key), value);
        Ok(())
    }

    pub fn put_scalar(&mut self, section: &str, key: &str, value: f64) -> Result<()> {
        self.put(section, key, BlockValue::Scalar(value))
    }

    pub fn put_vector(&mut self, section: &str, key: &str, values: Vec<f64>) -> Result<()> {
        self.put(section, key, BlockValue::Vector(values))
    }

    /// Store a grid under `grid_name`. `values` must be `x.len() × y.len()`.
    pub fn put_grid(
        &mut self,
        section: &str,
        (x_name, x): (&str, Vec<f64>),
        (y_name, y): (&str, Vec<f64>),
        grid_name: &str,
        values: DMatrix<f64>,
    ) -> Result<()> {
        if values.shape() != (x.len(), y.len()) {
            return Err(BridgeError::InvalidGrid(format!(
                "[{section}] {grid_name}: {:?} values for {} × {} axes",
                values.shape(),
                x.len(),
                y.len()
            )));
        }
        let grid = Grid {
            x_name: x_name.to_lowercase(),
            x,
            y_name: y_name.to_lowercase(),
            y,
            values,
        };
        self.put(section, grid_name, BlockValue::Grid(grid))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&BlockValue> {
        self.entries
            .get(&(section.to_lowercase(), key.to_lowercase()))
    }

    pub fn get_scalar(&self, section: &str, key: &str) -> Option<f64> {
        match self.get(section, key)? {
            BlockValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// A stored vector, or the axis of the same name of a grid in `section`.
    pub fn get_vector(&self, section: &str, key: &str) -> Option<&[f64]> {
        if let Some(BlockValue::Vector(v)) = self.get(section, key) {
            return Some(v);
        }
        let section = section.to_lowercase();
        let key = key.to_lowercase();
        self.entries
            .iter()
            .filter(|((s, _), _)| *s == section)
            .find_map(|(_, value)| match value {
                BlockValue::Grid(g) if g.x_name == key => Some(g.x.as_slice()),
                BlockValue::Grid(g) if g.y_name == key => Some(g.y.as_slice()),
                _ => None,
            })
    }

    pub fn get_grid(&self, section: &str, key: &str) -> Option<&Grid> {
        match self.get(section, key)? {
            BlockValue::Grid(g) => Some(g),
            _ => None,
        }
    }

    pub fn has_section(&self, section: &str) -> bool {
        let section = section.to_lowercase();
        self.entries.keys().any(|(s, _)| *s == section)
    }

    /// Keys of one section, sorted.
    pub fn keys(&self, section: &str) -> Vec<&str> {
        let section = section.to_lowercase();
        self.entries
            .keys()
            .filter(|(s, _)| *s == section)
            .map(|(_, k)| k.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the block to `dir`: one subdirectory per section holding
    /// `values.txt` (scalars as `key = value`), one file per vector, and
    /// three files per grid (both axes and the value matrix, one row per
    /// x value).
    pub fn save_to_directory(&self, dir: &Path) -> Result<()> {
        let mut sections: BTreeMap<&str, Vec<(&str, &BlockValue)>> = BTreeMap::new();
        for ((section, key), value) in &self.entries {
            sections
                .entry(section.as_str())
                .or_default()
                .push((key.as_str(), value));
        }

        for (section, entries) in sections {
            let section_dir = dir.join(section);
            create_dir_all(&section_dir).map_err(|source| BridgeError::Dump {
                path: section_dir.clone(),
                source,
            })?;

            let mut scalars = String::new();
            for (key, value) in entries {
                match value {
                    BlockValue::Scalar(v) => {
                        let _ = writeln!(scalars, "{key} = {v}");
                    }
                    BlockValue::Vector(values) => {
                        write_text(&section_dir.join(format!("{key}.txt")), &column(values))?;
                    }
                    BlockValue::Grid(grid) => {
                        write_text(&section_dir.join(format!("{}.txt", grid.x_name)), &column(&grid.x))?;
                        write_text(&section_dir.join(format!("{}.txt", grid.y_name)), &column(&grid.y))?;
                        write_text(&section_dir.join(format!("{key}.txt")), &matrix(&grid.values))?;
                    }
                }
            }
            if !scalars.is_empty() {
                write_text(&section_dir.join("values.txt"), &scalars)?;
            }
        }
        Ok(())
    }
}

fn column(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 24);
    for v in values {
        let _ = writeln!(out, "{v:e}");
    }
    out
}

fn matrix(values: &DMatrix<f64>) -> String {
    let mut out = String::new();
    for row in values.row_iter() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:e}")).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    let dump_err = |source| BridgeError::Dump {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(dump_err)?;
    file.write_all(text.as_bytes()).map_err(dump_err)
}
