//! Emission source data: simulation frames of `[px, py, pz, vx, vy, vz, pressure]` rows.
//!
//! The JSON form is what the particle backend is initialised from. The CSV reader mirrors the
//! offline conversion step used to produce that JSON from raw solver dumps: rows are decimated
//! by a fixed stride, capped per file, and optionally filtered.

use crate::error::SourceError;
use anyhow::{Context, Result};
use glam::Vec3;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const COLUMNS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub pressure: f32,
}

impl SourceParticle {
    fn from_row(row: [f32; COLUMNS]) -> Self {
        Self {
            position: Vec3::new(row[0], row[1], row[2]),
            velocity: Vec3::new(row[3], row[4], row[5]),
            pressure: row[6],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceData {
    frames: Vec<Vec<SourceParticle>>,
}

impl SourceData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read emission source {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid emission source {}", path.display()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let raw: Vec<Vec<Vec<f64>>> = serde_json::from_str(contents).context("expected [[[f64; 7]]]")?;
        Ok(Self::from_rows(raw)?)
    }

    pub fn from_rows(raw: Vec<Vec<Vec<f64>>>) -> Result<Self, SourceError> {
        if raw.is_empty() {
            return Err(SourceError::NoFrames);
        }
        let mut frames = Vec::with_capacity(raw.len());
        for (frame_idx, rows) in raw.into_iter().enumerate() {
            if rows.is_empty() {
                return Err(SourceError::EmptyFrame { frame: frame_idx });
            }
            let mut frame = Vec::with_capacity(rows.len());
            for (row_idx, row) in rows.into_iter().enumerate() {
                if row.len() != COLUMNS {
                    return Err(SourceError::BadRow { frame: frame_idx, row: row_idx, found: row.len() });
                }
                let mut values = [0.0f32; COLUMNS];
                for (column, value) in row.into_iter().enumerate() {
                    let value = value as f32;
                    if !value.is_finite() {
                        return Err(SourceError::NonFinite { frame: frame_idx, row: row_idx, column });
                    }
                    values[column] = value;
                }
                frame.push(SourceParticle::from_row(values));
            }
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    /// Parses one solver dump per entry in `files`. The first line of each file is a header.
    /// Every `stride`-th data line is kept, reading stops after `max_lines`, and `keep`
    /// decides whether a parsed row survives.
    pub fn from_csv_frames<F>(
        files: &[&str],
        stride: usize,
        max_lines: usize,
        keep: F,
    ) -> Result<Self, SourceError>
    where
        F: Fn(&SourceParticle) -> bool,
    {
        let stride = stride.max(1);
        let mut raw = Vec::with_capacity(files.len());
        for contents in files {
            let mut rows = Vec::new();
            for (line_idx, line) in contents.lines().enumerate() {
                if line_idx > max_lines {
                    break;
                }
                if line_idx == 0 || line_idx % stride != 0 || line.trim().is_empty() {
                    continue;
                }
                let mut values = Vec::with_capacity(COLUMNS);
                for field in line.split(',') {
                    let value = field.trim().parse::<f64>().map_err(|_| SourceError::BadNumber {
                        line: line_idx + 1,
                        value: field.trim().to_string(),
                    })?;
                    values.push(value);
                }
                if values.len() == COLUMNS {
                    let mut row = [0.0f32; COLUMNS];
                    for (dst, src) in row.iter_mut().zip(&values) {
                        *dst = *src as f32;
                    }
                    if !keep(&SourceParticle::from_row(row)) {
                        continue;
                    }
                }
                rows.push(values);
            }
            raw.push(rows);
        }
        Self::from_rows(raw)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&[SourceParticle]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    pub fn particles_in_frame(&self, index: usize) -> usize {
        self.frames.get(index).map_or(0, Vec::len)
    }

    pub fn total_particles(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    /// Minimum and maximum pressure across all frames.
    pub fn pressure_range(&self) -> (f32, f32) {
        self.frames.iter().flatten().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.pressure), hi.max(p.pressure))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<Vec<[f32; COLUMNS]>> = self
            .frames
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|p| {
                        let (pos, vel) = (p.position, p.velocity);
                        [pos.x, pos.y, pos.z, vel.x, vel.y, vel.z, p.pressure]
                    })
                    .collect()
            })
            .collect();
        Ok(serde_json::to_string(&rows)?)
    }
}
