//! Roadmap persistence
//!
//! One container file holds the whole experience database: a fixed header,
//! the state blobs (bit layout delegated to the caller's codec), the
//! vertex and edge records, and the motion-cache verdicts. All integers
//! are little-endian and fixed width. Interface bookkeeping is session
//! state and is not persisted.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::PlannerConfig;
use crate::data_structures::StateId;
use crate::error::PlanningError;
use crate::graph::{EdgeType, SparseGraph, SparseVertex, VertexType};
use crate::space::{StateCodec, StateSpace};

const MAGIC: [u8; 8] = *b"WAYMARK\0";
const FORMAT_VERSION: u32 = 1;

/// Free / in-collision verdict tags in the cache section.
const VERDICT_FREE: u8 = 1;
const VERDICT_IN_COLLISION: u8 = 2;

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed container: {0}")]
    Format(String),

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    #[error("container dimension {found} does not match space dimension {expected}")]
    DimensionMismatch { expected: u32, found: u32 },
}

impl From<StorageError> for PlanningError {
    fn from(error: StorageError) -> Self {
        PlanningError::InvalidArgument(error.to_string())
    }
}

/// Save/load frontend bound to one container path and state codec.
pub struct RoadmapStorage<S: StateSpace, C: StateCodec<S>> {
    path: PathBuf,
    codec: C,
    saving_enabled: bool,
    _space: PhantomData<fn() -> S>,
}

impl<S: StateSpace, C: StateCodec<S>> RoadmapStorage<S, C> {
    pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
        Self { path: path.into(), codec, saving_enabled: true, _space: PhantomData }
    }

    pub fn from_config(config: &PlannerConfig, codec: C) -> Self {
        Self {
            path: config.file_path.clone(),
            codec,
            saving_enabled: config.saving_enabled,
            _space: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the graph and cache to the container file.
    pub fn save(&self, graph: &mut SparseGraph<S>) -> Result<(), StorageError> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);

        // Live store states, remapped to dense ids 1..=n in id order.
        let mut state_remap: HashMap<StateId, u64> = HashMap::new();
        for (ordinal, (id, _)) in graph.cache().store().iter().enumerate() {
            state_remap.insert(id, ordinal as u64 + 1);
        }
        let num_states = state_remap.len() as u64;

        let vertices: Vec<SparseVertex> = graph.live_vertices().collect();
        let mut vertex_remap: HashMap<SparseVertex, u64> = HashMap::new();
        for (ordinal, &v) in vertices.iter().enumerate() {
            vertex_remap.insert(v, ordinal as u64);
        }

        let mut edges: Vec<(u64, u64, u8, f64)> = graph
            .edges_iter()
            .filter_map(|(pair, record)| {
                let u = vertex_remap.get(&pair.first())?;
                let v = vertex_remap.get(&pair.second())?;
                Some((*u, *v, record.edge_type.as_u8(), record.weight))
            })
            .collect();
        edges.sort_unstable_by_key(|&(u, v, _, _)| (u, v));

        writer.write_all(&MAGIC)?;
        write_u32(&mut writer, FORMAT_VERSION)?;
        write_u32(&mut writer, graph.space().dimension() as u32)?;
        write_u64(&mut writer, num_states)?;
        write_u64(&mut writer, vertices.len() as u64)?;
        write_u64(&mut writer, edges.len() as u64)?;

        let mut buf = vec![0u8; self.codec.state_size()];
        for (_, state) in graph.cache().store().iter() {
            self.codec.encode(state, &mut buf);
            writer.write_all(&buf)?;
        }

        for &v in &vertices {
            let state_id = state_remap
                .get(&graph.state_id(v))
                .ok_or_else(|| StorageError::Format(format!("vertex {} has no stored state", v.0)))?;
            write_u64(&mut writer, *state_id)?;
            writer.write_all(&[graph.vertex_type(v).as_u8()])?;
        }

        for (u, v, edge_type, weight) in &edges {
            write_u64(&mut writer, *u)?;
            write_u64(&mut writer, *v)?;
            writer.write_all(&[*edge_type])?;
            write_f64(&mut writer, *weight)?;
        }

        // Cache verdicts; the id remap is monotonic, so a < b survives it.
        let entries = graph.cache().entries();
        write_u64(&mut writer, entries.len() as u64)?;
        for (a, b, free) in entries {
            let a = state_remap
                .get(&a)
                .ok_or_else(|| StorageError::Format(format!("cache entry references freed state {}", a.0)))?;
            let b = state_remap
                .get(&b)
                .ok_or_else(|| StorageError::Format(format!("cache entry references freed state {}", b.0)))?;
            write_u64(&mut writer, *a)?;
            write_u64(&mut writer, *b)?;
            writer.write_all(&[if free { VERDICT_FREE } else { VERDICT_IN_COLLISION }])?;
        }

        writer.flush()?;
        graph.mark_saved();
        info!(
            "saved roadmap to {}: {} states, {} vertices, {} edges",
            self.path.display(),
            num_states,
            vertices.len(),
            edges.len()
        );
        Ok(())
    }

    /// Save only when the graph changed since the last save and saving is
    /// enabled.
    pub fn save_if_changed(&self, graph: &mut SparseGraph<S>) -> Result<(), StorageError> {
        if !self.saving_enabled {
            debug!("saving disabled; skipping write to {}", self.path.display());
            return Ok(());
        }
        if !graph.is_modified() {
            debug!("roadmap unchanged; skipping write to {}", self.path.display());
            return Ok(());
        }
        self.save(graph)
    }

    /// Populate an empty graph from the container file. Returns false when
    /// the file does not exist yet.
    pub fn load(&self, graph: &mut SparseGraph<S>) -> Result<bool, StorageError> {
        if !graph.is_empty() || !graph.cache().store().is_empty() {
            return Err(StorageError::Format("load target graph is not empty".into()));
        }
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no roadmap container at {}", self.path.display());
                return Ok(false);
            }
            Err(error) => return Err(error.into()),
        };
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(StorageError::Format("bad magic bytes".into()));
        }
        let version = read_u32(&mut reader)?;
        if version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }
        let dim = read_u32(&mut reader)?;
        let expected = graph.space().dimension() as u32;
        if dim != expected {
            return Err(StorageError::DimensionMismatch { expected, found: dim });
        }
        let num_states = read_u64(&mut reader)?;
        let num_vertices = read_u64(&mut reader)?;
        let num_edges = read_u64(&mut reader)?;

        let mut buf = vec![0u8; self.codec.state_size()];
        for _ in 0..num_states {
            reader.read_exact(&mut buf)?;
            graph.add_state(self.codec.decode(&buf));
        }

        let mut vertices = Vec::with_capacity(num_vertices as usize);
        for _ in 0..num_vertices {
            let state_id = read_u64(&mut reader)? as usize;
            if state_id == 0 || state_id > num_states as usize {
                return Err(StorageError::Format(format!("vertex references state {state_id}")));
            }
            let mut tag = [0u8; 1];
            reader.read_exact(&mut tag)?;
            let vertex_type = VertexType::from_u8(tag[0])
                .ok_or_else(|| StorageError::Format(format!("unknown vertex type {}", tag[0])))?;
            vertices.push(graph.add_vertex(StateId(state_id), vertex_type));
        }

        for _ in 0..num_edges {
            let u = read_u64(&mut reader)? as usize;
            let v = read_u64(&mut reader)? as usize;
            let mut tag = [0u8; 1];
            reader.read_exact(&mut tag)?;
            let edge_type = EdgeType::from_u8(tag[0])
                .ok_or_else(|| StorageError::Format(format!("unknown edge type {}", tag[0])))?;
            let weight = read_f64(&mut reader)?;
            let (&u, &v) = match (vertices.get(u), vertices.get(v)) {
                (Some(u), Some(v)) => (u, v),
                _ => return Err(StorageError::Format(format!("edge references vertex {u} or {v}"))),
            };
            graph
                .add_edge_with_weight(u, v, edge_type, weight)
                .map_err(|error| StorageError::Format(error.to_string()))?;
        }

        let num_entries = read_u64(&mut reader)?;
        for _ in 0..num_entries {
            let a = read_u64(&mut reader)? as usize;
            let b = read_u64(&mut reader)? as usize;
            let mut tag = [0u8; 1];
            reader.read_exact(&mut tag)?;
            if a >= b {
                return Err(StorageError::Format(format!("cache pair ({a}, {b}) not ordered")));
            }
            let free = match tag[0] {
                VERDICT_FREE => true,
                VERDICT_IN_COLLISION => false,
                other => return Err(StorageError::Format(format!("unknown verdict {other}"))),
            };
            graph.cache().insert_verdict(StateId(a), StateId(b), free);
        }

        graph.mark_saved();
        info!(
            "loaded roadmap from {}: {} states, {} vertices, {} edges, {} cached verdicts",
            self.path.display(),
            num_states,
            num_vertices,
            num_edges,
            num_entries
        );
        Ok(true)
    }
}

fn write_u32(writer: &mut impl Write, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn write_u64(writer: &mut impl Write, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn write_f64(writer: &mut impl Write, value: f64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(reader: &mut impl Read) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}
