use std::io::{self, Write};

use wayfind_core::{Error, Result};

use super::ProximityGraph;

pub const GRAPH_MAGIC: &[u8; 8] = b"WAYGRAPH";
pub const GRAPH_VERSION: u32 = 1;

impl ProximityGraph {
    /// Serialize the graph.
    ///
    /// Format (all integers and floats little-endian):
    /// - Magic: "WAYGRAPH" (8 bytes)
    /// - Header: Version u32, Dim u32, NumNodes u32, EntryPoint u32
    ///   (u32::MAX when empty)
    /// - Dataset: NumNodes * Dim f32
    /// - Adjacency, per node: Degree u32, Neighbors [u32; Degree]
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(GRAPH_MAGIC)?;
        writer.write_all(&GRAPH_VERSION.to_le_bytes())?;
        writer.write_all(&(self.dim as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u32).to_le_bytes())?;
        let entry = if self.is_empty() { u32::MAX } else { self.entry_point };
        writer.write_all(&entry.to_le_bytes())?;

        for x in &self.data {
            writer.write_all(&x.to_le_bytes())?;
        }
        for neighbors in &self.adjacency {
            writer.write_all(&(neighbors.len() as u32).to_le_bytes())?;
            for &neighbor in neighbors {
                writer.write_all(&neighbor.to_le_bytes())?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24 + self.data.len() * 4 + self.adjacency.len() * 4);
        // Writing into a Vec cannot fail.
        let _ = self.serialize(&mut out);
        out
    }

    /// Parse a graph, validating structure: magic, version, lengths, neighbour
    /// ids and entry point. Any violation is a format error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader { bytes, pos: 0 };
        if reader.take(GRAPH_MAGIC.len())? != GRAPH_MAGIC {
            return Err(Error::Format("graph.bin: bad magic".into()));
        }
        let version = reader.u32()?;
        if version != GRAPH_VERSION {
            return Err(Error::Format(format!("graph.bin: unsupported version {version}")));
        }
        let dim = reader.u32()? as usize;
        let count = reader.u32()? as usize;
        let entry_point = reader.u32()?;

        let floats = dim.checked_mul(count).ok_or_else(|| Error::Format("graph.bin: dataset size overflows".into()))?;
        let raw = reader.take(floats.checked_mul(4).ok_or_else(|| Error::Format("graph.bin: dataset size overflows".into()))?)?;
        let data: Vec<f32> = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if !data.iter().all(|x| x.is_finite()) {
            return Err(Error::Format("graph.bin: non-finite value in dataset".into()));
        }

        let mut adjacency = Vec::with_capacity(count);
        for node in 0..count {
            let degree = reader.u32()? as usize;
            let mut neighbors = Vec::with_capacity(degree.min(1024));
            for _ in 0..degree {
                let neighbor = reader.u32()?;
                if neighbor as usize >= count {
                    return Err(Error::Format(format!(
                        "graph.bin: node {node} links to {neighbor}, beyond {count} nodes"
                    )));
                }
                neighbors.push(neighbor);
            }
            adjacency.push(neighbors);
        }
        if reader.pos != bytes.len() {
            return Err(Error::Format(format!("graph.bin: {} trailing bytes", bytes.len() - reader.pos)));
        }

        if count == 0 {
            return Ok(ProximityGraph::empty(dim));
        }
        if entry_point as usize >= count {
            return Err(Error::Format(format!("graph.bin: entry point {entry_point} beyond {count} nodes")));
        }
        Ok(ProximityGraph::from_parts(dim, data, adjacency, entry_point))
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(Error::Format(format!("graph.bin: truncated at byte {}", self.bytes.len())));
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
