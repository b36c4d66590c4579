use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::core::{FloeError, Result};
use crate::storage::segment::VectorRecord;

/// Magic bytes opening every sealed segment file.
pub const SEGMENT_MAGIC: &[u8; 8] = b"FLOESEG\x01";

/// JSON header describing the column group that follows.
///
/// Logical schema: `(id: u64, embedding: fixed_size_list<f32, dim>,
/// metadata: utf8)`. Columns are laid out contiguously after the header:
/// the id column as little-endian u64s, the embedding column as a flat
/// little-endian f32 array of `num_rows * dim` values, and the metadata
/// column as length-prefixed UTF-8 strings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SegmentHeader {
    pub segment_id: u64,
    pub num_rows: u64,
    pub dim: u64,
}

/// File name of a sealed segment under the data dir.
pub fn segment_file_name(segment_id: u64) -> String {
    format!("segment_{}.seg", segment_id)
}

/// Parse a segment id back out of a file name produced by
/// `segment_file_name`; used by reopen discovery.
pub fn parse_segment_file_name(name: &str) -> Option<u64> {
    name.strip_prefix("segment_")?
        .strip_suffix(".seg")?
        .parse()
        .ok()
}

/// Write records as an immutable columnar unit.
pub fn write_segment(
    path: &Path,
    segment_id: u64,
    dim: usize,
    records: &[VectorRecord],
) -> Result<()> {
    let header = SegmentHeader {
        segment_id,
        num_rows: records.len() as u64,
        dim: dim as u64,
    };
    let header_json = serde_json::to_vec(&header).map_err(|e| FloeError::StorageCorrupt {
        message: format!("header encode error: {}", e),
    })?;

    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(SEGMENT_MAGIC);
    buf.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
    buf.extend_from_slice(&header_json);

    for r in records {
        buf.extend_from_slice(&r.record_id.to_le_bytes());
    }
    for r in records {
        debug_assert_eq!(r.embedding.len(), dim);
        for v in &r.embedding {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    for r in records {
        buf.extend_from_slice(&(r.metadata.len() as u32).to_le_bytes());
        buf.extend_from_slice(r.metadata.as_bytes());
    }

    let mut file = File::create(path).map_err(|e| FloeError::StorageCorrupt {
        message: format!("create {}: {}", path.display(), e),
    })?;
    file.write_all(&buf).map_err(|e| FloeError::StorageCorrupt {
        message: format!("write {}: {}", path.display(), e),
    })?;
    file.sync_all().map_err(|e| FloeError::StorageCorrupt {
        message: format!("sync {}: {}", path.display(), e),
    })?;

    Ok(())
}

/// Read a sealed segment file back into rows.
///
/// Every structural defect (bad magic, short file, dimension drift,
/// invalid UTF-8) surfaces as `StorageCorrupt` naming the file.
pub fn read_segment(path: &Path, expected_dim: usize) -> Result<(SegmentHeader, Vec<VectorRecord>)> {
    let data = fs::read(path).map_err(|e| FloeError::StorageCorrupt {
        message: format!("read {}: {}", path.display(), e),
    })?;

    let corrupt = |message: String| FloeError::StorageCorrupt { message };

    if data.len() < SEGMENT_MAGIC.len() + 4 {
        return Err(corrupt(format!("{}: truncated header", path.display())));
    }
    if &data[..SEGMENT_MAGIC.len()] != SEGMENT_MAGIC {
        return Err(corrupt(format!("{}: wrong magic", path.display())));
    }

    let mut offset = SEGMENT_MAGIC.len();
    let header_len =
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
            as usize;
    offset += 4;
    if data.len() < offset + header_len {
        return Err(corrupt(format!("{}: truncated header", path.display())));
    }

    let header: SegmentHeader =
        serde_json::from_slice(&data[offset..offset + header_len]).map_err(|e| {
            corrupt(format!("{}: header parse error: {}", path.display(), e))
        })?;
    offset += header_len;

    if header.dim as usize != expected_dim {
        return Err(corrupt(format!(
            "{}: dimension {} does not match engine dimension {}",
            path.display(),
            header.dim,
            expected_dim
        )));
    }

    let num_rows = header.num_rows as usize;
    let dim = header.dim as usize;
    let id_bytes = num_rows * 8;
    let embedding_bytes = num_rows * dim * 4;
    if data.len() < offset + id_bytes + embedding_bytes {
        return Err(corrupt(format!("{}: truncated columns", path.display())));
    }

    let mut ids = Vec::with_capacity(num_rows);
    for i in 0..num_rows {
        let start = offset + i * 8;
        ids.push(u64::from_le_bytes(data[start..start + 8].try_into().unwrap()));
    }
    offset += id_bytes;

    let mut embeddings = Vec::with_capacity(num_rows);
    for i in 0..num_rows {
        let mut vec = Vec::with_capacity(dim);
        for j in 0..dim {
            let start = offset + (i * dim + j) * 4;
            vec.push(f32::from_le_bytes(data[start..start + 4].try_into().unwrap()));
        }
        embeddings.push(vec);
    }
    offset += embedding_bytes;

    let mut records = Vec::with_capacity(num_rows);
    for (i, embedding) in embeddings.into_iter().enumerate() {
        if data.len() < offset + 4 {
            return Err(corrupt(format!("{}: truncated metadata column", path.display())));
        }
        let len = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
        offset += 4;
        if data.len() < offset + len {
            return Err(corrupt(format!("{}: truncated metadata column", path.display())));
        }
        let metadata = std::str::from_utf8(&data[offset..offset + len])
            .map_err(|_| corrupt(format!("{}: metadata is not UTF-8", path.display())))?
            .to_string();
        offset += len;

        records.push(VectorRecord {
            record_id: ids[i],
            embedding,
            metadata,
        });
    }

    Ok((header, records))
}
