//! Interchangeable compression algorithms
//!
//! Every algorithm is a pure transform over an in-memory buffer and carries
//! a one-byte wire identifier that is stored in the envelope header, so the
//! opening side never re-negotiates the algorithm. Auto-selection compresses
//! the input with every available algorithm and keeps the smallest output.

use std::io::{Read, Write};

use crate::error::{ErrorCategory, ErrorKind, Result, SealboxError};

/// Compression algorithms understood by the envelope format.
///
/// The order of the variants is the auto-selection tie-break order: when two
/// algorithms produce output of equal size, the earlier-listed one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// No compression; the payload is stored as-is.
    Store,
    /// zlib-wrapped DEFLATE.
    Zlib,
    /// LZMA in an xz container.
    Lzma,
    /// Brotli.
    Brotli,
}

/// All algorithms, in auto-selection preference order.
pub const ALL_ALGORITHMS: [CompressionAlgorithm; 4] = [
    CompressionAlgorithm::Store,
    CompressionAlgorithm::Zlib,
    CompressionAlgorithm::Lzma,
    CompressionAlgorithm::Brotli,
];

impl CompressionAlgorithm {
    /// The identifier stored in the envelope header.
    pub fn wire_id(self) -> u8 {
        match self {
            CompressionAlgorithm::Store => 0,
            CompressionAlgorithm::Zlib => 1,
            CompressionAlgorithm::Lzma => 2,
            CompressionAlgorithm::Brotli => 3,
        }
    }

    /// Resolves a header identifier back to an algorithm.
    pub fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CompressionAlgorithm::Store),
            1 => Some(CompressionAlgorithm::Zlib),
            2 => Some(CompressionAlgorithm::Lzma),
            3 => Some(CompressionAlgorithm::Brotli),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionAlgorithm::Store => "store",
            CompressionAlgorithm::Zlib => "zlib",
            CompressionAlgorithm::Lzma => "lzma",
            CompressionAlgorithm::Brotli => "brotli",
        }
    }
}

/// Compression effort, 1 (fastest) through 9 (smallest), mapped onto each
/// algorithm's native presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// Mid-range preset, the default.
    pub const BALANCED: CompressionLevel = CompressionLevel(6);

    pub fn new(level: u8) -> Result<Self> {
        if !(1..=9).contains(&level) {
            return Err(SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidParameters,
                format!("compression level must be between 1 and 9, got {}", level),
            ));
        }
        Ok(CompressionLevel(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::BALANCED
    }
}

/// Compress `data` with the given algorithm and level.
pub fn compress(
    data: &[u8],
    algorithm: CompressionAlgorithm,
    level: CompressionLevel,
) -> Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::Store => Ok(data.to_vec()),
        CompressionAlgorithm::Zlib => {
            // The deflate crate exposes presets rather than numeric levels;
            // spread the nine levels across them.
            let preset = match level.get() {
                1..=3 => deflate::CompressionOptions::fast(),
                4..=6 => deflate::CompressionOptions::default(),
                _ => deflate::CompressionOptions::high(),
            };
            Ok(deflate::deflate_bytes_zlib_conf(data, preset))
        }
        CompressionAlgorithm::Lzma => {
            let mut out = Vec::new();
            xz2::read::XzEncoder::new(data, u32::from(level.get()))
                .read_to_end(&mut out)
                .map_err(|e| {
                    SealboxError::with_source(ErrorCategory::Internal, "lzma compression failed", e)
                })?;
            Ok(out)
        }
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::new();
            {
                let mut writer =
                    brotli::CompressorWriter::new(&mut out, 4096, u32::from(level.get()), 22);
                writer.write_all(data).map_err(|e| {
                    SealboxError::with_source(
                        ErrorCategory::Internal,
                        "brotli compression failed",
                        e,
                    )
                })?;
            }
            Ok(out)
        }
    }
}

/// Decompress `data` previously produced by [`compress`] with `algorithm`.
///
/// The algorithm comes from the envelope header, so a rejected stream means
/// the payload bytes do not form valid output of that algorithm.
pub fn decompress(data: &[u8], algorithm: CompressionAlgorithm) -> Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::Store => Ok(data.to_vec()),
        CompressionAlgorithm::Zlib => inflate::inflate_bytes_zlib(data).map_err(|msg| {
            SealboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::CorruptPayload,
                format!("zlib decompression failed: {}", msg),
            )
        }),
        CompressionAlgorithm::Lzma => {
            let mut out = Vec::new();
            xz2::read::XzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| {
                    SealboxError::with_kind_and_source(
                        ErrorCategory::User,
                        ErrorKind::CorruptPayload,
                        "lzma decompression failed",
                        e,
                    )
                })?;
            Ok(out)
        }
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::new();
            brotli::Decompressor::new(data, 4096)
                .read_to_end(&mut out)
                .map_err(|e| {
                    SealboxError::with_kind_and_source(
                        ErrorCategory::User,
                        ErrorKind::CorruptPayload,
                        "brotli decompression failed",
                        e,
                    )
                })?;
            Ok(out)
        }
    }
}

/// Compress `data` with every available algorithm and keep the smallest
/// output, preferring the earliest-listed algorithm on ties.
///
/// An algorithm that fails to compress is excluded from the comparison
/// rather than reported; Store never fails, so a result always exists.
/// Incompressible input therefore falls back to Store.
pub fn auto_select(data: &[u8], level: CompressionLevel) -> (CompressionAlgorithm, Vec<u8>) {
    let mut best: Option<(CompressionAlgorithm, Vec<u8>)> = None;
    for algorithm in ALL_ALGORITHMS {
        let Ok(candidate) = compress(data, algorithm, level) else {
            continue;
        };
        match &best {
            Some((_, current)) if candidate.len() >= current.len() => {}
            _ => best = Some((algorithm, candidate)),
        }
    }
    // Store is infallible, so the loop produced at least one candidate.
    best.unwrap_or_else(|| (CompressionAlgorithm::Store, data.to_vec()))
}
