//! Component A: neighbor-identifier compression scheme (spec §4.A).
//!
//! Chooses the smallest `(labelBytes, offsetBytes)` pair that can represent
//! every neighbor identifier a direction may need to encode, then
//! encodes/decodes `(label, offset)` pairs at that width.

use crate::error::{LoadError, Result};
use crate::types::{LabelId, NodeOffset};

/// Label/offset byte widths for one direction of one rel label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionScheme {
    pub label_bytes: u8,
    pub offset_bytes: u8,
}

impl CompressionScheme {
    /// Total size in bytes of one compressed edge record.
    pub fn record_size(self) -> usize {
        self.label_bytes as usize + self.offset_bytes as usize
    }

    /// Chooses the compression scheme for a direction given the set of legal
    /// target labels on that side, each label's max observed node offset, and
    /// the total number of distinct node labels in the catalog (spec §4.A).
    pub fn choose(
        target_labels: &[LabelId],
        max_offset_per_label: impl Fn(LabelId) -> NodeOffset,
        total_num_labels: usize,
    ) -> Result<Self> {
        let label_bytes: u8 = if target_labels.len() == 1 {
            0
        } else {
            [1u8, 2, 4]
                .into_iter()
                .find(|&b| fits_unsigned(b, (total_num_labels as u64).saturating_sub(1)))
                .ok_or_else(|| {
                    LoadError::Fit(format!(
                        "no label byte width fits {total_num_labels} labels"
                    ))
                })?
        };

        let max_offset = target_labels
            .iter()
            .map(|&l| max_offset_per_label(l))
            .max()
            .unwrap_or(0);
        let offset_bytes: u8 = [2u8, 4, 8]
            .into_iter()
            .find(|&b| fits_unsigned(b, max_offset))
            .ok_or_else(|| {
                LoadError::Fit(format!("no offset byte width fits max offset {max_offset}"))
            })?;

        Ok(Self {
            label_bytes,
            offset_bytes,
        })
    }

    /// Encodes a neighbor id as little-endian `label` then `offset`, each
    /// truncated to this scheme's widths. Returns a fatal error if either
    /// value overflows its allotted width (spec: "Fit" error category).
    pub fn encode(self, label: LabelId, offset: NodeOffset, out: &mut [u8]) -> Result<()> {
        debug_assert_eq!(out.len(), self.record_size());
        if self.label_bytes > 0 && !fits_unsigned(self.label_bytes, label as u64) {
            return Err(LoadError::Fit(format!(
                "label {label} does not fit in {} bytes",
                self.label_bytes
            )));
        }
        if !fits_unsigned(self.offset_bytes, offset) {
            return Err(LoadError::Fit(format!(
                "offset {offset} does not fit in {} bytes",
                self.offset_bytes
            )));
        }
        let (label_part, offset_part) = out.split_at_mut(self.label_bytes as usize);
        label_part.copy_from_slice(&label.to_le_bytes()[..self.label_bytes as usize]);
        offset_part.copy_from_slice(&offset.to_le_bytes()[..self.offset_bytes as usize]);
        Ok(())
    }

    /// Decodes a neighbor id previously written by [`Self::encode`].
    /// `fixed_label` supplies the single legal label when `label_bytes == 0`.
    pub fn decode(self, bytes: &[u8], fixed_label: Option<LabelId>) -> (LabelId, NodeOffset) {
        debug_assert_eq!(bytes.len(), self.record_size());
        let (label_part, offset_part) = bytes.split_at(self.label_bytes as usize);
        let label = if self.label_bytes == 0 {
            fixed_label.expect("label_bytes == 0 requires a fixed label")
        } else {
            let mut buf = [0u8; 2];
            buf[..label_part.len()].copy_from_slice(label_part);
            u16::from_le_bytes(buf)
        };
        let mut obuf = [0u8; 8];
        obuf[..offset_part.len()].copy_from_slice(offset_part);
        (label, u64::from_le_bytes(obuf))
    }
}

fn fits_unsigned(num_bytes: u8, value: u64) -> bool {
    match num_bytes {
        0 => value == 0,
        1 => value <= u8::MAX as u64,
        2 => value <= u16::MAX as u64,
        4 => value <= u32::MAX as u64,
        8 => true,
        _ => false,
    }
}
