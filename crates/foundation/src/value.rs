//! Bit-level data carried between callers and resources.
//!
//! A [`Layout`] describes the shape of a resource's input or output: an
//! ordered list of named fields, each at most 64 bits wide. A [`Record`]
//! holds one value per field, positionally. Values written through a layout
//! wrap around at the field width, as a hardware wire would.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest field a layout may carry.
pub const MAX_FIELD_WIDTH: u32 = 64;

/// Errors raised while constructing a layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("duplicate field '{0}' in layout")]
    DuplicateField(String),

    #[error("field '{name}' has width {width}, expected 1..=64")]
    WidthOutOfRange { name: String, width: u32 },
}

/// A named field of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub width: u32,
}

/// Ordered set of named, fixed-width fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layout {
    fields: Vec<Field>,
}

impl Layout {
    /// Build a layout from `(name, width)` pairs.
    pub fn new<S: Into<String>>(
        fields: impl IntoIterator<Item = (S, u32)>,
    ) -> Result<Self, LayoutError> {
        let mut out: Vec<Field> = Vec::new();
        for (name, width) in fields {
            let name = name.into();
            if width == 0 || width > MAX_FIELD_WIDTH {
                return Err(LayoutError::WidthOutOfRange { name, width });
            }
            if out.iter().any(|f| f.name == name) {
                return Err(LayoutError::DuplicateField(name));
            }
            out.push(Field { name, width });
        }
        Ok(Self { fields: out })
    }

    /// A layout with no fields; resources taking no arguments use it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single `data` field of the given width, clamped to 1..=64.
    pub fn scalar(width: u32) -> Self {
        Self {
            fields: vec![Field {
                name: "data".to_string(),
                width: width.clamp(1, MAX_FIELD_WIDTH),
            }],
        }
    }

    /// A single 1-bit field, the shape of request/ready/enable signals.
    pub fn flag() -> Self {
        Self::scalar(1)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total width in bits.
    pub fn width(&self) -> u32 {
        self.fields.iter().map(|f| f.width).sum()
    }

    /// Position of a named field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The all-zero record of this layout.
    pub fn zero(&self) -> Record {
        Record {
            values: vec![0; self.fields.len()],
        }
    }

    /// Check that a record has one value per field and each value fits.
    pub fn conforms(&self, record: &Record) -> bool {
        record.values.len() == self.fields.len()
            && self
                .fields
                .iter()
                .zip(&record.values)
                .all(|(field, &value)| value & !mask(field.width) == 0)
    }

    /// Fit a record to this layout: missing fields read as zero, extra
    /// values are dropped, and each value wraps at its field width.
    pub fn truncate(&self, record: &Record) -> Record {
        Record {
            values: self
                .fields
                .iter()
                .enumerate()
                .map(|(i, field)| record.values.get(i).copied().unwrap_or(0) & mask(field.width))
                .collect(),
        }
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

/// Field values for some layout, stored positionally.
///
/// Records order lexicographically by field position, which is what the
/// `Min`/`Max` combiners of nonexclusive resources compare.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Record {
    values: Vec<u64>,
}

impl Record {
    pub fn new(values: Vec<u64>) -> Self {
        Self { values }
    }

    /// A one-field record; pairs with [`Layout::scalar`] and [`Layout::flag`].
    pub fn scalar(value: u64) -> Self {
        Self {
            values: vec![value],
        }
    }

    /// The record carried by an empty layout.
    pub fn unit() -> Self {
        Self::default()
    }

    pub fn from_bool(value: bool) -> Self {
        Self::scalar(u64::from(value))
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        self.values.get(index).copied()
    }

    /// The first field, or zero for an empty record.
    pub fn as_scalar(&self) -> u64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// True if any field is non-zero.
    pub fn is_truthy(&self) -> bool {
        self.values.iter().any(|&v| v != 0)
    }
}
