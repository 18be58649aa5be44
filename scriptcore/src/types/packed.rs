//! Named bit ranges packed into a byte (bitmap) or a 32-bit int (intmap)

use std::fmt;

use super::TypeError;
use crate::ast::BitFieldDecl;

/// Inclusive bit range `start..=end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitField {
    pub name: String,
    pub start: u8,
    pub end: u8,
}

impl BitField {
    pub fn width(&self) -> u32 {
        (self.end - self.start + 1) as u32
    }

    pub fn max_value(&self) -> u64 {
        (1u64 << self.width()) - 1
    }

    fn mask(&self) -> u64 {
        self.max_value() << self.start
    }

    pub fn extract(&self, raw: u32) -> u64 {
        ((raw as u64) >> self.start) & self.max_value()
    }

    pub fn inject(&self, raw: u32, value: i64) -> Result<u32, TypeError> {
        if value < 0 || value as u64 > self.max_value() {
            return Err(TypeError::range(format!(
                "Value {value} out of range for field '{}' (max {})",
                self.name,
                self.max_value()
            )));
        }
        let cleared = (raw as u64) & !self.mask();
        Ok((cleared | ((value as u64) << self.start)) as u32)
    }
}

impl fmt::Display for BitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}: {}", self.name, self.start)
        } else {
            write!(f, "{}: {}-{}", self.name, self.start, self.end)
        }
    }
}

/// Layout of non-overlapping fields inside a `BITS`-wide container
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedLayout<const BITS: u8> {
    fields: Vec<BitField>,
}

pub type BitmapType = PackedLayout<8>;
pub type IntmapType = PackedLayout<32>;

impl<const BITS: u8> PackedLayout<BITS> {
    pub fn new() -> Self {
        PackedLayout { fields: Vec::new() }
    }

    pub fn from_decls(decls: &[BitFieldDecl]) -> Result<Self, TypeError> {
        let mut layout = Self::new();
        for d in decls {
            layout.add_field(&d.name, d.start, d.end)?;
        }
        Ok(layout)
    }

    pub fn kind(&self) -> &'static str {
        if BITS == 8 { "bitmap" } else { "intmap" }
    }

    pub fn add_field(&mut self, name: &str, start: u8, end: u8) -> Result<(), TypeError> {
        let last = BITS - 1;
        if start > last || end > last {
            return Err(TypeError::layout(format!(
                "Field '{name}' bits must be 0-{last}, got {start}-{end}"
            )));
        }
        if start > end {
            return Err(TypeError::layout(format!(
                "Start bit ({start}) must be <= end bit ({end})"
            )));
        }
        if self.field(name).is_some() {
            return Err(TypeError::layout(format!("Duplicate field '{name}'")));
        }
        if let Some(existing) = self.fields.iter().find(|f| start <= f.end && f.start <= end) {
            return Err(TypeError::layout(format!(
                "Field '{name}' ({start}-{end}) overlaps with existing field '{}' ({}-{})",
                existing.name, existing.start, existing.end
            )));
        }
        self.fields.push(BitField {
            name: name.to_string(),
            start,
            end,
        });
        Ok(())
    }

    /// Case-insensitive field lookup
    pub fn field(&self, name: &str) -> Option<&BitField> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }

    pub fn get_field(&self, raw: u32, name: &str) -> Result<u64, TypeError> {
        self.field(name)
            .map(|f| f.extract(raw))
            .ok_or_else(|| unknown_field(self.kind(), name))
    }

    pub fn set_field(&self, raw: u32, name: &str, value: i64) -> Result<u32, TypeError> {
        self.field(name)
            .ok_or_else(|| unknown_field(self.kind(), name))?
            .inject(raw, value)
    }
}

fn unknown_field(kind: &str, name: &str) -> TypeError {
    TypeError::unknown_field(format!("Unknown {kind} field: {name}"))
}

impl<const BITS: u8> fmt::Display for PackedLayout<BITS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.kind())?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> BitmapType {
        let mut t = BitmapType::new();
        t.add_field("active", 0, 0).unwrap();
        t.add_field("mode", 1, 3).unwrap();
        t
    }

    #[test]
    fn test_extract_and_inject() {
        let t = flags();
        let raw = t.set_field(0, "mode", 5).unwrap();
        assert_eq!(raw, 0b1010);
        let raw = t.set_field(raw, "ACTIVE", 1).unwrap();
        assert_eq!(t.get_field(raw, "mode").unwrap(), 5);
        assert_eq!(t.get_field(raw, "active").unwrap(), 1);
    }

    #[test]
    fn test_inject_leaves_other_fields() {
        let t = flags();
        let raw = t.set_field(0xF0, "mode", 7).unwrap();
        assert_eq!(raw, 0xFE);
    }

    #[test]
    fn test_value_out_of_range() {
        let err = flags().set_field(0, "mode", 8).unwrap_err();
        assert_eq!(err.to_string(), "Value 8 out of range for field 'mode' (max 7)");
    }

    #[test]
    fn test_overlap_rejected() {
        let mut t = flags();
        let err = t.add_field("other", 3, 4).unwrap_err();
        assert!(err.to_string().contains("overlaps with existing field 'mode'"));
    }

    #[test]
    fn test_bounds_follow_width() {
        let mut b = BitmapType::new();
        assert!(b.add_field("x", 6, 8).is_err());
        let mut i = IntmapType::new();
        i.add_field("hi", 16, 31).unwrap();
        assert_eq!(i.get_field(0xFFFF_0000, "hi").unwrap(), 0xFFFF);
    }

    #[test]
    fn test_display() {
        assert_eq!(flags().to_string(), "bitmap {active: 0, mode: 1-3}");
    }
}
