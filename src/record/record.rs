//! Records and their binary image
//!
//! The binary image stores slots in schema order with no header:
//!
//! ```text
//! int     -> i64 LE (8 bytes)
//! double  -> f64 bits LE (8 bytes)
//! bool    -> u8 (0 or 1)
//! string  -> u32 LE length + UTF-8 bytes
//! ```
//!
//! Fixed-width slots keep the image size stable when running aggregates are
//! updated, which is what allows in-place overwrites of spilled records.

use std::sync::Arc;

use super::errors::{RecordError, RecordResult};
use super::schema::Schema;
use super::types::AttType;
use super::value::AttValue;

/// A mutable slot vector bound to a schema.
///
/// Operators create one record per cursor and overwrite it on every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    slots: Vec<AttValue>,
}

impl Record {
    /// Creates a record with every slot at its type's default value
    pub fn new(schema: Arc<Schema>) -> Self {
        let slots = schema
            .atts()
            .iter()
            .map(|a| AttValue::default_for(a.att_type))
            .collect();
        Self { schema, slots }
    }

    /// Creates a record from explicit values, type-checking each slot
    pub fn from_values(schema: Arc<Schema>, values: Vec<AttValue>) -> RecordResult<Self> {
        if values.len() != schema.len() {
            return Err(RecordError::SlotOutOfRange {
                index: values.len(),
                len: schema.len(),
            });
        }
        let mut record = Self::new(schema);
        for (i, value) in values.into_iter().enumerate() {
            record.set_att(i, value)?;
        }
        Ok(record)
    }

    /// Returns the attached schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns all slot values in schema order
    pub fn values(&self) -> &[AttValue] {
        &self.slots
    }

    /// Returns the value in slot `index`
    pub fn att(&self, index: usize) -> RecordResult<&AttValue> {
        self.slots.get(index).ok_or(RecordError::SlotOutOfRange {
            index,
            len: self.slots.len(),
        })
    }

    /// Stores `value` in slot `index`, widening int into double slots
    pub fn set_att(&mut self, index: usize, value: AttValue) -> RecordResult<()> {
        let att = self.schema.att(index).ok_or(RecordError::SlotOutOfRange {
            index,
            len: self.slots.len(),
        })?;
        self.slots[index] = value.coerce_to(att.att_type, &att.name)?;
        Ok(())
    }

    /// Size in bytes of the binary image
    pub fn binary_size(&self) -> usize {
        self.slots
            .iter()
            .map(|v| match v {
                AttValue::Int(_) | AttValue::Double(_) => 8,
                AttValue::Bool(_) => 1,
                AttValue::String(s) => 4 + s.len(),
            })
            .sum()
    }

    /// Appends the binary image to `out`
    pub fn write_binary(&self, out: &mut Vec<u8>) {
        out.reserve(self.binary_size());
        for value in &self.slots {
            match value {
                AttValue::Int(i) => out.extend_from_slice(&i.to_le_bytes()),
                AttValue::Double(d) => out.extend_from_slice(&d.to_bits().to_le_bytes()),
                AttValue::Bool(b) => out.push(u8::from(*b)),
                AttValue::String(s) => {
                    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
            }
        }
    }

    /// Returns the binary image as a new buffer
    pub fn to_binary(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.binary_size());
        self.write_binary(&mut out);
        out
    }

    /// Overwrites every slot from a binary image.
    ///
    /// Returns the number of bytes consumed.
    pub fn from_binary(&mut self, bytes: &[u8]) -> RecordResult<usize> {
        let mut pos = 0;
        for (i, att) in self.schema.atts().iter().enumerate() {
            let value = match att.att_type {
                AttType::Int => AttValue::Int(i64::from_le_bytes(take::<8>(bytes, &mut pos)?)),
                AttType::Double => {
                    AttValue::Double(f64::from_bits(u64::from_le_bytes(take::<8>(bytes, &mut pos)?)))
                }
                AttType::Bool => AttValue::Bool(take::<1>(bytes, &mut pos)?[0] != 0),
                AttType::String => {
                    let len = u32::from_le_bytes(take::<4>(bytes, &mut pos)?) as usize;
                    let end = pos + len;
                    if end > bytes.len() {
                        return Err(RecordError::Truncated {
                            needed: end,
                            available: bytes.len(),
                        });
                    }
                    let text = std::str::from_utf8(&bytes[pos..end])
                        .map_err(|_| RecordError::InvalidUtf8(att.name.clone()))?;
                    pos = end;
                    match &mut self.slots[i] {
                        AttValue::String(existing) => {
                            existing.clear();
                            existing.push_str(text);
                            continue;
                        }
                        _ => AttValue::String(text.to_string()),
                    }
                }
            };
            self.slots[i] = value;
        }
        Ok(pos)
    }
}

fn take<const N: usize>(bytes: &[u8], pos: &mut usize) -> RecordResult<[u8; N]> {
    let end = *pos + N;
    let slice = bytes.get(*pos..end).ok_or(RecordError::Truncated {
        needed: end,
        available: bytes.len(),
    })?;
    let mut buf = [0u8; N];
    buf.copy_from_slice(slice);
    *pos = end;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Arc<Schema> {
        Arc::new(Schema::from_pairs([
            ("id", AttType::Int),
            ("name", AttType::String),
            ("score", AttType::Double),
            ("active", AttType::Bool),
        ]))
    }

    #[test]
    fn test_new_record_has_defaults() {
        let rec = Record::new(sample_schema());
        assert_eq!(rec.att(0).unwrap(), &AttValue::Int(0));
        assert_eq!(rec.att(1).unwrap(), &AttValue::String(String::new()));
    }

    #[test]
    fn test_binary_image_roundtrip() {
        let schema = sample_schema();
        let rec = Record::from_values(
            schema.clone(),
            vec![
                AttValue::Int(7),
                AttValue::String("alice".into()),
                AttValue::Double(9.5),
                AttValue::Bool(true),
            ],
        )
        .unwrap();

        let image = rec.to_binary();
        assert_eq!(image.len(), rec.binary_size());

        let mut decoded = Record::new(schema);
        let consumed = decoded.from_binary(&image).unwrap();
        assert_eq!(consumed, image.len());
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_set_att_enforces_type() {
        let mut rec = Record::new(sample_schema());
        assert!(rec.set_att(0, AttValue::String("x".into())).is_err());
        rec.set_att(2, AttValue::Int(3)).unwrap();
        assert_eq!(rec.att(2).unwrap(), &AttValue::Double(3.0));
        assert!(rec.set_att(9, AttValue::Int(1)).is_err());
    }

    #[test]
    fn test_truncated_image_rejected() {
        let schema = sample_schema();
        let rec = Record::from_values(
            schema.clone(),
            vec![
                AttValue::Int(1),
                AttValue::String("bob".into()),
                AttValue::Double(1.0),
                AttValue::Bool(false),
            ],
        )
        .unwrap();
        let image = rec.to_binary();
        let mut decoded = Record::new(schema);
        let err = decoded.from_binary(&image[..image.len() - 2]).unwrap_err();
        assert!(matches!(err, RecordError::Truncated { .. }));
    }

    #[test]
    fn test_numeric_image_size_is_stable() {
        let schema = Arc::new(Schema::from_pairs([("sum", AttType::Int), ("avg", AttType::Double)]));
        let mut rec = Record::new(schema);
        let before = rec.binary_size();
        rec.set_att(0, AttValue::Int(i64::MAX)).unwrap();
        rec.set_att(1, AttValue::Double(12345.678)).unwrap();
        assert_eq!(rec.binary_size(), before);
    }
}
