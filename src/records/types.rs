//! Rust element types that map onto primitive object types.
//!
//! Values are stored little-endian. No conversion happens between types: a
//! `get::<f32>` on an `_INTEGER` object is rejected by the engine.

use super::descriptor::PrimitiveType;

pub trait Primitive: Copy + Default {
    const TYPE: PrimitiveType;

    fn write_le(&self, out: &mut [u8]);

    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($t:ty => $pt:expr),* $(,)?) => {
        $(
            impl Primitive for $t {
                const TYPE: PrimitiveType = $pt;

                #[inline]
                fn write_le(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_primitive! {
    i8 => PrimitiveType::Byte,
    u8 => PrimitiveType::UByte,
    i16 => PrimitiveType::Word,
    u16 => PrimitiveType::UWord,
    i32 => PrimitiveType::Integer,
    i64 => PrimitiveType::Int64,
    f32 => PrimitiveType::Real,
    f64 => PrimitiveType::Double,
}

/// `_LOGICAL` is a 4-byte integer; any non-zero value reads as true.
impl Primitive for bool {
    const TYPE: PrimitiveType = PrimitiveType::Logical;

    fn write_le(&self, out: &mut [u8]) {
        out.copy_from_slice(&(*self as i32).to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes.iter().any(|&b| b != 0)
    }
}

pub fn encode_values<T: Primitive>(values: &[T]) -> Vec<u8> {
    let size = T::TYPE.element_size();
    let mut out = vec![0u8; values.len() * size];
    for (chunk, v) in out.chunks_exact_mut(size).zip(values) {
        v.write_le(chunk);
    }
    out
}

pub fn decode_values<T: Primitive>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::TYPE.element_size())
        .map(T::read_le)
        .collect()
}

/// Packs strings into fixed-width blank-padded `_CHAR*n` elements. Longer
/// strings are truncated to the last whole character that fits.
pub fn encode_strings<S: AsRef<str>>(values: &[S], width: usize) -> Vec<u8> {
    let mut out = vec![b' '; values.len() * width];
    for (chunk, v) in out.chunks_exact_mut(width).zip(values) {
        let s = v.as_ref();
        let n = s
            .char_indices()
            .map(|(at, c)| at + c.len_utf8())
            .take_while(|&end| end <= width)
            .last()
            .unwrap_or(0);
        chunk[..n].copy_from_slice(&s.as_bytes()[..n]);
    }
    out
}

pub fn decode_strings(bytes: &[u8], width: usize) -> Vec<String> {
    bytes
        .chunks_exact(width)
        .map(|chunk| {
            String::from_utf8_lossy(chunk)
                .trim_end_matches([' ', '\0'])
                .to_string()
        })
        .collect()
}
