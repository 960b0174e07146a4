// Structural encoding rules shared by every message family.
//
// The grammar is small and uniform:
// - unsigned integers: big-endian, exactly their width;
// - strings: one length byte (max 255), then the raw bytes;
// - sequences: 4-byte big-endian count, then each element;
// - mappings: 4-byte count, then key/value pairs in the encoder's order
//   (decoders rebuild a map and do not require ordering);
// - tagged unions: one byte equal to the variant's index, then the
//   variant's fields in declaration order (see `message.rs`);
// - bare records: field encodings concatenated, no tag.
//
// Decoding is the strict inverse. All length checks that can fail at encode
// time (a string over 255 bytes, a sequence over u32::MAX elements) fail
// before any bytes are written for that field.

use std::collections::BTreeMap;
use std::io::Read;

use crate::buffer::StreamBuffer;
use crate::error::WireError;

/// Types that can be written to the wire.
pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError>;
}

/// Types that can be read back from the wire.
pub trait Decode: Sized {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError>;
}

/// Encode a message into a fresh byte vector.
pub fn encode_to_vec<T: Encode>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    value.encode(&mut out)?;
    Ok(out)
}

macro_rules! uint_wire {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
                    out.extend_from_slice(&self.to_be_bytes());
                    Ok(())
                }
            }

            impl Decode for $ty {
                fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
                    Ok(<$ty>::from_be_bytes(buf.take()?))
                }
            }
        )*
    };
}

uint_wire!(u8, u16, u32, u64);

impl Encode for String {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        let len = self.len();
        if len > usize::from(u8::MAX) {
            return Err(WireError::StringTooLong(len));
        }
        out.push(len as u8);
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl Decode for String {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        let len = u8::decode(buf)?;
        let bytes = buf.take_bytes(usize::from(len))?;
        String::from_utf8(bytes).map_err(|_| WireError::InvalidString)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        let count =
            u32::try_from(self.len()).map_err(|_| WireError::SequenceTooLong(self.len()))?;
        count.encode(out)?;
        for item in self {
            item.encode(out)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        let count = u32::decode(buf)?;
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(T::decode(buf)?);
        }
        Ok(items)
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        let count =
            u32::try_from(self.len()).map_err(|_| WireError::SequenceTooLong(self.len()))?;
        count.encode(out)?;
        for (key, value) in self {
            key.encode(out)?;
            value.encode(out)?;
        }
        Ok(())
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        let count = u32::decode(buf)?;
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
