//! Record type - the on-disk encoding of one stored value

/// How a record's payload is encoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Payload stored as-is
    Raw,
    /// Payload compressed with zstd
    Zstd,
}

impl Encoding {
    pub fn as_byte(&self) -> u8 {
        match self {
            Encoding::Raw => 0,
            Encoding::Zstd => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Encoding::Raw),
            1 => Some(Encoding::Zstd),
            _ => None,
        }
    }
}

/// A stored value together with its encoding
#[derive(Clone, Debug)]
pub struct Record {
    /// Encoding chosen for the payload
    pub encoding: Encoding,
    /// Raw value bytes (decoded)
    pub data: Vec<u8>,
}

impl Record {
    /// Create a record, compressing only if the value reaches `threshold`
    pub fn new(data: Vec<u8>, threshold: Option<usize>) -> Self {
        let encoding = match threshold {
            Some(min) if data.len() >= min => Encoding::Zstd,
            _ => Encoding::Raw,
        };
        Record { encoding, data }
    }

    /// Encode the record for storage
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut output = Vec::with_capacity(self.data.len() + 1);
        output.push(self.encoding.as_byte());
        match self.encoding {
            Encoding::Raw => output.extend_from_slice(&self.data),
            Encoding::Zstd => output.extend(zstd::encode_all(self.data.as_slice(), 3)?),
        }
        Ok(output)
    }

    /// Decode a record from storage
    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        let (&tag, payload) = data
            .split_first()
            .ok_or_else(|| crate::Error::Store("Empty record".into()))?;

        let encoding = Encoding::from_byte(tag)
            .ok_or_else(|| crate::Error::Store(format!("Invalid record encoding: {}", tag)))?;

        let data = match encoding {
            Encoding::Raw => payload.to_vec(),
            Encoding::Zstd => zstd::decode_all(payload)?,
        };

        Ok(Record { encoding, data })
    }
}
