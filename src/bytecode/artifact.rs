use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("bytecode artifact truncated: {0}")]
    Truncated(&'static str),
    #[error("bytecode artifact has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("bytecode artifact: string constant {0} is not valid UTF-8")]
    InvalidString(usize),
    #[error("bytecode artifact: {0} does not fit in 16 bits")]
    TooLarge(&'static str),
}

/// A compiled bytecode program.
///
/// Layout, little-endian throughout:
///
/// ```text
/// u16 code length | u16 int slots | u16 str slots | u16 #int consts | u16 #str consts
/// i32 * #int consts
/// (u32 length, bytes) * #str consts
/// code bytes
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    pub int_slots: u16,
    pub str_slots: u16,
    pub int_pool: Vec<i32>,
    pub str_pool: Vec<String>,
    pub code: Vec<u8>,
}

impl Artifact {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        let mut out = Vec::with_capacity(10 + self.int_pool.len() * 4 + self.code.len());
        out.extend_from_slice(&fit_u16(self.code.len(), "code length")?.to_le_bytes());
        out.extend_from_slice(&self.int_slots.to_le_bytes());
        out.extend_from_slice(&self.str_slots.to_le_bytes());
        out.extend_from_slice(&fit_u16(self.int_pool.len(), "integer pool")?.to_le_bytes());
        out.extend_from_slice(&fit_u16(self.str_pool.len(), "string pool")?.to_le_bytes());

        for value in &self.int_pool {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for value in &self.str_pool {
            let len = u32::try_from(value.len())
                .map_err(|_| ArtifactError::TooLarge("string constant"))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        out.extend_from_slice(&self.code);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let mut reader = Reader { bytes, pos: 0 };

        let code_len = reader.u16("header")? as usize;
        let int_slots = reader.u16("header")?;
        let str_slots = reader.u16("header")?;
        let int_count = reader.u16("header")? as usize;
        let str_count = reader.u16("header")? as usize;

        let mut int_pool = Vec::with_capacity(int_count);
        for _ in 0..int_count {
            int_pool.push(i32::from_le_bytes(reader.array("integer pool")?));
        }

        let mut str_pool = Vec::with_capacity(str_count);
        for index in 0..str_count {
            let len = u32::from_le_bytes(reader.array("string pool")?) as usize;
            let raw = reader.take(len, "string pool")?;
            let value = std::str::from_utf8(raw).map_err(|_| ArtifactError::InvalidString(index))?;
            str_pool.push(value.to_string());
        }

        let code = reader.take(code_len, "code")?.to_vec();
        let rest = bytes.len() - reader.pos;
        if rest != 0 {
            return Err(ArtifactError::TrailingBytes(rest));
        }

        Ok(Artifact {
            int_slots,
            str_slots,
            int_pool,
            str_pool,
            code,
        })
    }

    pub fn write_to(&self, path: &Path) -> Result<(), crate::Error> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, crate::Error> {
        Ok(Self::from_bytes(&fs::read(path)?)?)
    }
}

fn fit_u16(n: usize, what: &'static str) -> Result<u16, ArtifactError> {
    u16::try_from(n).map_err(|_| ArtifactError::TooLarge(what))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], ArtifactError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ArtifactError::Truncated(what))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], ArtifactError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, ArtifactError> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }
}
