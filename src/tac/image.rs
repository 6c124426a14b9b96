use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::tac::instr::TacProgram;

const MAGIC: [u8; 4] = *b"TACB";
const VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("tac image: not a TAC image")]
    BadMagic,
    #[error("tac image: unsupported version {0}")]
    Version(u16),
    #[error("tac image: {0}")]
    Encoding(String),
    #[error("tac image: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk wrapper around a [`TacProgram`].
#[derive(Serialize, Deserialize)]
struct Image {
    magic: [u8; 4],
    version: u16,
    program: TacProgram,
}

pub fn to_bytes(program: &TacProgram) -> Result<Vec<u8>, ImageError> {
    let image = Image {
        magic: MAGIC,
        version: VERSION,
        program: program.clone(),
    };
    postcard::to_allocvec(&image).map_err(|e| ImageError::Encoding(e.to_string()))
}

pub fn from_bytes(bytes: &[u8]) -> Result<TacProgram, ImageError> {
    if !bytes.starts_with(&MAGIC) {
        return Err(ImageError::BadMagic);
    }
    let image: Image =
        postcard::from_bytes(bytes).map_err(|e| ImageError::Encoding(e.to_string()))?;
    if image.version != VERSION {
        return Err(ImageError::Version(image.version));
    }
    Ok(image.program)
}

pub fn save(program: &TacProgram, path: &Path) -> Result<(), ImageError> {
    let bytes = to_bytes(program)?;
    fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote tac image");
    Ok(())
}

pub fn load(path: &Path) -> Result<TacProgram, ImageError> {
    from_bytes(&fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_program;
    use crate::tac::lower::lower_program;

    fn sample() -> TacProgram {
        let program = parse_program(
            "10 DIM S AS STRING\n20 S = \"a\" + \"b\"\n30 IF S = \"ab\" THEN GOTO 50\n40 PRINT 1\n50 PRINT S\n",
        )
        .unwrap();
        lower_program(&program).unwrap()
    }

    #[test]
    fn test_image_preserves_program() {
        let tac = sample();
        let bytes = to_bytes(&tac).unwrap();
        assert!(bytes.starts_with(b"TACB"));
        assert_eq!(from_bytes(&bytes).unwrap(), tac);
    }

    #[test]
    fn test_rejects_foreign_bytes() {
        assert!(matches!(from_bytes(b"\x0c\x00\x01"), Err(ImageError::BadMagic)));
    }

    #[test]
    fn test_rejects_truncated_image() {
        let bytes = to_bytes(&sample()).unwrap();
        let err = from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ImageError::Encoding(_)));
    }
}
