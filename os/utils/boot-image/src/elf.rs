//! # ELF Identification
//!
//! Only the identification bytes (`e_ident`) are inspected: the signature,
//! the class and the data encoding. Nothing past them is parsed, since the
//! assembler copies the kernel verbatim and never interprets its segments.

/// `0x7F 'E' 'L' 'F'`
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// `EI_CLASS` value for 32-bit objects.
pub const ELFCLASS32: u8 = 1;

/// `EI_CLASS` value for 64-bit objects.
pub const ELFCLASS64: u8 = 2;

/// Bytes needed to see the signature and the class.
pub const MIN_IDENT_LEN: usize = 5;

const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;

/// Reasons a buffer is rejected as a kernel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("kernel image is too short ({len} bytes) to carry an ELF identification")]
    TooShort { len: usize },
    #[error("kernel image does not start with the ELF signature")]
    NotRecognizedFormat,
    #[error("kernel image has ELF class {class}, expected 64-bit (class 2)")]
    WrongArchitectureClass { class: u8 },
}

/// Data encoding of the object (`EI_DATA`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
    /// Any value other than `1` or `2`.
    Other(u8),
}

impl From<u8> for Endianness {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Little,
            2 => Self::Big,
            v => Self::Other(v),
        }
    }
}

/// The decoded identification of a validated kernel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExecutableHeader {
    pub class: u8,
    /// `None` if the buffer ends right after the class byte.
    pub endianness: Option<Endianness>,
}

impl ExecutableHeader {
    /// Decodes the identification bytes, applying the same checks as
    /// [`validate`].
    ///
    /// # Errors
    /// See [`ValidationError`]; checks run in the order length, signature,
    /// class and stop at the first failure.
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() < MIN_IDENT_LEN {
            return Err(ValidationError::TooShort { len: bytes.len() });
        }

        if bytes[..4] != ELF_MAGIC {
            return Err(ValidationError::NotRecognizedFormat);
        }

        let class = bytes[EI_CLASS];
        if class != ELFCLASS64 {
            return Err(ValidationError::WrongArchitectureClass { class });
        }

        Ok(Self {
            class,
            endianness: bytes.get(EI_DATA).copied().map(Endianness::from),
        })
    }
}

/// Confirms `bytes` start like a 64-bit ELF executable.
///
/// # Errors
/// Returns the first failing check as a [`ValidationError`].
pub fn validate(bytes: &[u8]) -> Result<(), ValidationError> {
    ExecutableHeader::parse(bytes).map(|_| ())
}
