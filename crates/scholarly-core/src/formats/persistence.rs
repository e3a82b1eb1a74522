//! # Draft Persistence Format
//!
//! Binary serialization for application drafts.
//!
//! Format: Header (5 bytes) + postcard-serialized `WizardDraft`.
//! - 4 bytes: Magic ("SCHL")
//! - 1 byte: Version
//!
//! Size and header are checked before the payload is decoded, and a
//! decoded draft must pass `WizardDraft::validate`.

use crate::{PortalError, WizardDraft, primitives};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted encoded draft size (16 MB).
///
/// Drafts hold text fields and attachment metadata only; anything larger
/// is corrupt.
pub const MAX_DRAFT_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Header length in bytes.
const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header that precedes every encoded draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl DraftHeader {
    /// Create a header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Check magic bytes and version.
    pub fn validate(&self) -> Result<(), PortalError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(PortalError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(PortalError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Decode a header from the start of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PortalError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PortalError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for DraftHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode a draft (header + payload).
pub fn draft_to_bytes(draft: &WizardDraft) -> Result<Vec<u8>, PortalError> {
    let payload =
        postcard::to_stdvec(draft).map_err(|e| PortalError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&DraftHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a draft produced by [`draft_to_bytes`].
pub fn draft_from_bytes(bytes: &[u8]) -> Result<WizardDraft, PortalError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PortalError::SerializationError(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    if bytes.len() > MAX_DRAFT_PAYLOAD_SIZE {
        return Err(PortalError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_DRAFT_PAYLOAD_SIZE
        )));
    }

    DraftHeader::from_bytes(bytes)?.validate()?;

    let draft: WizardDraft = postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        PortalError::SerializationError(format!("Failed to deserialize draft data: {}", e))
    })?;
    draft.validate()?;
    Ok(draft)
}

// =============================================================================
// TESTS
// =============================================================================
