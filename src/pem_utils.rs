use crate::error::{PkiError, Result};

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF))
}

/// Parses the first PEM block of `input`.
pub fn parse_block(input: &[u8]) -> Result<pem::Pem> {
    pem::parse(input).map_err(|e| PkiError::DecodingError(e.to_string()))
}

/// Returns the contents of the first block labelled `label`, skipping any others.
///
/// Certificate files written by other tools often carry a whole bundle.
pub fn first_block_der(input: &[u8], label: &str) -> Result<Vec<u8>> {
    let blocks = pem::parse_many(input).map_err(|e| PkiError::DecodingError(e.to_string()))?;
    blocks
        .into_iter()
        .find(|block| block.tag() == label)
        .map(|block| block.into_contents())
        .ok_or_else(|| PkiError::DecodingError(format!("no `{label}` PEM block found")))
}
