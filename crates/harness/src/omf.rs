//! Loader for the Motorola OMF-derived text dump format used to seed test
//! memory images: `_DATA <area> <addr>` header lines followed by rows of
//! space-separated 6-hex-digit words, terminated by the next `_` line or
//! end of input.
//!
//! Grounded on the reference OMF loader's `parseLine`/`parse24Bit`: this
//! keeps its two-state parse (header line vs. data line) and its `L`-area
//! convention (a 48-bit row is two 24-bit halves written to the same
//! target address in X and Y respectively), dropping only the `_START`/
//! `_SYMBOL` records the reference parses but never acts on.

use dsp56300_jit::runtime::DspMemory;
use dsp56300_jit::types::{MemArea, TWord};

#[derive(Debug, thiserror::Error)]
pub enum OmfError {
    #[error("line {line}: `_DATA` record names an unknown area `{area}` (expected X, Y, P, or L)")]
    UnknownArea { line: usize, area: char },
    #[error("line {line}: expected 6 hex digits per word, got {text:?}")]
    BadWord { line: usize, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    /// 24-bit words land in a single area.
    Single(MemArea),
    /// 48-bit `L` rows split into synchronized X/Y halves.
    Wide,
}

/// Parse `text` and apply every `_DATA` record it contains to `dst`.
///
/// # Errors
/// Returns an error on the first malformed `_DATA` header or data word.
pub fn load(text: &str, dst: &mut impl DspMemory) -> Result<(), OmfError> {
    let mut area: Option<Row> = None;
    let mut addr: TWord = 0;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("_DATA ") {
            let area_ch = rest.chars().next().unwrap_or('?');
            area = Some(match area_ch {
                'X' => Row::Single(MemArea::X),
                'Y' => Row::Single(MemArea::Y),
                'P' => Row::Single(MemArea::P),
                'L' => Row::Wide,
                other => return Err(OmfError::UnknownArea { line: line_no, area: other }),
            });
            let addr_field = rest.get(2..).unwrap_or("").trim();
            let addr_hex = addr_field.split_whitespace().next().unwrap_or("0");
            addr = TWord::from_str_radix(addr_hex, 16).unwrap_or(0);
        } else if line.starts_with('_') {
            // `_START`/`_SYMBOL`/unrecognized directive: ends the current
            // data run, same as the reference's fallback branch.
            area = None;
        } else if let Some(row) = area {
            match row {
                Row::Single(a) => {
                    for word in line.split_whitespace() {
                        let value = parse_word(word, line_no)?;
                        dst.set(a, addr, value);
                        addr += 1;
                    }
                }
                Row::Wide => {
                    let mut words = line.split_whitespace();
                    loop {
                        let Some(hi) = words.next() else { break };
                        let Some(lo) = words.next() else { break };
                        let hi_val = parse_word(hi, line_no)?;
                        let lo_val = parse_word(lo, line_no)?;
                        dst.set(MemArea::X, addr, hi_val);
                        dst.set(MemArea::Y, addr, lo_val);
                        addr += 1;
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_word(text: &str, line: usize) -> Result<TWord, OmfError> {
    if text.len() != 6 {
        return Err(OmfError::BadWord { line, text: text.to_string() });
    }
    TWord::from_str_radix(text, 16).map_err(|_| OmfError::BadWord { line, text: text.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    #[test]
    fn loads_a_single_area_record() {
        let mut mem = FlatMemory::new(8);
        load("_DATA X 000002\n012345 abcdef\n", &mut mem).unwrap();
        assert_eq!(mem.get(MemArea::X, 2), 0x012345);
        assert_eq!(mem.get(MemArea::X, 3), 0xabcdef);
    }

    #[test]
    fn loads_a_wide_l_record_into_both_x_and_y() {
        let mut mem = FlatMemory::new(8);
        load("_DATA L 000000\n111111 222222\n", &mut mem).unwrap();
        assert_eq!(mem.get(MemArea::X, 0), 0x111111);
        assert_eq!(mem.get(MemArea::Y, 0), 0x222222);
    }

    #[test]
    fn a_directive_line_ends_the_current_data_run() {
        let mut mem = FlatMemory::new(8);
        load("_DATA P 000000\n000001\n_SYMBOL foo\n000002\n", &mut mem).unwrap();
        assert_eq!(mem.get(MemArea::P, 0), 0x000001);
        assert_eq!(mem.get(MemArea::P, 1), 0);
    }

    #[test]
    fn rejects_an_unknown_area_tag() {
        let mut mem = FlatMemory::new(8);
        let err = load("_DATA Q 000000\n", &mut mem).unwrap_err();
        assert!(matches!(err, OmfError::UnknownArea { area: 'Q', .. }));
    }
}
