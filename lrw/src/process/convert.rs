//! Payload sample-format conversion.
//!
//! Payload words arrive big-endian from the probe regardless of the
//! capture's own word order. Conversion permutes octets into the byte
//! order the data type declares and never changes the payload length:
//! output octets always equal input octets.

use crate::structs::header::DataType;

/// Converts raw payload words to the declared sample format.
///
/// Dispatch is total over [`DataType`]; unrecognized tags are rejected
/// earlier, when the header word is decoded.
pub fn convert_payload(data_type: DataType, words: &[u32]) -> Vec<u8> {
    match data_type {
        // Stored big-endian and kept that way.
        DataType::Data16 | DataType::Data32 => {
            words.iter().flat_map(|word| word.to_be_bytes()).collect()
        }

        // Big-endian 16-bit pairs, each sample byte-swapped.
        DataType::Pcm16 => {
            let mut out = Vec::with_capacity(words.len() * 4);
            for word in words {
                let [a, b, c, d] = word.to_be_bytes();
                out.extend_from_slice(&[b, a, d, c]);
            }
            out
        }

        // Flat octet sequence, every 3-octet group reversed. A 1-2 octet
        // remainder is final-word padding and passes through unchanged.
        DataType::Pcm24 => {
            let octets: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
            let mut out = Vec::with_capacity(octets.len());
            let mut groups = octets.chunks_exact(3);
            for group in &mut groups {
                out.extend_from_slice(&[group[2], group[1], group[0]]);
            }
            out.extend_from_slice(groups.remainder());
            out
        }

        // Full word byte-swap.
        DataType::Pcm32 | DataType::Ttr => {
            words.iter().flat_map(|word| word.to_le_bytes()).collect()
        }
    }
}
