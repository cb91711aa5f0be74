//! Secret carving from the encrypted source string

use crate::error::ExtractError;
use crate::platform::script::VariableSequence;
use tracing::debug;

/// Highest loop count the player scheme declares slots for
pub const MAX_SLOTS: usize = 9;

/// Secret and ciphertext recovered from an encrypted source string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSecret {
    /// Password-equivalent string assembled from the carved pieces
    pub secret: String,
    /// Encrypted string with the carved pieces removed
    pub residual: String,
}

/// One `(start, increment)` slot of the variable sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    start: usize,
    inc: usize,
}

/// Fixed-capacity table of slots, iteration `i` reads `(vars[2 + 2i], vars[1 + 2i])`
#[derive(Debug, Clone, Copy)]
struct SlotTable {
    slots: [Slot; MAX_SLOTS],
    count: usize,
}

impl SlotTable {
    fn from_sequence(vars: &VariableSequence) -> Result<Self, ExtractError> {
        let count = match vars.get(0) {
            Some(count) => to_index(count, "loop count")?,
            None => return Err(ExtractError::PatternNotMatched),
        };

        if count > MAX_SLOTS {
            return Err(ExtractError::DerivationOutOfRange(format!(
                "loop count {} exceeds the {} declared slots",
                count, MAX_SLOTS
            )));
        }

        let required = 2 * count + 1;
        if vars.len() < required {
            return Err(ExtractError::DerivationOutOfRange(format!(
                "sequence has {} entries, loop count {} needs {}",
                vars.len(),
                count,
                required
            )));
        }

        let mut slots = [Slot::default(); MAX_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate().take(count) {
            let (start, inc) = (vars.as_slice()[2 + 2 * i], vars.as_slice()[1 + 2 * i]);
            *slot = Slot {
                start: to_index(start, "start")?,
                inc: to_index(inc, "increment")?,
            };
        }

        Ok(Self { slots, count })
    }

    fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots[..self.count].iter()
    }
}

fn to_index(value: i64, what: &str) -> Result<usize, ExtractError> {
    usize::try_from(value)
        .map_err(|_| ExtractError::DerivationOutOfRange(format!("negative {}: {}", what, value)))
}

/// Carve the secret out of `encrypted` using the slots in `vars`.
///
/// Offsets are computed against the original string; each piece is removed
/// from the residual by value, first occurrence only.
pub fn derive_secret(
    encrypted: &str,
    vars: &VariableSequence,
) -> Result<DerivedSecret, ExtractError> {
    let table = SlotTable::from_sequence(vars)?;

    let mut secret = String::new();
    let mut residual = encrypted.to_string();
    let mut offset = 0usize;

    for slot in table.iter() {
        let from = slot.start + offset;
        let to = from + slot.inc;

        let piece = encrypted.get(from..to).ok_or_else(|| {
            ExtractError::DerivationOutOfRange(format!(
                "slice {}..{} outside encrypted string of length {}",
                from,
                to,
                encrypted.len()
            ))
        })?;

        secret.push_str(piece);
        residual = residual.replacen(piece, "", 1);
        offset += slot.inc;
    }

    debug!(
        "Derived secret of {} chars over {} slots, residual {} chars",
        secret.len(),
        table.count,
        residual.len()
    );

    Ok(DerivedSecret { secret, residual })
}
