//! Physical channels and the header component code.
use crate::constants::FIELD_SLOTS;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A physical channel an IAF block slot can map onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Channel {
    /// Northward component (nT)
    X,
    /// Eastward component (nT)
    Y,
    /// Vertical component (nT)
    Z,
    /// Horizontal intensity (nT)
    H,
    /// Declination (deg)
    D,
    /// Total field (nT)
    F,
    /// ΔF: scalar total field minus vector magnitude (nT)
    DeltaF,
    /// 3-hour K index
    K,
    /// Reserved words attached to the K series
    Ir,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Z => write!(f, "z"),
            Self::H => write!(f, "h"),
            Self::D => write!(f, "d"),
            Self::F => write!(f, "f"),
            Self::DeltaF => write!(f, "df"),
            Self::K => write!(f, "k"),
            Self::Ir => write!(f, "ir"),
        }
    }
}

/// Parsed header component code: up to four lowercase letters naming
/// the physical channels recorded in the four block slots. `g` stands
/// for ΔF; a code shorter than four letters implies a trailing F slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentSet {
    code: String,
}

impl ComponentSet {
    /// Parses a component code like "XYZG" or "hdzf".
    /// Letters beyond the fourth are ignored.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        let code = code.chars().take(FIELD_SLOTS).collect();
        Self { code }
    }

    /// Normalized (lowercase) component code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Uppercase code, as packed into the 64 byte header.
    pub fn wire_code(&self) -> String {
        self.code.to_uppercase()
    }

    /// True when the first three slots follow the H/D/Z convention.
    pub fn is_hdz(&self) -> bool {
        self.code.starts_with("hdz")
    }

    /// True when a total field channel is declared.
    pub fn has_f(&self) -> bool {
        self.code.contains('f')
    }

    /// True when a ΔF channel is declared ('g' letter).
    pub fn has_delta_f(&self) -> bool {
        self.code.contains('g')
    }

    /// Appends the ΔF marker to the code ("XYZ" becomes "XYZG").
    pub fn with_delta_f(&self) -> Self {
        let mut code = self.code.clone();
        if !code.contains('g') && code.len() < FIELD_SLOTS {
            code.push('g');
        }
        Self { code }
    }

    /// Channel labels of the four block slots, in storage order.
    /// H/D convention slots are relabeled onto the X/Y axes,
    /// matching the labels a decoded archive exposes.
    pub fn slots(&self) -> [Channel; FIELD_SLOTS] {
        let mut slots = [Channel::X, Channel::Y, Channel::Z, Channel::F];
        for (idx, letter) in self.code.chars().enumerate() {
            slots[idx] = match letter {
                'x' | 'h' => Channel::X,
                'y' | 'd' | 'e' => Channel::Y,
                'z' => Channel::Z,
                'g' => Channel::DeltaF,
                _ => Channel::F,
            };
        }
        slots
    }
}

impl std::fmt::Display for ComponentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}
