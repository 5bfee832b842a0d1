//! Measurement channel identifiers.
//!
//! All per-channel state in the workspace is stored in fixed arrays of
//! `CHANNEL_COUNT` entries indexed by [`Channel::index`].

use std::fmt;

/// Number of independent load-cell channels.
pub const CHANNEL_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    U1,
    U2,
    U3,
    U4,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [Channel::U1, Channel::U2, Channel::U3, Channel::U4];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Channel::U1 => 0,
            Channel::U2 => 1,
            Channel::U3 => 2,
            Channel::U4 => 3,
        }
    }

    /// Channel for a zero-based index, `None` when out of range.
    #[inline]
    pub const fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Channel::U1),
            1 => Some(Channel::U2),
            2 => Some(Channel::U3),
            3 => Some(Channel::U4),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Channel::U1 => "U1",
            Channel::U2 => "U2",
            Channel::U3 => "U3",
            Channel::U4 => "U4",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<usize> for Channel {
    type Error = usize;

    fn try_from(idx: usize) -> Result<Self, Self::Error> {
        Channel::from_index(idx).ok_or(idx)
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    /// Accepts `U1`..`U4` (case-insensitive) or a one-based number `1`..`4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let digits = t
            .strip_prefix('U')
            .or_else(|| t.strip_prefix('u'))
            .unwrap_or(t);
        match digits.parse::<usize>() {
            Ok(n @ 1..=CHANNEL_COUNT) => Channel::from_index(n - 1).ok_or_else(|| t.to_string()),
            _ => Err(format!("unknown channel '{t}' (expected U1..U4 or 1..4)")),
        }
    }
}
