use std::fmt;

/// Lifecycle of one channel.
///
/// `Idle` is the only initial state; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeState {
    #[default]
    Idle,
    Stabilizing,
    Stable,
    Pouring,
    Restabilizing,
    KegAbsent,
    ReplacingKeg,
    InvalidWeight,
}

impl ChangeState {
    pub const COUNT: usize = 8;

    pub const ALL: [ChangeState; Self::COUNT] = [
        ChangeState::Idle,
        ChangeState::Stabilizing,
        ChangeState::Stable,
        ChangeState::Pouring,
        ChangeState::Restabilizing,
        ChangeState::KegAbsent,
        ChangeState::ReplacingKeg,
        ChangeState::InvalidWeight,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChangeState::Idle => "Idle",
            ChangeState::Stabilizing => "Stabilizing",
            ChangeState::Stable => "Stable",
            ChangeState::Pouring => "Pouring",
            ChangeState::Restabilizing => "Restabilizing",
            ChangeState::KegAbsent => "KegAbsent",
            ChangeState::ReplacingKeg => "ReplacingKeg",
            ChangeState::InvalidWeight => "InvalidWeight",
        }
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
