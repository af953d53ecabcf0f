use super::direction::Direction;

/// Single-slot command buffer. A newer command overwrites an older one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct InputGate {
    pending: Direction,
}

impl InputGate {
    pub(crate) fn pending(&self) -> Direction {
        self.pending
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_none()
    }

    /// Buffers `direction`, returning whatever it replaced.
    pub(crate) fn buffer(&mut self, direction: Direction) -> Direction {
        std::mem::replace(&mut self.pending, direction)
    }

    pub(crate) fn take(&mut self) -> Option<Direction> {
        let taken = std::mem::take(&mut self.pending);
        (!taken.is_none()).then_some(taken)
    }

    pub(crate) fn clear(&mut self) {
        self.pending = Direction::None;
    }
}
