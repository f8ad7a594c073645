use bitflags::bitflags;

bitflags! {
    /// Status word reported by the device in a `Status` token.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusWord: u32 {
        /// Temperature control is running.
        const ACTIVE = 0b0001;
        const OVER_TEMPERATURE = 0b0010;
        const OVER_CURRENT = 0b0100;
        const FAULT = 0b1000;
    }
}

impl StatusWord {
    /// Any condition that forces the controller to stop.
    pub const FAULTS: Self = Self::OVER_TEMPERATURE
        .union(Self::OVER_CURRENT)
        .union(Self::FAULT);

    /// Decode the `i32` payload of a `Status` token. Reserved bits are dropped.
    pub fn from_payload(raw: i32) -> Self {
        Self::from_bits_truncate(raw as u32)
    }

    pub fn active(self) -> bool {
        self.contains(Self::ACTIVE)
    }

    pub fn over_temperature(self) -> bool {
        self.contains(Self::OVER_TEMPERATURE)
    }

    pub fn over_current(self) -> bool {
        self.contains(Self::OVER_CURRENT)
    }

    pub fn fault(self) -> bool {
        self.contains(Self::FAULT)
    }

    /// True if any fault condition is set.
    pub fn has_fault(self) -> bool {
        self.intersects(Self::FAULTS)
    }

    /// Bits that differ from a previous report.
    pub fn changed(self, previous: Self) -> Self {
        self.symmetric_difference(previous)
    }
}
