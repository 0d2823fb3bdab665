pub const STATUS_ON_CHARGER: u32 = 0x1000;
pub const STATUS_CHARGING: u32 = 0x2000;

/// Charging state decoded once from the raw status bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Unknown,
    Idle,
    OnCharger,
    Charging,
}

impl DeviceStatus {
    /// The on-charger bit wins when both charger bits are set.
    pub fn from_raw(raw: Option<u32>) -> Self {
        match raw {
            None => DeviceStatus::Unknown,
            Some(bits) if bits & STATUS_ON_CHARGER != 0 => DeviceStatus::OnCharger,
            Some(bits) if bits & STATUS_CHARGING != 0 => DeviceStatus::Charging,
            Some(_) => DeviceStatus::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Unknown => "status unavailable",
            DeviceStatus::Idle => "idle",
            DeviceStatus::OnCharger => "on charger",
            DeviceStatus::Charging => "charging",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_charger_bits() {
        assert_eq!(DeviceStatus::from_raw(None), DeviceStatus::Unknown);
        assert_eq!(DeviceStatus::from_raw(Some(0)), DeviceStatus::Idle);
        assert_eq!(DeviceStatus::from_raw(Some(0x1000)), DeviceStatus::OnCharger);
        assert_eq!(DeviceStatus::from_raw(Some(0x2000)), DeviceStatus::Charging);
        assert_eq!(DeviceStatus::from_raw(Some(0x3000)), DeviceStatus::OnCharger);
    }

    #[test]
    fn unrelated_bits_are_idle() {
        assert_eq!(DeviceStatus::from_raw(Some(0x0001 | 0x0400)), DeviceStatus::Idle);
    }
}
