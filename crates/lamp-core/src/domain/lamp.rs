//! Lamp state models.
//!
//! The two lamps behave differently:
//!
//! - The **nRF52840 lamp** is a simple on/off light.  Its state is a single
//!   byte in a GATT characteristic (`0x00` = off, `0x01` = on).  The hub also
//!   tracks an `Unknown` state for the time before the first read succeeds or
//!   when the lamp reports a byte it does not understand.
//!
//! - The **ESP32-S3 lamp** cycles through colours.  Each click on the panel
//!   advances it one step; the ESP32 itself owns the state and reports it
//!   back as an integer in an `update` message.
//!
//! ```text
//!   ESP click cycle:  Off ─► White ─► Yellow ─► Red ─► Off
//!                      ▲
//!                      └──── On (legacy value, any click turns it off)
//! ```

// ── nRF lamp ──────────────────────────────────────────────────────────────────

/// State of the BLE lamp as last observed by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NrfLampState {
    #[default]
    Unknown,
    Off,
    On,
}

impl NrfLampState {
    /// Decodes a characteristic value.
    ///
    /// Only the first byte is significant.  An empty buffer or any byte other
    /// than `0x00`/`0x01` yields [`NrfLampState::Unknown`].
    pub fn from_wire(bytes: &[u8]) -> Self {
        match bytes.first() {
            Some(0) => NrfLampState::Off,
            Some(1) => NrfLampState::On,
            _ => NrfLampState::Unknown,
        }
    }

    /// The byte to write to the characteristic, or `None` for `Unknown`.
    pub fn to_wire(self) -> Option<u8> {
        match self {
            NrfLampState::Off => Some(0),
            NrfLampState::On => Some(1),
            NrfLampState::Unknown => None,
        }
    }

    /// The state that a click on the nRF button asks for.
    ///
    /// `Off` becomes `On`; `On` and `Unknown` both become `Off`.
    pub fn toggled(self) -> Self {
        match self {
            NrfLampState::Off => NrfLampState::On,
            NrfLampState::On | NrfLampState::Unknown => NrfLampState::Off,
        }
    }

    /// The integer carried in `arg1` of a `lamp-nrf` update message.
    pub fn as_arg(self) -> Option<i64> {
        self.to_wire().map(i64::from)
    }

    /// Reverse of [`NrfLampState::as_arg`].
    pub fn from_arg(value: i64) -> Option<Self> {
        match value {
            0 => Some(NrfLampState::Off),
            1 => Some(NrfLampState::On),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NrfLampState::Unknown => "unknown",
            NrfLampState::Off => "off",
            NrfLampState::On => "on",
        }
    }
}

// ── ESP lamp ──────────────────────────────────────────────────────────────────

/// Colour state of the ESP32 lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i64)]
pub enum EspLampState {
    #[default]
    Off = 0,
    ColorWhite = 1,
    ColorYellow = 2,
    ColorRed = 3,
    On = 4,
}

impl EspLampState {
    /// Decodes the `arg1` of an ESP32 update message.
    pub fn from_arg(value: i64) -> Option<Self> {
        match value {
            0 => Some(EspLampState::Off),
            1 => Some(EspLampState::ColorWhite),
            2 => Some(EspLampState::ColorYellow),
            3 => Some(EspLampState::ColorRed),
            4 => Some(EspLampState::On),
            _ => None,
        }
    }

    pub fn as_arg(self) -> i64 {
        self as i64
    }

    /// The state the lamp moves to when the panel button is clicked.
    pub fn next_on_click(self) -> Self {
        match self {
            EspLampState::Off => EspLampState::ColorWhite,
            EspLampState::ColorWhite => EspLampState::ColorYellow,
            EspLampState::ColorYellow => EspLampState::ColorRed,
            EspLampState::ColorRed | EspLampState::On => EspLampState::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EspLampState::Off => "off",
            EspLampState::ColorWhite => "white",
            EspLampState::ColorYellow => "yellow",
            EspLampState::ColorRed => "red",
            EspLampState::On => "on",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nrf_from_wire_maps_first_byte() {
        assert_eq!(NrfLampState::from_wire(&[0x00]), NrfLampState::Off);
        assert_eq!(NrfLampState::from_wire(&[0x01]), NrfLampState::On);
        // Trailing bytes are ignored.
        assert_eq!(NrfLampState::from_wire(&[0x01, 0xFF]), NrfLampState::On);
    }

    #[test]
    fn test_nrf_from_wire_unknown_for_empty_or_other_bytes() {
        assert_eq!(NrfLampState::from_wire(&[]), NrfLampState::Unknown);
        assert_eq!(NrfLampState::from_wire(&[0x02]), NrfLampState::Unknown);
        assert_eq!(NrfLampState::from_wire(&[0xFF]), NrfLampState::Unknown);
    }

    #[test]
    fn test_nrf_toggle_from_unknown_turns_off() {
        assert_eq!(NrfLampState::Unknown.toggled(), NrfLampState::Off);
        assert_eq!(NrfLampState::Off.toggled(), NrfLampState::On);
        assert_eq!(NrfLampState::On.toggled(), NrfLampState::Off);
    }

    #[test]
    fn test_nrf_unknown_has_no_wire_byte() {
        assert_eq!(NrfLampState::Unknown.to_wire(), None);
        assert_eq!(NrfLampState::On.to_wire(), Some(1));
    }

    #[test]
    fn test_esp_click_cycle_returns_to_off_after_four_clicks() {
        // Arrange
        let mut state = EspLampState::Off;
        let mut seen = Vec::new();

        // Act
        for _ in 0..4 {
            state = state.next_on_click();
            seen.push(state);
        }

        // Assert
        assert_eq!(
            seen,
            vec![
                EspLampState::ColorWhite,
                EspLampState::ColorYellow,
                EspLampState::ColorRed,
                EspLampState::Off,
            ]
        );
    }

    #[test]
    fn test_esp_legacy_on_state_turns_off_on_click() {
        assert_eq!(EspLampState::On.next_on_click(), EspLampState::Off);
    }

    #[test]
    fn test_esp_from_arg_rejects_out_of_range() {
        assert_eq!(EspLampState::from_arg(3), Some(EspLampState::ColorRed));
        assert_eq!(EspLampState::from_arg(5), None);
        assert_eq!(EspLampState::from_arg(-1), None);
    }
}
