use super::advisory::Advisory;

/// Highest value the volume slider can show.
pub const SLIDER_MAX: u32 = 100;
/// Highest value the volume edit field accepts.
pub const EDIT_MAX: u32 = 200;
/// Volume used when an edit is rejected.
pub const RESET_VOLUME: u32 = 100;

/// Outcome of a volume change, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeChange {
    /// Value for the engine and the store.
    pub applied: u32,
    /// Value for the slider, which never goes past [`SLIDER_MAX`].
    pub slider: u32,
    pub advisory: Option<Advisory>,
}

/// Interpret text typed into the volume field.
///
/// Text that is not a whole non-negative number falls back to `stored`.
/// Values above [`EDIT_MAX`] reset to [`RESET_VOLUME`]; values above
/// [`SLIDER_MAX`] are accepted with a hearing warning.
pub fn interpret_edit(text: &str, stored: u32) -> VolumeChange {
    let requested = text.trim().parse::<u32>().unwrap_or(stored);
    let (applied, advisory) = if requested > EDIT_MAX {
        (RESET_VOLUME, Some(Advisory::VolumeReset { requested }))
    } else if requested > SLIDER_MAX {
        (requested, Some(Advisory::HighVolume { volume: requested }))
    } else {
        (requested, None)
    };
    VolumeChange {
        applied,
        slider: applied.min(SLIDER_MAX),
        advisory,
    }
}

/// Interpret a slider position; sliders stay within `0..=100`.
pub fn from_slider(position: i64) -> VolumeChange {
    let applied = position.clamp(0, SLIDER_MAX as i64) as u32;
    VolumeChange {
        applied,
        slider: applied,
        advisory: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_above_limit_resets_with_advisory() {
        let change = interpret_edit("250", 80);
        assert_eq!(change.applied, 100);
        assert_eq!(change.slider, 100);
        assert_eq!(change.advisory, Some(Advisory::VolumeReset { requested: 250 }));
    }

    #[test]
    fn loud_edit_is_applied_but_slider_clamps() {
        let change = interpret_edit("150", 80);
        assert_eq!(change.applied, 150);
        assert_eq!(change.slider, 100);
        assert_eq!(change.advisory, Some(Advisory::HighVolume { volume: 150 }));
    }

    #[test]
    fn normal_edit_has_no_advisory() {
        let change = interpret_edit(" 35 ", 80);
        assert_eq!((change.applied, change.slider, change.advisory), (35, 35, None));
    }

    #[test]
    fn unparsable_edit_keeps_stored_volume() {
        for text in ["", "loud", "-5", "12.5"] {
            assert_eq!(interpret_edit(text, 70).applied, 70, "{text:?}");
        }
    }

    #[test]
    fn slider_positions_are_clamped() {
        assert_eq!(from_slider(-3).applied, 0);
        assert_eq!(from_slider(64).applied, 64);
        assert_eq!(from_slider(180).applied, 100);
    }
}
