use serde::Deserialize;

/// How `ConfirmBooking` treats capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmPolicy {
    /// Re-check confirmed capacity before confirming; keeps the no-oversell invariant.
    #[default]
    Revalidate,
    /// Confirm every matching pending booking without a capacity check.
    Optimistic,
}
