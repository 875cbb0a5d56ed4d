//! Shift labels, peel values, and per-day assignments.

use serde::{Deserialize, Serialize};

/// Points awarded for an admin slot, wherever it falls in the week.
pub const ADMIN_POINTS: u32 = 8;

/// The shift a doctor holds on a given day.
///
/// `TURN_ORDER` is the canonical departure ordering: smaller groups leave
/// the OR earlier. Admin is the exception; it carries a fixed point value
/// and no peel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftLabel {
    #[serde(rename = "Post-Call")]
    PostCall,
    #[serde(rename = "Post-Holiday")]
    PostHoliday,
    #[serde(rename = "Post-Late")]
    PostLate,
    #[serde(rename = "Pre-Call")]
    PreCall,
    #[serde(rename = "Pre-Holiday")]
    PreHoliday,
    Unassigned,
    OnLate,
    OnCall,
    Admin,
    /// A previously Unassigned doctor once the solver has fixed a peel.
    Assigned,
}

impl ShiftLabel {
    /// Departure-order walk of the label groups.
    pub const TURN_ORDER: [ShiftLabel; 9] = [
        ShiftLabel::PostCall,
        ShiftLabel::PostHoliday,
        ShiftLabel::PostLate,
        ShiftLabel::PreCall,
        ShiftLabel::PreHoliday,
        ShiftLabel::Unassigned,
        ShiftLabel::OnLate,
        ShiftLabel::OnCall,
        ShiftLabel::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftLabel::PostCall => "Post-Call",
            ShiftLabel::PostHoliday => "Post-Holiday",
            ShiftLabel::PostLate => "Post-Late",
            ShiftLabel::PreCall => "Pre-Call",
            ShiftLabel::PreHoliday => "Pre-Holiday",
            ShiftLabel::Unassigned => "Unassigned",
            ShiftLabel::OnLate => "OnLate",
            ShiftLabel::OnCall => "OnCall",
            ShiftLabel::Admin => "Admin",
            ShiftLabel::Assigned => "Assigned",
        }
    }

    /// Labels holding at most one doctor per day.
    pub fn is_single(&self) -> bool {
        !matches!(
            self,
            ShiftLabel::Unassigned | ShiftLabel::Admin | ShiftLabel::Assigned
        )
    }
}

impl std::fmt::Display for ShiftLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Peel value of an assignment: a settled integer for fixed roles, or the
/// contiguous range an Unassigned doctor may still land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Points {
    Fixed(u32),
    Range { lo: u32, hi: u32 },
}

impl Points {
    /// Every value the assignment can take.
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        match *self {
            Points::Fixed(v) => v..=v,
            Points::Range { lo, hi } => lo..=hi,
        }
    }

    pub fn contains(&self, value: u32) -> bool {
        match *self {
            Points::Fixed(v) => v == value,
            Points::Range { lo, hi } => (lo..=hi).contains(&value),
        }
    }

    /// The settled value, if there is exactly one.
    pub fn fixed(&self) -> Option<u32> {
        match *self {
            Points::Fixed(v) => Some(v),
            Points::Range { .. } => None,
        }
    }

    /// Number of values the assignment spans.
    pub fn width(&self) -> u32 {
        match *self {
            Points::Fixed(_) => 1,
            Points::Range { lo, hi } => hi - lo + 1,
        }
    }
}

impl std::fmt::Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Points::Fixed(v) => write!(f, "{}", v),
            Points::Range { lo, hi } => write!(f, "{}-{}", lo, hi),
        }
    }
}

/// One doctor's assignment on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub doctor: String,
    pub points: Points,
    pub shift: ShiftLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_order_sequence() {
        assert_eq!(ShiftLabel::TURN_ORDER[0], ShiftLabel::PostCall);
        assert_eq!(ShiftLabel::TURN_ORDER[5], ShiftLabel::Unassigned);
        assert_eq!(ShiftLabel::TURN_ORDER[8], ShiftLabel::Admin);
    }

    #[test]
    fn test_shift_label_serialized_names() {
        assert_eq!(
            serde_json::to_string(&ShiftLabel::PostCall).unwrap(),
            "\"Post-Call\""
        );
        assert_eq!(
            serde_json::to_string(&ShiftLabel::PreHoliday).unwrap(),
            "\"Pre-Holiday\""
        );
        assert_eq!(serde_json::to_string(&ShiftLabel::OnCall).unwrap(), "\"OnCall\"");
    }

    #[test]
    fn test_points_range_iteration() {
        let points = Points::Range { lo: 3, hi: 5 };
        assert_eq!(points.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(points.width(), 3);
        assert!(points.contains(4));
        assert!(!points.contains(6));
        assert_eq!(points.fixed(), None);
    }

    #[test]
    fn test_points_fixed() {
        let points = Points::Fixed(7);
        assert_eq!(points.iter().collect::<Vec<_>>(), vec![7]);
        assert_eq!(points.fixed(), Some(7));
        assert_eq!(points.width(), 1);
    }

    #[test]
    fn test_points_display() {
        assert_eq!(Points::Fixed(8).to_string(), "8");
        assert_eq!(Points::Range { lo: 2, hi: 4 }.to_string(), "2-4");
    }
}
