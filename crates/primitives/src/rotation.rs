use serde::{Deserialize, Serialize};

/// Clockwise page rotation in quarter turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
	#[default]
	Degree0,
	Degree90,
	Degree180,
	Degree270,
}

impl Rotation {
	/// Returns the rotation in degrees.
	pub const fn degrees(self) -> u16 {
		match self {
			Self::Degree0 => 0,
			Self::Degree90 => 90,
			Self::Degree180 => 180,
			Self::Degree270 => 270,
		}
	}

	/// Rotates a further quarter turn clockwise.
	pub const fn clockwise(self) -> Self {
		match self {
			Self::Degree0 => Self::Degree90,
			Self::Degree90 => Self::Degree180,
			Self::Degree180 => Self::Degree270,
			Self::Degree270 => Self::Degree0,
		}
	}

	/// Rotates a quarter turn counter-clockwise.
	pub const fn counter_clockwise(self) -> Self {
		match self {
			Self::Degree0 => Self::Degree270,
			Self::Degree90 => Self::Degree0,
			Self::Degree180 => Self::Degree90,
			Self::Degree270 => Self::Degree180,
		}
	}
}

impl From<Rotation> for u16 {
	fn from(rotation: Rotation) -> Self {
		rotation.degrees()
	}
}

/// Returned when a degree value is not a multiple of 90 in `0..360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid rotation: {0} degrees")]
pub struct InvalidRotation(pub u16);

impl TryFrom<u16> for Rotation {
	type Error = InvalidRotation;

	fn try_from(degrees: u16) -> Result<Self, Self::Error> {
		match degrees {
			0 => Ok(Self::Degree0),
			90 => Ok(Self::Degree90),
			180 => Ok(Self::Degree180),
			270 => Ok(Self::Degree270),
			other => Err(InvalidRotation(other)),
		}
	}
}
