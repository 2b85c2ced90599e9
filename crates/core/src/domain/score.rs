use serde::{Deserialize, Serialize};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Score(u16);

impl Score {
    pub const MIN: u16 = 0;
    pub const MAX: u16 = 100;

    pub fn new(value: u16) -> Result<Self, DomainError> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidScore(value))
        }
    }

    /// Clamps an untrusted upstream score into `[MIN, MAX]`, rounding fractions.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        let rounded = value.round().clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        Self(rounded as u16)
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u16> for Score {
    type Error = DomainError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u16 {
    fn from(value: Score) -> Self {
        value.value()
    }
}

#[cfg(test)]
mod tests {
    use super::Score;

    #[test]
    fn valid_score_is_created() {
        let score = Score::new(100).expect("100 should be valid");

        assert_eq!(score.value(), 100);
    }

    #[test]
    fn invalid_score_is_rejected() {
        let err = Score::new(101).expect_err("101 should be rejected");

        assert_eq!(
            err.to_string(),
            "invalid score: 101. score must be in [0, 100]"
        );
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(Score::clamped(120.0).value(), 100);
        assert_eq!(Score::clamped(-5.0).value(), 0);
        assert_eq!(Score::clamped(87.6).value(), 88);
        assert_eq!(Score::clamped(f64::NAN).value(), 0);
    }
}
