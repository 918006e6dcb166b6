//! Job status and its legal transitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Waiting,
    Aborted,
    Finished,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Waiting => "waiting",
            Self::Aborted => "aborted",
            Self::Finished => "finished",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted | Self::Finished)
    }

    /// Whether a job in this status has no current claimant and can be claimed.
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending | Self::Waiting)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "waiting" => Ok(Self::Waiting),
            "aborted" => Ok(Self::Aborted),
            "finished" => Ok(Self::Finished),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(Status::Aborted.is_terminal());
        assert!(Status::Finished.is_terminal());
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::InProgress.is_terminal());
        assert!(!Status::Waiting.is_terminal());
    }

    #[test]
    fn claimable_states() {
        assert!(Status::Pending.is_claimable());
        assert!(Status::Waiting.is_claimable());
        assert!(!Status::InProgress.is_claimable());
        assert!(!Status::Aborted.is_claimable());
        assert!(!Status::Finished.is_claimable());
    }

    #[test]
    fn round_trips_through_str() {
        for s in [
            Status::Pending,
            Status::InProgress,
            Status::Waiting,
            Status::Aborted,
            Status::Finished,
        ] {
            assert_eq!(s.as_str().parse::<Status>().unwrap(), s);
        }
    }
}
