use crate::modules::monitor::model::{MonitorStatus, Verdict};

/// Confirmed status change worth notifying about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down,
    Recovered,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Recovered => "recovered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardOutcome {
    pub status: MonitorStatus,
    pub consecutive_fails: u32,
    pub transition: Option<Transition>,
}

/// Flapping protection.
///
/// Recovery is immediate: one `Up` verdict resets the failure counter and
/// confirms `Up`. Degradation needs `threshold` consecutive `Down` verdicts.
/// Leaving `Pending` for `Up` is silent, and a monitor already `Down` never
/// re-announces its outage. A threshold below 1 behaves as 1.
pub fn evaluate(
    previous: MonitorStatus,
    consecutive_fails: u32,
    threshold: u32,
    verdict: Verdict,
) -> GuardOutcome {
    match verdict {
        Verdict::Up => GuardOutcome {
            status: MonitorStatus::Up,
            consecutive_fails: 0,
            transition: (previous == MonitorStatus::Down).then_some(Transition::Recovered),
        },
        Verdict::Down => {
            let fails = consecutive_fails.saturating_add(1);

            if fails >= threshold.max(1) && previous != MonitorStatus::Down {
                GuardOutcome {
                    status: MonitorStatus::Down,
                    consecutive_fails: fails,
                    transition: Some(Transition::Down),
                }
            } else {
                // Debounce window, or an outage that was already announced
                GuardOutcome {
                    status: previous,
                    consecutive_fails: fails,
                    transition: None,
                }
            }
        }
    }
}
