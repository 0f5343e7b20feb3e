use std::fmt;

/// The steps of one run, in order. Every transition is logged with its phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    Init,
    CollectSignals,
    ComputeRisk,
    Decide,
    Execute,
    RecordValuation,
    Finalize,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Init => "init",
            CyclePhase::CollectSignals => "collect_signals",
            CyclePhase::ComputeRisk => "compute_risk",
            CyclePhase::Decide => "decide",
            CyclePhase::Execute => "execute",
            CyclePhase::RecordValuation => "record_valuation",
            CyclePhase::Finalize => "finalize",
        };
        f.write_str(s)
    }
}
