use sysinfo::Signal;

use crate::system::anomaly::AnomalyKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Navigate(Direction),
    EnterFilterMode,
    /// Parse and apply the text typed so far.
    ApplyFilter,
    CancelFilter,
    ClearFilter,
    UpdateFilter(String),
    CycleSort,
    ToggleTree,
    ToggleAnomalies,
    ToggleHelp,
    ToggleDetail,
    ToggleRecording,
    /// Ask for confirmation before remediating the selected anomaly.
    RequestRemediation(u32, AnomalyKind),
    /// Remediation was requested on a process that is neither kind.
    NotAnomalous(u32),
    RequestRemediateAll,
    RequestSignal(u32, Signal),
    Confirm,
    Cancel,
    Refresh,
    None,
}
