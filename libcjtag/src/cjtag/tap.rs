use log::debug;
use rust_fsm::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapState {
    Reset,
    RunIdle,
    SelectDRScan,
    CaptureDR,
    ShiftDR,
    Exit1DR,
    PauseDR,
    Exit2DR,
    UpdateDR,
    SelectIRScan,
    CaptureIR,
    ShiftIR,
    Exit1IR,
    PauseIR,
    Exit2IR,
    UpdateIR,
}

/// TAP state machine over TMS values. The link folds every TMS bit it puts
/// on the wire through this machine, so the tracked state mirrors the
/// physical TAP.
#[derive(Debug)]
pub struct TapTracker;

impl StateMachineImpl for TapTracker {
    type Input = bool;
    type State = TapState;
    type Output = ();

    const INITIAL_STATE: Self::State = TapState::Reset;

    fn transition(state: &Self::State, tms: &Self::Input) -> Option<Self::State> {
        let next = match (state, tms) {
            // Reset
            (TapState::Reset, &true) => TapState::Reset,
            (TapState::Reset, &false) => TapState::RunIdle,

            // RunIdle
            (TapState::RunIdle, &true) => TapState::SelectDRScan,
            (TapState::RunIdle, &false) => TapState::RunIdle,

            // DR column
            (TapState::SelectDRScan, &true) => TapState::SelectIRScan,
            (TapState::SelectDRScan, &false) => TapState::CaptureDR,
            (TapState::CaptureDR, &true) => TapState::Exit1DR,
            (TapState::CaptureDR, &false) => TapState::ShiftDR,
            (TapState::ShiftDR, &true) => TapState::Exit1DR,
            (TapState::ShiftDR, &false) => TapState::ShiftDR,
            (TapState::Exit1DR, &true) => TapState::UpdateDR,
            (TapState::Exit1DR, &false) => TapState::PauseDR,
            (TapState::PauseDR, &true) => TapState::Exit2DR,
            (TapState::PauseDR, &false) => TapState::PauseDR,
            (TapState::Exit2DR, &true) => TapState::UpdateDR,
            (TapState::Exit2DR, &false) => TapState::ShiftDR,
            (TapState::UpdateDR, &true) => TapState::SelectDRScan,
            (TapState::UpdateDR, &false) => TapState::RunIdle,

            // IR column
            (TapState::SelectIRScan, &true) => TapState::Reset,
            (TapState::SelectIRScan, &false) => TapState::CaptureIR,
            (TapState::CaptureIR, &true) => TapState::Exit1IR,
            (TapState::CaptureIR, &false) => TapState::ShiftIR,
            (TapState::ShiftIR, &true) => TapState::Exit1IR,
            (TapState::ShiftIR, &false) => TapState::ShiftIR,
            (TapState::Exit1IR, &true) => TapState::UpdateIR,
            (TapState::Exit1IR, &false) => TapState::PauseIR,
            (TapState::PauseIR, &true) => TapState::Exit2IR,
            (TapState::PauseIR, &false) => TapState::PauseIR,
            (TapState::Exit2IR, &true) => TapState::UpdateIR,
            (TapState::Exit2IR, &false) => TapState::ShiftIR,
            (TapState::UpdateIR, &true) => TapState::SelectDRScan,
            (TapState::UpdateIR, &false) => TapState::RunIdle,
        };
        debug!("tap state change: {:?} -> {:?}", state, next);
        Some(next)
    }

    fn output(_state: &Self::State, _tms: &Self::Input) -> Option<Self::Output> {
        None
    }
}
