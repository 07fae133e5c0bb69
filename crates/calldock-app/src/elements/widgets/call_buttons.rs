//! Key legend for the in-call screen.

use calldock_core::types::{CallDirection, CallState};

use crate::message::CallSnapshot;

/// Key/label pairs for the controls available in the call's current state.
pub fn call_controls(snap: &CallSnapshot) -> Vec<(String, String)> {
    let mut controls = Vec::new();
    match (snap.state, snap.direction) {
        (CallState::Ringing, CallDirection::Inbound) => {
            controls.push(("Enter".into(), "accept".into()));
            controls.push(("Esc".into(), "decline".into()));
        }
        (CallState::Dialing, _) | (CallState::Ringing, CallDirection::Outbound) => {
            controls.push(("Esc".into(), "cancel".into()));
        }
        (CallState::Ended, _) => {}
        _ => {
            let mute = if snap.muted { "unmute" } else { "mute" };
            let video = if snap.video_on { "video off" } else { "video on" };
            controls.push(("m".into(), mute.into()));
            controls.push(("v".into(), video.into()));
            controls.push(("e".into(), "hang up".into()));
        }
    }
    controls
}
