//! Per-state input capabilities and the closed transition graph.

use player_animation::LocomotionState;

use crate::input::InputEvent;

/// What the controller does with an event in a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    ToggleWalk,
    ActivateSprint,
    DeactivateSprint,
    ActivateCrouch,
    DeactivateCrouch,
    EnterJump,
    /// Jump from a crouch; only fires when the capsule can stand up.
    CrouchJump,
}

type Capabilities = &'static [(InputEvent, Reaction)];

const LOCOMOTION: Capabilities = &[
    (InputEvent::Jump, Reaction::EnterJump),
    (InputEvent::WalkToggled, Reaction::ToggleWalk),
    (InputEvent::SprintActivated, Reaction::ActivateSprint),
    (InputEvent::SprintDeactivated, Reaction::DeactivateSprint),
    (InputEvent::CrouchActivated, Reaction::ActivateCrouch),
    (InputEvent::CrouchDeactivated, Reaction::DeactivateCrouch),
];

const CROUCH: Capabilities = &[
    (InputEvent::Jump, Reaction::CrouchJump),
    (InputEvent::WalkToggled, Reaction::ToggleWalk),
    (InputEvent::SprintActivated, Reaction::ActivateSprint),
    (InputEvent::SprintDeactivated, Reaction::DeactivateSprint),
    (InputEvent::CrouchActivated, Reaction::ActivateCrouch),
    (InputEvent::CrouchDeactivated, Reaction::DeactivateCrouch),
];

const AIRBORNE: Capabilities = &[
    (InputEvent::WalkToggled, Reaction::ToggleWalk),
    (InputEvent::SprintActivated, Reaction::ActivateSprint),
    (InputEvent::SprintDeactivated, Reaction::DeactivateSprint),
    (InputEvent::CrouchActivated, Reaction::ActivateCrouch),
    (InputEvent::CrouchDeactivated, Reaction::DeactivateCrouch),
];

pub fn capabilities(state: LocomotionState) -> Capabilities {
    match state {
        LocomotionState::Base => &[],
        LocomotionState::Locomotion => LOCOMOTION,
        LocomotionState::Crouch => CROUCH,
        LocomotionState::Jump | LocomotionState::Fall => AIRBORNE,
    }
}

pub fn reaction(state: LocomotionState, event: InputEvent) -> Option<Reaction> {
    capabilities(state)
        .iter()
        .find(|(candidate, _)| *candidate == event)
        .map(|(_, reaction)| *reaction)
}

pub fn is_legal_transition(from: LocomotionState, to: LocomotionState) -> bool {
    use LocomotionState::*;
    matches!(
        (from, to),
        (Base, Locomotion)
            | (Locomotion, Fall)
            | (Locomotion, Crouch)
            | (Locomotion, Jump)
            | (Jump, Fall)
            | (Fall, Locomotion)
            | (Crouch, Fall)
            | (Crouch, Locomotion)
            | (Crouch, Jump)
    )
}
