use player_animation::MovementInputFlags;
use rapier3d::prelude::Real;

/// Edge-triggered input events delivered before the frame's tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Jump,
    SprintActivated,
    SprintDeactivated,
    WalkToggled,
    CrouchActivated,
    CrouchDeactivated,
}

/// Continuous movement input; the controller owns the held-duration accounting.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputReader {
    pub move_composite: [Real; 2],
    pub movement_input_detected: bool,
    /// Seconds the movement input has been held, advanced by the controller.
    pub movement_input_duration: Real,
}

impl InputReader {
    /// Stores the move axis, clamped to unit length.
    pub fn set_move(&mut self, axis: [Real; 2]) {
        self.move_composite = Self::normalize_axis(axis);
        self.movement_input_detected = axis != [0.0, 0.0];
    }

    fn normalize_axis(axis: [Real; 2]) -> [Real; 2] {
        let len = (axis[0] * axis[0] + axis[1] * axis[1]).sqrt();
        if len > 1.0 {
            [axis[0] / len, axis[1] / len]
        } else {
            axis
        }
    }

    /// Classifies the current press as tap, press or hold and advances the held duration.
    ///
    /// A tap leaves the press/hold flags as they were.
    pub fn classify_movement(
        &mut self,
        previous: MovementInputFlags,
        hold_threshold: Real,
        dt: Real,
    ) -> MovementInputFlags {
        if !self.movement_input_detected {
            self.movement_input_duration = 0.0;
            return MovementInputFlags::default();
        }

        let duration = self.movement_input_duration;
        let flags = if duration == 0.0 {
            MovementInputFlags {
                tapped: true,
                ..previous
            }
        } else if duration > 0.0 && duration < hold_threshold {
            MovementInputFlags {
                tapped: false,
                pressed: true,
                held: false,
            }
        } else {
            MovementInputFlags {
                tapped: false,
                pressed: false,
                held: true,
            }
        };
        self.movement_input_duration += dt;
        flags
    }
}
