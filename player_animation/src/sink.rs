use std::collections::BTreeMap;

use rapier3d::prelude::Real;

/// Animator parameters written by the synthesizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    MovementInputTapped,
    MovementInputPressed,
    MovementInputHeld,
    ShuffleDirectionX,
    ShuffleDirectionZ,
    MoveSpeed,
    CurrentGait,
    IsJumping,
    FallingDuration,
    InclineAngle,
    StrafeDirectionX,
    StrafeDirectionZ,
    ForwardStrafe,
    CameraRotationOffset,
    IsStrafing,
    IsTurningInPlace,
    IsCrouching,
    IsWalking,
    IsStopped,
    IsStarting,
    IsGrounded,
    LeanValue,
    HeadLookX,
    HeadLookY,
    BodyLookX,
    BodyLookY,
    LocomotionStartDirection,
}

impl Channel {
    pub const ALL: [Channel; 27] = [
        Channel::MovementInputTapped,
        Channel::MovementInputPressed,
        Channel::MovementInputHeld,
        Channel::ShuffleDirectionX,
        Channel::ShuffleDirectionZ,
        Channel::MoveSpeed,
        Channel::CurrentGait,
        Channel::IsJumping,
        Channel::FallingDuration,
        Channel::InclineAngle,
        Channel::StrafeDirectionX,
        Channel::StrafeDirectionZ,
        Channel::ForwardStrafe,
        Channel::CameraRotationOffset,
        Channel::IsStrafing,
        Channel::IsTurningInPlace,
        Channel::IsCrouching,
        Channel::IsWalking,
        Channel::IsStopped,
        Channel::IsStarting,
        Channel::IsGrounded,
        Channel::LeanValue,
        Channel::HeadLookX,
        Channel::HeadLookY,
        Channel::BodyLookX,
        Channel::BodyLookY,
        Channel::LocomotionStartDirection,
    ];

    /// Parameter name as authored in the animator graph.
    pub fn name(self) -> &'static str {
        match self {
            Channel::MovementInputTapped => "MovementInputTapped",
            Channel::MovementInputPressed => "MovementInputPressed",
            Channel::MovementInputHeld => "MovementInputHeld",
            Channel::ShuffleDirectionX => "ShuffleDirectionX",
            Channel::ShuffleDirectionZ => "ShuffleDirectionZ",
            Channel::MoveSpeed => "MoveSpeed",
            Channel::CurrentGait => "CurrentGait",
            Channel::IsJumping => "IsJumping",
            Channel::FallingDuration => "FallingDuration",
            Channel::InclineAngle => "InclineAngle",
            Channel::StrafeDirectionX => "StrafeDirectionX",
            Channel::StrafeDirectionZ => "StrafeDirectionZ",
            Channel::ForwardStrafe => "ForwardStrafe",
            Channel::CameraRotationOffset => "CameraRotationOffset",
            Channel::IsStrafing => "IsStrafing",
            Channel::IsTurningInPlace => "IsTurningInPlace",
            Channel::IsCrouching => "IsCrouching",
            Channel::IsWalking => "IsWalking",
            Channel::IsStopped => "IsStopped",
            Channel::IsStarting => "IsStarting",
            Channel::IsGrounded => "IsGrounded",
            Channel::LeanValue => "LeanValue",
            Channel::HeadLookX => "HeadLookX",
            Channel::HeadLookY => "HeadLookY",
            Channel::BodyLookX => "BodyLookX",
            Channel::BodyLookY => "BodyLookY",
            Channel::LocomotionStartDirection => "LocomotionStartDirection",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Float(Real),
    Bool(bool),
    Int(i32),
}

/// Named-parameter receiver. Reads return the last written value, or a zero default.
pub trait AnimatorSink {
    fn set_float(&mut self, channel: Channel, value: Real);
    fn set_bool(&mut self, channel: Channel, value: bool);
    fn set_int(&mut self, channel: Channel, value: i32);
    fn get_float(&self, channel: Channel) -> Real;
    fn get_bool(&self, channel: Channel) -> bool;
}

/// In-memory sink recording the latest value per channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterMap {
    values: BTreeMap<Channel, ParamValue>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: Channel) -> Option<ParamValue> {
        self.values.get(&channel).copied()
    }

    pub fn float(&self, channel: Channel) -> Option<Real> {
        match self.get(channel)? {
            ParamValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn bool(&self, channel: Channel) -> Option<bool> {
        match self.get(channel)? {
            ParamValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn int(&self, channel: Channel) -> Option<i32> {
        match self.get(channel)? {
            ParamValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, ParamValue)> + '_ {
        self.values.iter().map(|(channel, value)| (*channel, *value))
    }
}

impl AnimatorSink for ParameterMap {
    fn set_float(&mut self, channel: Channel, value: Real) {
        self.values.insert(channel, ParamValue::Float(value));
    }

    fn set_bool(&mut self, channel: Channel, value: bool) {
        self.values.insert(channel, ParamValue::Bool(value));
    }

    fn set_int(&mut self, channel: Channel, value: i32) {
        self.values.insert(channel, ParamValue::Int(value));
    }

    fn get_float(&self, channel: Channel) -> Real {
        self.float(channel).unwrap_or(0.0)
    }

    fn get_bool(&self, channel: Channel) -> bool {
        self.bool(channel).unwrap_or(false)
    }
}
