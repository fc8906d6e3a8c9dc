//! Lock-free input buffer for intents from the input collaborator
//!
//! Uses crossbeam-channel so any number of producers (device polling,
//! scripted sources, tests) can submit intents without blocking. The
//! world drains everything pending at the start of each step.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::game::constants::input;
use crate::util::vec2::Vec2;

/// Movement axis direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit vector in screen space (y grows downward)
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::UP,
            Direction::Down => Vec2::DOWN,
            Direction::Left => Vec2::LEFT,
            Direction::Right => Vec2::RIGHT,
        }
    }
}

/// Discrete intent; the core never polls device state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Axis movement started (`engaged`) or stopped
    Move { direction: Direction, engaged: bool },
    /// Fire trigger pressed or released
    Fire { engaged: bool },
    /// Pointer moved to a world position
    Pointer { position: Vec2 },
    /// Stop the driver after the current frame
    Quit,
}

/// Timestamped intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputIntent {
    /// Time since the producer started
    pub timestamp: Duration,
    pub intent: Intent,
}

/// Input buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InputBufferError {
    /// Buffer is full (backpressure)
    #[error("input buffer full")]
    Full,
    /// Channel disconnected (world dropped)
    #[error("input buffer disconnected")]
    Disconnected,
}

/// Bounded intent channel owned by the world
pub struct InputBuffer {
    sender: Sender<InputIntent>,
    receiver: Receiver<InputIntent>,
    capacity: usize,
}

impl InputBuffer {
    /// Capacity should cover every intent produced between two steps
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Create a new sender handle for a producer
    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Try to submit an intent (non-blocking)
    #[inline]
    pub fn try_submit(&self, timestamp: Duration, intent: Intent) -> Result<(), InputBufferError> {
        send(&self.sender, InputIntent { timestamp, intent })
    }

    /// Drain all pending intents in submission order
    pub fn drain(&self) -> Vec<InputIntent> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(input::CAPACITY)
    }
}

/// Clonable sender handle for producers
#[derive(Clone)]
pub struct InputSender {
    sender: Sender<InputIntent>,
}

impl InputSender {
    /// Submit an intent (non-blocking)
    #[inline]
    pub fn try_send(&self, timestamp: Duration, intent: Intent) -> Result<(), InputBufferError> {
        send(&self.sender, InputIntent { timestamp, intent })
    }
}

fn send(sender: &Sender<InputIntent>, message: InputIntent) -> Result<(), InputBufferError> {
    sender.try_send(message).map_err(|e| match e {
        TrySendError::Full(_) => InputBufferError::Full,
        TrySendError::Disconnected(_) => InputBufferError::Disconnected,
    })
}
