use crate::turn::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

/// Actions pressed during one tick. Held keys are not modelled: each press is an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_pressed: bool) {
        self.pressed[action.index()] = is_pressed;
    }

    pub(crate) fn is_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }
}

impl InputAction {
    pub const MOVES: [InputAction; 4] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Quit => 4,
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            InputAction::MoveUp => Direction::Up,
            InputAction::MoveDown => Direction::Down,
            InputAction::MoveLeft => Direction::Left,
            InputAction::MoveRight => Direction::Right,
            InputAction::Quit => Direction::None,
        }
    }

    pub const fn from_direction(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Up => Some(InputAction::MoveUp),
            Direction::Down => Some(InputAction::MoveDown),
            Direction::Left => Some(InputAction::MoveLeft),
            Direction::Right => Some(InputAction::MoveRight),
            Direction::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_actions_round_trip_through_directions() {
        for action in InputAction::MOVES {
            assert_eq!(InputAction::from_direction(action.direction()), Some(action));
        }
        assert_eq!(InputAction::Quit.direction(), Direction::None);
        assert_eq!(InputAction::from_direction(Direction::None), None);
    }

    #[test]
    fn action_states_track_each_action_independently() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveLeft, true);

        assert!(states.is_pressed(InputAction::MoveLeft));
        assert!(!states.is_pressed(InputAction::MoveRight));

        states.set(InputAction::MoveLeft, false);
        assert_eq!(states, ActionStates::default());
    }
}
