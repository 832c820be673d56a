use crate::definitions::AnimationDef;
use crate::types::Point;

pub const NUM_GYROS: usize = 5;
pub const MAX_PREVIOUS_STATES: usize = 3;

/// One rotary dial of a gyro puzzle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gyro {
    pub current_state: i32,
    pub required_state: i32,
    pub require_state: bool,
    pub wrap_around: bool,
    pub previous_states: Vec<i32>,
    pub required_previous_states: Vec<i32>,
}

impl Gyro {
    pub fn log_state(&mut self) {
        self.previous_states.push(self.current_state);
        if self.previous_states.len() > MAX_PREVIOUS_STATES {
            self.previous_states.remove(0);
        }
    }

    pub fn is_solved(&self) -> bool {
        let state_ok = !self.require_state || self.current_state == self.required_state;
        let history_ok = self.required_previous_states.is_empty()
            || self.previous_states == self.required_previous_states;
        state_ok && history_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroDirection {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GyroStep {
    pub direction: GyroDirection,
    pub animation: AnimationDef,
}

/// Dials of the current screen plus the drag parameters shared by them.
#[derive(Debug, Clone, Default)]
pub struct GyroState {
    pub gyros: [Gyro; NUM_GYROS],
    pub positive_anim: AnimationDef,
    pub negative_anim: AnimationDef,
    pub is_vertical: bool,
    pub drag_margin: u32,
    pub max_value: u32,
    pub active_gyro: usize,
    pub complete_interaction: u32,
    pub failure_interaction: u32,
    drag_base: Point,
    drag_steps: i32,
}

impl GyroState {
    pub fn reset(&mut self) {
        *self = GyroState::default();
    }

    pub fn active(&self) -> &Gyro {
        &self.gyros[self.active_gyro]
    }

    pub fn begin_drag(&mut self, pos: Point) {
        self.drag_base = pos;
        self.drag_steps = 0;
    }

    /// Moves the active dial at most one state towards the position implied
    /// by the drag. The first step needs half a margin of travel.
    pub fn drag_step(&mut self, pos: Point) -> Option<GyroStep> {
        let margin = self.drag_margin.max(1) as i32;
        let delta = if self.is_vertical {
            self.drag_base.y - pos.y
        } else {
            self.drag_base.x - pos.x
        };
        let target = if delta >= 0 {
            (delta + margin / 2) / margin
        } else {
            -((margin / 2 - delta) / margin)
        };

        let direction = match target.cmp(&self.drag_steps) {
            std::cmp::Ordering::Greater => GyroDirection::Positive,
            std::cmp::Ordering::Less => GyroDirection::Negative,
            std::cmp::Ordering::Equal => return None,
        };

        let max = self.max_value as i32;
        let gyro = &mut self.gyros[self.active_gyro];
        let from = gyro.current_state;
        let next = match direction {
            GyroDirection::Positive => from + 1,
            GyroDirection::Negative => from - 1,
        };
        let next = if gyro.wrap_around {
            next.rem_euclid(max + 1)
        } else if !(0..=max).contains(&next) {
            return None;
        } else {
            next
        };

        gyro.current_state = next;
        gyro.log_state();
        self.drag_steps += match direction {
            GyroDirection::Positive => 1,
            GyroDirection::Negative => -1,
        };

        Some(GyroStep {
            direction,
            animation: self.step_animation(direction, from),
        })
    }

    /// Frame range turning a dial one state away from `from`.
    fn step_animation(&self, direction: GyroDirection, from: i32) -> AnimationDef {
        let base = match direction {
            GyroDirection::Positive => &self.positive_anim,
            GyroDirection::Negative => &self.negative_anim,
        };
        let steps = self.max_value.max(1);
        let separation = (base.frame_count() / steps).max(1);
        let index = match direction {
            GyroDirection::Positive => from as u32 % steps,
            GyroDirection::Negative => (self.max_value as i32 - from).rem_euclid(steps as i32) as u32,
        };
        let first = base.first_frame + index * separation;
        AnimationDef {
            first_frame: first,
            last_frame: (first + separation).min(base.last_frame),
            ..base.clone()
        }
    }

    pub fn all_solved(&self) -> bool {
        self.gyros.iter().all(Gyro::is_solved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GyroState {
        let mut gyros = GyroState {
            drag_margin: 20,
            max_value: 4,
            positive_anim: AnimationDef {
                resource_id: 40,
                first_frame: 0,
                last_frame: 15,
                ..AnimationDef::default()
            },
            negative_anim: AnimationDef {
                resource_id: 41,
                first_frame: 0,
                last_frame: 15,
                ..AnimationDef::default()
            },
            ..GyroState::default()
        };
        gyros.begin_drag(Point::new(300, 200));
        gyros
    }

    #[test]
    fn first_step_needs_half_a_margin() {
        let mut gyros = state();
        assert!(gyros.drag_step(Point::new(291, 200)).is_none());
        let step = gyros.drag_step(Point::new(290, 200)).unwrap();
        assert_eq!(step.direction, GyroDirection::Positive);
        assert_eq!(step.animation.resource_id, 40);
        assert_eq!((step.animation.first_frame, step.animation.last_frame), (0, 4));
        assert_eq!(gyros.active().current_state, 1);
        assert!(gyros.drag_step(Point::new(290, 200)).is_none());
    }

    #[test]
    fn one_step_per_call_until_caught_up() {
        let mut gyros = state();
        let far = Point::new(300 - 45, 200);
        assert!(gyros.drag_step(far).is_some());
        assert!(gyros.drag_step(far).is_some());
        assert!(gyros.drag_step(far).is_none());
        assert_eq!(gyros.active().previous_states, vec![1, 2]);
    }

    #[test]
    fn clamps_without_wrap_and_wraps_when_enabled() {
        let mut gyros = state();
        assert!(gyros.drag_step(Point::new(320, 200)).is_none());

        gyros.gyros[0].wrap_around = true;
        let step = gyros.drag_step(Point::new(320, 200)).unwrap();
        assert_eq!(step.direction, GyroDirection::Negative);
        assert_eq!(gyros.active().current_state, 4);
    }

    #[test]
    fn solved_requires_state_and_history() {
        let mut gyro = Gyro {
            require_state: true,
            required_state: 2,
            required_previous_states: vec![1, 2],
            ..Gyro::default()
        };
        gyro.current_state = 1;
        gyro.log_state();
        gyro.current_state = 2;
        assert!(!gyro.is_solved());
        gyro.log_state();
        assert!(gyro.is_solved());
    }
}
