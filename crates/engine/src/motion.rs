//! Timed multi-stage motions: the stand-in for tween sequences.
//!
//! A motion is a list of stages played back to back. The timeline is advanced
//! by the loop's fixed tick and reports every stage boundary plus a final
//! `Finished` event that hands the payload back to the caller.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MotionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStage {
    pub label: &'static str,
    pub duration_seconds: f32,
}

impl MotionStage {
    pub const fn new(label: &'static str, duration_seconds: f32) -> Self {
        Self {
            label,
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent<T> {
    StageEnded {
        id: MotionId,
        stage: usize,
        label: &'static str,
    },
    Finished {
        id: MotionId,
        payload: T,
    },
}

#[derive(Debug)]
struct ActiveMotion<T> {
    id: MotionId,
    stages: Vec<MotionStage>,
    stage_index: usize,
    elapsed_in_stage: f32,
    payload: T,
}

#[derive(Debug)]
pub struct MotionTimeline<T> {
    active: Vec<ActiveMotion<T>>,
    next_id: u64,
}

impl<T> Default for MotionTimeline<T> {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> MotionTimeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin<I>(&mut self, stages: I, payload: T) -> MotionId
    where
        I: IntoIterator<Item = MotionStage>,
    {
        let id = MotionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let stages = stages
            .into_iter()
            .map(|stage| MotionStage {
                duration_seconds: sanitize_duration(stage.duration_seconds),
                ..stage
            })
            .collect();
        self.active.push(ActiveMotion {
            id,
            stages,
            stage_index: 0,
            elapsed_in_stage: 0.0,
            payload,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, id: MotionId) -> bool {
        self.active.iter().any(|motion| motion.id == id)
    }

    pub fn payload(&self, id: MotionId) -> Option<&T> {
        self.active
            .iter()
            .find(|motion| motion.id == id)
            .map(|motion| &motion.payload)
    }

    /// Current stage label and its completed fraction.
    pub fn progress(&self, id: MotionId) -> Option<(&'static str, f32)> {
        let motion = self.active.iter().find(|motion| motion.id == id)?;
        let stage = motion.stages.get(motion.stage_index)?;
        let fraction = if stage.duration_seconds > 0.0 {
            (motion.elapsed_in_stage / stage.duration_seconds).clamp(0.0, 1.0)
        } else {
            1.0
        };
        Some((stage.label, fraction))
    }

    /// Advances every motion in start order. Finished motions are removed.
    pub fn advance(&mut self, dt_seconds: f32, out: &mut Vec<MotionEvent<T>>) {
        let dt_seconds = sanitize_duration(dt_seconds);
        let mut index = 0;
        while index < self.active.len() {
            let motion = &mut self.active[index];
            let mut budget = dt_seconds;
            while let Some(stage) = motion.stages.get(motion.stage_index) {
                let remaining = stage.duration_seconds - motion.elapsed_in_stage;
                if budget < remaining {
                    motion.elapsed_in_stage += budget;
                    break;
                }
                budget -= remaining;
                out.push(MotionEvent::StageEnded {
                    id: motion.id,
                    stage: motion.stage_index,
                    label: stage.label,
                });
                motion.stage_index += 1;
                motion.elapsed_in_stage = 0.0;
            }

            if motion.stage_index >= motion.stages.len() {
                let finished = self.active.remove(index);
                out.push(MotionEvent::Finished {
                    id: finished.id,
                    payload: finished.payload,
                });
            } else {
                index += 1;
            }
        }
    }

    /// Drops every running motion without finishing it.
    pub fn clear(&mut self) -> usize {
        let count = self.active.len();
        self.active.clear();
        count
    }
}

fn sanitize_duration(seconds: f32) -> f32 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}
