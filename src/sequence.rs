use serde::{Deserialize, Serialize};

use crate::constants::{MAX_DURATION, MAX_ITERATION, MIN_DURATION, MIN_ITERATION};
use crate::error::BoardError;
use crate::grid::checked_cell_count;
use crate::inventory::Effector;

/// Written in tagged form. Read through [`SequenceItem`], so the editor's flat
/// records and the tagged form share one set of kind names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", try_from = "SequenceItem")]
pub enum SequenceStep {
    Paint { index: i32, background: String },
    Erase { index: i32 },
    Spawn { index: i32, emoji: String },
    Destroy { index: i32 },
    Wait { duration: u32 },
    AddToPlayerInventory {
        emoji: String,
        /// Charges; omitted means infinite.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        points: Option<i32>,
    },
    TeleportPlayerTo { index: i32 },
    ChangePlayerTo { emoji: String },
    #[serde(rename = "addToPlayerHP")]
    AddToPlayerHp { points: i32 },
    ResetLevel,
    CompleteLevel,
}

impl SequenceStep {
    pub fn kind(&self) -> &'static str {
        match self {
            SequenceStep::Paint { .. } => "paint",
            SequenceStep::Erase { .. } => "erase",
            SequenceStep::Spawn { .. } => "spawn",
            SequenceStep::Destroy { .. } => "destroy",
            SequenceStep::Wait { .. } => "wait",
            SequenceStep::AddToPlayerInventory { .. } => "addToPlayerInventory",
            SequenceStep::TeleportPlayerTo { .. } => "teleportPlayerTo",
            SequenceStep::ChangePlayerTo { .. } => "changePlayerTo",
            SequenceStep::AddToPlayerHp { .. } => "addToPlayerHP",
            SequenceStep::ResetLevel => "resetLevel",
            SequenceStep::CompleteLevel => "completeLevel",
        }
    }

    /// Cell index this step touches, if any.
    pub fn index(&self) -> Option<i32> {
        match self {
            SequenceStep::Paint { index, .. }
            | SequenceStep::Erase { index }
            | SequenceStep::Spawn { index, .. }
            | SequenceStep::Destroy { index }
            | SequenceStep::TeleportPlayerTo { index } => Some(*index),
            _ => None,
        }
    }

    /// Copy of the step with its cell index moved by `offset`.
    pub fn shifted(&self, offset: i32) -> SequenceStep {
        let mut step = self.clone();
        match &mut step {
            SequenceStep::Paint { index, .. }
            | SequenceStep::Erase { index }
            | SequenceStep::Spawn { index, .. }
            | SequenceStep::Destroy { index }
            | SequenceStep::TeleportPlayerTo { index } => *index += offset,
            _ => {}
        }
        step
    }

    pub fn inventory_item(&self) -> Option<Effector> {
        match self {
            SequenceStep::AddToPlayerInventory { emoji, points } => Some(match points {
                Some(p) => Effector::finite(emoji.clone(), *p),
                None => Effector::infinite(emoji.clone()),
            }),
            _ => None,
        }
    }

    fn validate(&self, position: usize) -> Result<(), BoardError> {
        let fail = |msg: &str| {
            Err(BoardError::config(format!(
                "step {position} ({}): {msg}",
                self.kind()
            )))
        };
        match self {
            SequenceStep::Wait { duration } => {
                check_duration(*duration).map_err(|e| match e {
                    BoardError::Configuration(m) => {
                        BoardError::config(format!("step {position} (wait): {m}"))
                    }
                    other => other,
                })
            }
            SequenceStep::Paint { background, .. } if background.is_empty() => {
                fail("missing background color")
            }
            SequenceStep::Spawn { emoji, .. }
            | SequenceStep::ChangePlayerTo { emoji }
            | SequenceStep::AddToPlayerInventory { emoji, .. }
                if emoji.is_empty() =>
            {
                fail("missing emoji")
            }
            _ => Ok(()),
        }
    }
}

fn check_duration(ms: u32) -> Result<(), BoardError> {
    if (MIN_DURATION..=MAX_DURATION).contains(&ms) {
        Ok(())
    } else {
        Err(BoardError::config(format!(
            "duration {ms}ms outside [{MIN_DURATION}, {MAX_DURATION}]"
        )))
    }
}

/// Flat step record as the editor stores it: every field present, `type`
/// deciding which ones matter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub points: i32,
    #[serde(default)]
    pub emoji: String,
}

impl TryFrom<SequenceItem> for SequenceStep {
    type Error = BoardError;

    fn try_from(item: SequenceItem) -> Result<Self, Self::Error> {
        let SequenceItem {
            kind,
            index,
            background,
            duration,
            points,
            emoji,
        } = item;
        let step = match kind.as_str() {
            "paint" | "setBackgroundOf" => SequenceStep::Paint { index, background },
            "erase" | "removeBackgroundOf" => SequenceStep::Erase { index },
            "spawn" => SequenceStep::Spawn { index, emoji },
            "destroy" => SequenceStep::Destroy { index },
            "wait" => SequenceStep::Wait { duration },
            "addToPlayerInventory" => SequenceStep::AddToPlayerInventory {
                emoji,
                points: (points != 0).then_some(points),
            },
            "teleportPlayerTo" => SequenceStep::TeleportPlayerTo { index },
            "changePlayerTo" => SequenceStep::ChangePlayerTo { emoji },
            "addToPlayerHP" | "addToPlayerHp" => SequenceStep::AddToPlayerHp { points },
            "resetLevel" => SequenceStep::ResetLevel,
            "completeLevel" => SequenceStep::CompleteLevel,
            other => {
                return Err(BoardError::config(format!(
                    "unknown mutation kind '{other}'"
                )))
            }
        };
        Ok(step)
    }
}

/// Convert raw step records one by one. An unknown kind comes back as
/// `Configuration` instead of a generic parse failure.
pub fn check_step_records(records: &[serde_json::Value]) -> Result<(), BoardError> {
    for raw in records {
        let item: SequenceItem = serde_json::from_value(raw.clone())?;
        SequenceStep::try_from(item)?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationType {
    #[default]
    Increment,
    Decrement,
}

/// Repeats `start..=end` of a sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceLoop {
    pub start: usize,
    pub end: usize,
    pub iteration_number: u32,
    #[serde(default)]
    pub iteration_type: IterationType,
    pub time_gap: u32,
    #[serde(default)]
    pub reverse: bool,
}

impl SequenceLoop {
    fn validate(&self, step_count: usize) -> Result<(), BoardError> {
        if self.start > self.end || self.end >= step_count {
            return Err(BoardError::config(format!(
                "loop range {}..={} does not fit a sequence of {} steps",
                self.start, self.end, step_count
            )));
        }
        if !(MIN_ITERATION..=MAX_ITERATION).contains(&self.iteration_number) {
            return Err(BoardError::config(format!(
                "loop iteration count {} outside [{MIN_ITERATION}, {MAX_ITERATION}]",
                self.iteration_number
            )));
        }
        check_duration(self.time_gap)
    }

    /// Cell-index shift applied to steps during pass `pass`.
    pub fn offset(&self, pass: u32) -> i32 {
        let pass = pass as i32;
        match self.iteration_type {
            IterationType::Increment => pass,
            IterationType::Decrement => -pass,
        }
    }

    /// Odd passes run backwards when `reverse` is set.
    pub fn runs_backward(&self, pass: u32) -> bool {
        self.reverse && pass % 2 == 1
    }
}

/// A named sequence: the scripted body of an event node or interactable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    #[serde(rename = "sequence", default)]
    pub steps: Vec<SequenceStep>,
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<SequenceLoop>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, steps: Vec<SequenceStep>) -> Self {
        Self {
            name: name.into(),
            steps,
            repeat: None,
        }
    }

    #[cfg(test)]
    pub fn with_loop(mut self, repeat: SequenceLoop) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Build from editor records, failing on the first unknown kind.
    pub fn from_items(
        name: impl Into<String>,
        items: Vec<SequenceItem>,
    ) -> Result<Self, BoardError> {
        let steps = items
            .into_iter()
            .map(SequenceStep::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, steps))
    }

    /// Flatten into a program for a board of `side` x `side` cells.
    pub fn compile(&self, side: usize) -> Result<Program, BoardError> {
        let cells = checked_cell_count(side)?;
        for (i, step) in self.steps.iter().enumerate() {
            step.validate(i)?;
        }

        let mut ops = Vec::new();
        match &self.repeat {
            None => {
                for (i, step) in self.steps.iter().enumerate() {
                    ops.push(Op::step(i, 0, step.clone()));
                }
            }
            Some(repeat) => {
                repeat.validate(self.steps.len())?;
                for (i, step) in self.steps.iter().enumerate().take(repeat.start) {
                    ops.push(Op::step(i, 0, step.clone()));
                }
                for pass in 0..repeat.iteration_number {
                    if pass > 0 {
                        ops.push(Op::Gap { ms: repeat.time_gap });
                    }
                    let offset = repeat.offset(pass);
                    let range: Box<dyn Iterator<Item = usize>> = if repeat.runs_backward(pass) {
                        Box::new((repeat.start..=repeat.end).rev())
                    } else {
                        Box::new(repeat.start..=repeat.end)
                    };
                    for i in range {
                        ops.push(Op::step(i, pass, self.steps[i].shifted(offset)));
                    }
                }
                for (i, step) in self.steps.iter().enumerate().skip(repeat.end + 1) {
                    ops.push(Op::step(i, 0, step.clone()));
                }
            }
        }

        for op in &ops {
            if let Op::Step { step, .. } = op {
                if let Some(index) = step.index() {
                    if index < 0 || index as usize >= cells {
                        return Err(BoardError::Bounds {
                            index: index as i64,
                            cells,
                        });
                    }
                }
            }
        }

        Ok(Program {
            name: self.name.clone(),
            ops,
        })
    }
}

/// One unit of interpreter work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Step {
        /// Position of the step in the authored sequence.
        source: usize,
        pass: u32,
        step: SequenceStep,
    },
    /// Pause between loop passes.
    Gap { ms: u32 },
}

impl Op {
    fn step(source: usize, pass: u32, step: SequenceStep) -> Self {
        Op::Step { source, pass, step }
    }

    pub fn delay_ms(&self) -> Option<u32> {
        match self {
            Op::Step {
                step: SequenceStep::Wait { duration },
                ..
            } => Some(*duration),
            Op::Gap { ms } => Some(*ms),
            Op::Step { .. } => None,
        }
    }

    /// Authored position and loop pass of a step; gaps have none.
    pub fn origin(&self) -> Option<(usize, u32)> {
        match self {
            Op::Step { source, pass, .. } => Some((*source, *pass)),
            Op::Gap { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Program {
    pub name: String,
    pub ops: Vec<Op>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
