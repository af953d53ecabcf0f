use gridfall_engine::{Continuation, SceneCommand, StepContext, StepToken, TurnScheduler};
use tracing::{debug, info};

use super::def::{Cell, LevelDef};
use super::world::LevelWorld;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TriggerKind {
    OxygenRefill,
    Gate {
        id: String,
        target: Cell,
        active: bool,
    },
    /// Fires once; later entries do nothing.
    Button {
        activates: Vec<String>,
        moves: Vec<String>,
        fired: bool,
    },
    LevelExit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Trigger {
    pub(crate) at: Cell,
    pub(crate) kind: TriggerKind,
}

enum TriggerAction {
    Nothing,
    RefillOxygen,
    Teleport { gate: String, target: Cell },
    Activate { gates: Vec<String>, platforms: Vec<String> },
    CompleteLevel,
}

impl Trigger {
    fn fire(&mut self) -> TriggerAction {
        match &mut self.kind {
            TriggerKind::OxygenRefill => TriggerAction::RefillOxygen,
            TriggerKind::Gate { id, target, active } => {
                if *active {
                    TriggerAction::Teleport {
                        gate: id.clone(),
                        target: *target,
                    }
                } else {
                    debug!(gate = %id, "gate_inactive");
                    TriggerAction::Nothing
                }
            }
            TriggerKind::Button {
                activates,
                moves,
                fired,
            } => {
                if *fired {
                    return TriggerAction::Nothing;
                }
                *fired = true;
                TriggerAction::Activate {
                    gates: activates.clone(),
                    platforms: moves.clone(),
                }
            }
            TriggerKind::LevelExit => TriggerAction::CompleteLevel,
        }
    }
}

pub(crate) fn build_triggers(def: &LevelDef) -> Vec<Trigger> {
    let oxygen = def.oxygen.iter().map(|at| Trigger {
        at: *at,
        kind: TriggerKind::OxygenRefill,
    });
    let gates = def.gates.iter().map(|gate| Trigger {
        at: gate.at,
        kind: TriggerKind::Gate {
            id: gate.id.clone(),
            target: gate.target,
            active: gate.active,
        },
    });
    let buttons = def.buttons.iter().map(|button| Trigger {
        at: button.at,
        kind: TriggerKind::Button {
            activates: button.activates.clone(),
            moves: button.moves.clone(),
            fired: false,
        },
    });
    let exits = def.exits.iter().map(|at| Trigger {
        at: *at,
        kind: TriggerKind::LevelExit,
    });
    oxygen.chain(gates).chain(buttons).chain(exits).collect()
}

/// Fires every trigger on `cell`, in level-file order.
pub(crate) fn enter_cell(
    cell: Cell,
    scheduler: &mut TurnScheduler<LevelWorld>,
    world: &mut LevelWorld,
) {
    let hits: Vec<usize> = world
        .triggers
        .iter()
        .enumerate()
        .filter(|(_, trigger)| trigger.at == cell)
        .map(|(index, _)| index)
        .collect();

    for index in hits {
        let action = world.triggers[index].fire();
        match action {
            TriggerAction::Nothing => {}
            TriggerAction::RefillOxygen => {
                if scheduler.restore_hazard(world) {
                    info!(cell = %cell, level = scheduler.hazard_level(), "oxygen_refilled");
                }
            }
            TriggerAction::Teleport { gate, target } => {
                debug!(gate = %gate, cell = %cell, "gate_entered");
                scheduler.enqueue_continuation(TeleportSequence { gate, target });
            }
            TriggerAction::Activate { gates, platforms } => {
                info!(cell = %cell, gates = gates.len(), platforms = platforms.len(), "button_pressed");
                for gate in &gates {
                    activate_gate(world, gate);
                }
                for platform in &platforms {
                    world.move_platform(platform);
                }
            }
            TriggerAction::CompleteLevel => {
                info!(level = %world.name, cell = %cell, "level_completed");
                world.request_scene_command(SceneCommand::LoadNext);
            }
        }
    }
}

fn activate_gate(world: &mut LevelWorld, gate_id: &str) {
    let mut found = false;
    for trigger in &mut world.triggers {
        if let TriggerKind::Gate { id, active, .. } = &mut trigger.kind {
            if id.as_str() == gate_id {
                *active = true;
                found = true;
            }
        }
    }
    if found {
        info!(gate = gate_id, "gate_activated");
    } else {
        debug!(gate = gate_id, "gate_link_missing");
    }
}

/// Deferred teleport: shrink, move to the target keeping height, grow, then
/// hand the token back so the ordinary finish logic runs at the target.
#[derive(Debug)]
pub(crate) struct TeleportSequence {
    gate: String,
    target: Cell,
}

impl Continuation<LevelWorld> for TeleportSequence {
    fn label(&self) -> &'static str {
        "teleport"
    }

    fn resume(self: Box<Self>, token: StepToken, cx: &mut StepContext<'_, LevelWorld>) {
        let TeleportSequence { gate, target } = *self;
        cx.host_mut().begin_teleport(token, gate, target);
    }
}
